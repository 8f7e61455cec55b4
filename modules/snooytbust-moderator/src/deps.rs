use std::sync::Arc;

use crate::notify::Notifier;
use crate::retry::RetryPolicy;
use crate::traits::{BlacklistStore, DiscussionSource, MetadataProvider};

/// Long-lived handles shared by the stream supervisor and the pipeline.
/// Built once in `main` and passed by reference to their constructors.
pub struct ModeratorDeps {
    /// Community (subreddit) being watched.
    pub community: String,
    pub source: Arc<dyn DiscussionSource>,
    pub metadata: Arc<dyn MetadataProvider>,
    pub blacklist: Arc<dyn BlacklistStore>,
    pub notifier: Arc<Notifier>,
    /// Schedule for re-creating closed subscriptions.
    pub retry: RetryPolicy,
}
