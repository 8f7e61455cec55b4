use std::sync::Arc;

use tracing::{debug, error, info};

use snooytbust_common::{
    DiscussionItem, MediaPlatform, ModerationAction, ModerationEvent, PublisherRecord, VideoId,
};

use crate::deps::ModeratorDeps;
use crate::links::extract_video_ids;
use crate::notify::Notifier;
use crate::traits::{BlacklistStore, DiscussionSource, MetadataProvider};

/// What happened while processing one item.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub links: usize,
    pub lookups_failed: usize,
    pub blacklist_errors: usize,
    pub matches: usize,
    pub removals: usize,
    pub removal_failures: usize,
}

/// Per-item moderation: extract links, resolve each to its channel, check
/// the channel against the blacklist, remove and notify on a match.
///
/// Links are handled strictly one after another in first-seen order. No
/// external failure escapes `process`; each is logged against the item
/// and processing moves on.
pub struct ModerationPipeline {
    source: Arc<dyn DiscussionSource>,
    metadata: Arc<dyn MetadataProvider>,
    blacklist: Arc<dyn BlacklistStore>,
    notifier: Arc<Notifier>,
}

impl ModerationPipeline {
    pub fn new(deps: &ModeratorDeps) -> Self {
        Self {
            source: deps.source.clone(),
            metadata: deps.metadata.clone(),
            blacklist: deps.blacklist.clone(),
            notifier: deps.notifier.clone(),
        }
    }

    pub async fn process(&self, item: &DiscussionItem) -> ItemOutcome {
        let mut outcome = ItemOutcome::default();

        let videos = extract_video_ids(&item.body);
        if videos.is_empty() {
            debug!(thing_id = %item.id, "No video");
            return outcome;
        }
        outcome.links = videos.len();

        for video in &videos {
            debug!(thing_id = %item.id, video_id = %video, "Found YouTube link");

            let publishers = match self.metadata.lookup(video).await {
                Ok(publishers) => publishers,
                Err(e) => {
                    error!(thing_id = %item.id, video_id = %video, error = %e, "YouTube API error");
                    outcome.lookups_failed += 1;
                    continue;
                }
            };

            if publishers.is_empty() {
                debug!(thing_id = %item.id, video_id = %video, "Video not found");
                continue;
            }

            for publisher in &publishers {
                self.check_publisher(item, video, publisher, &mut outcome)
                    .await;
            }
        }

        outcome
    }

    /// Blacklist check for one resolved channel. On a hit the item is
    /// removed (not as spam) and a notice naming *this* channel is sent,
    /// flagged as a failed removal when the remove call errored.
    async fn check_publisher(
        &self,
        item: &DiscussionItem,
        video: &VideoId,
        publisher: &PublisherRecord,
        outcome: &mut ItemOutcome,
    ) {
        info!(
            thing_id = %item.id,
            video_id = %video,
            channel_id = publisher.publisher_id.as_str(),
            channel_title = publisher.display_name.as_str(),
            "YouTube video found"
        );

        let entry = match self
            .blacklist
            .find(&publisher.publisher_id, MediaPlatform::YouTube)
            .await
        {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(e) => {
                error!(
                    thing_id = %item.id,
                    channel_id = publisher.publisher_id.as_str(),
                    error = %e,
                    "Blacklist query failed"
                );
                outcome.blacklist_errors += 1;
                return;
            }
        };
        outcome.matches += 1;

        info!(
            thing_id = %item.id,
            kind = %item.kind(),
            blacklist_id = entry.id,
            "Blacklisted channel, removing"
        );

        let action = match self.source.remove(&item.id, false).await {
            Ok(()) => {
                outcome.removals += 1;
                ModerationAction::Removed
            }
            Err(e) => {
                error!(thing_id = %item.id, error = %e, "Removal failed");
                outcome.removal_failures += 1;
                ModerationAction::RemovalFailed
            }
        };

        let event = ModerationEvent::new(item, publisher, entry, video, action);
        self.notifier.notify(&event).await;
    }
}
