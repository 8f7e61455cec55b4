// Test mocks for the moderator.
//
// One mock per capability seam:
// - MockSource (DiscussionSource): scripted subscriptions, recorded removals
// - MockMetadata (MetadataProvider): HashMap video -> publishers
// - MockBlacklist (BlacklistStore): HashMap channel -> entry
// - RecordingBackend (NotifyBackend): captures sent events
//
// Mocks are Clone and share their recordings, so a test can keep a handle
// after moving a clone into ModeratorDeps.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use snooytbust_common::{
    BlacklistEntry, DiscussionItem, ItemId, MediaPlatform, ModerationEvent, PublisherRecord,
    SubscribeError, VideoId,
};

use crate::deps::ModeratorDeps;
use crate::notify::backend::NotifyBackend;
use crate::notify::Notifier;
use crate::retry::RetryPolicy;
use crate::traits::{
    BlacklistStore, DiscussionSource, ItemChannel, MetadataProvider, SubscriptionEvent,
    SubscriptionKind,
};

pub const TEST_COMMUNITY: &str = "videos";

// ---------------------------------------------------------------------------
// Item helpers
// ---------------------------------------------------------------------------

pub fn post(id: &str, body: &str) -> DiscussionItem {
    item(ItemId::post(id), body)
}

pub fn comment(id: &str, body: &str) -> DiscussionItem {
    item(ItemId::comment(id), body)
}

fn item(id: ItemId, body: &str) -> DiscussionItem {
    let permalink = format!("https://www.reddit.com/r/{TEST_COMMUNITY}/comments/{}/", id.id);
    DiscussionItem {
        id,
        author: "someone".to_string(),
        community: TEST_COMMUNITY.to_string(),
        body: body.to_string(),
        permalink,
    }
}

pub fn publisher(id: &str, name: &str) -> PublisherRecord {
    PublisherRecord {
        publisher_id: id.to_string(),
        display_name: name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// One scripted answer to a subscribe call.
#[derive(Debug, Clone)]
pub enum Script {
    /// Transient failure.
    Fail,
    /// Credential failure.
    FailCredentials,
    /// Subscription that yields these events, then stays open.
    Open(Vec<SubscriptionEvent>),
}

#[derive(Default)]
struct SourceState {
    scripts: HashMap<SubscriptionKind, VecDeque<Script>>,
    attempts: Vec<(SubscriptionKind, Instant)>,
    removals: Vec<(ItemId, bool)>,
    failing_removals: HashSet<ItemId>,
    open: Vec<mpsc::UnboundedSender<SubscriptionEvent>>,
}

/// Scripted discussion source. Subscribe calls consume the script for their
/// kind in order; an exhausted script fails transiently.
#[derive(Clone, Default)]
pub struct MockSource {
    state: Arc<Mutex<SourceState>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, kind: SubscriptionKind, steps: Vec<Script>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(kind)
            .or_default()
            .extend(steps);
        self
    }

    /// Make `remove` fail for this item.
    pub fn failing_removal(self, id: ItemId) -> Self {
        self.state.lock().unwrap().failing_removals.insert(id);
        self
    }

    /// Times at which subscribe was called for `kind`.
    pub fn attempts(&self, kind: SubscriptionKind) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, at)| *at)
            .collect()
    }

    /// Every remove call, including failed ones.
    pub fn removals(&self) -> Vec<(ItemId, bool)> {
        self.state.lock().unwrap().removals.clone()
    }

    fn next_script(&self, kind: SubscriptionKind) -> Result<ItemChannel, SubscribeError> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push((kind, Instant::now()));
        let step = state
            .scripts
            .get_mut(&kind)
            .and_then(|steps| steps.pop_front())
            .unwrap_or(Script::Fail);

        match step {
            Script::Fail => Err(SubscribeError::Transient(anyhow!("MockSource: {kind} unavailable"))),
            Script::FailCredentials => Err(SubscribeError::Credentials(anyhow!(
                "MockSource: {kind} credentials rejected"
            ))),
            Script::Open(events) => {
                let (tx, rx) = mpsc::unbounded_channel();
                for event in events {
                    let _ = tx.send(event);
                }
                state.open.push(tx);
                Ok(stream::unfold(rx, |mut rx| async move {
                    let event = rx.recv().await?;
                    Some((event, rx))
                })
                .boxed())
            }
        }
    }
}

#[async_trait]
impl DiscussionSource for MockSource {
    async fn subscribe_submissions(&self, _community: &str) -> Result<ItemChannel, SubscribeError> {
        self.next_script(SubscriptionKind::Submissions)
    }

    async fn subscribe_comments(&self, _community: &str) -> Result<ItemChannel, SubscribeError> {
        self.next_script(SubscriptionKind::Comments)
    }

    async fn remove(&self, id: &ItemId, permanent: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.removals.push((id.clone(), permanent));
        if state.failing_removals.contains(id) {
            bail!("MockSource: {id} already removed");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockMetadata
// ---------------------------------------------------------------------------

/// Video -> publishers. Unregistered videos resolve to nothing.
#[derive(Clone, Default)]
pub struct MockMetadata {
    videos: Arc<HashMap<String, Vec<PublisherRecord>>>,
    failing: Arc<HashSet<String>>,
    calls: Arc<Mutex<Vec<VideoId>>>,
}

impl MockMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_video(mut self, video_id: &str, publishers: Vec<PublisherRecord>) -> Self {
        Arc::make_mut(&mut self.videos).insert(video_id.to_string(), publishers);
        self
    }

    pub fn failing(mut self, video_id: &str) -> Self {
        Arc::make_mut(&mut self.failing).insert(video_id.to_string());
        self
    }

    /// Lookups in call order.
    pub fn calls(&self) -> Vec<VideoId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataProvider for MockMetadata {
    async fn lookup(&self, video: &VideoId) -> Result<Vec<PublisherRecord>> {
        self.calls.lock().unwrap().push(video.clone());
        if self.failing.contains(video.as_str()) {
            bail!("MockMetadata: quota exceeded for {video}");
        }
        Ok(self.videos.get(video.as_str()).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockBlacklist
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockBlacklist {
    entries: Arc<HashMap<String, BlacklistEntry>>,
    failing: Arc<HashSet<String>>,
    calls: Arc<Mutex<Vec<(String, MediaPlatform)>>>,
}

impl MockBlacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel_id: &str, entry_id: i64) -> Self {
        Arc::make_mut(&mut self.entries)
            .insert(channel_id.to_string(), BlacklistEntry { id: entry_id });
        self
    }

    pub fn failing(mut self, channel_id: &str) -> Self {
        Arc::make_mut(&mut self.failing).insert(channel_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, MediaPlatform)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlacklistStore for MockBlacklist {
    async fn find(
        &self,
        publisher_id: &str,
        platform: MediaPlatform,
    ) -> Result<Option<BlacklistEntry>> {
        self.calls
            .lock()
            .unwrap()
            .push((publisher_id.to_string(), platform));
        if self.failing.contains(publisher_id) {
            bail!("MockBlacklist: connection reset");
        }
        Ok(self.entries.get(publisher_id).copied())
    }
}

// ---------------------------------------------------------------------------
// RecordingBackend
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingBackend {
    sent: Arc<Mutex<Vec<ModerationEvent>>>,
    attempts: Arc<Mutex<usize>>,
    fail: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails after being counted.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<ModerationEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl NotifyBackend for RecordingBackend {
    async fn send(&self, event: &ModerationEvent) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.fail {
            bail!("RecordingBackend: channel_not_found");
        }
        self.sent.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Deps
// ---------------------------------------------------------------------------

/// Wire mocks into a `ModeratorDeps` with a fast fixed retry interval.
pub fn mock_deps(
    source: &MockSource,
    metadata: &MockMetadata,
    blacklist: &MockBlacklist,
    backend: &RecordingBackend,
    retry_interval: Duration,
) -> ModeratorDeps {
    ModeratorDeps {
        community: TEST_COMMUNITY.to_string(),
        source: Arc::new(source.clone()),
        metadata: Arc::new(metadata.clone()),
        blacklist: Arc::new(blacklist.clone()),
        notifier: Arc::new(Notifier::new(Box::new(backend.clone()))),
        retry: RetryPolicy::forever(retry_interval),
    }
}
