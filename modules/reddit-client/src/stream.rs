use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::types::Thing;
use crate::RedditClient;

/// Buffered items per subscription before the poller waits on the consumer.
const STREAM_BUFFER: usize = 100;

/// Which listing a subscription polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    /// `/r/{sub}/new`
    Posts,
    /// `/r/{sub}/comments`
    Comments,
}

impl ListingKind {
    pub(crate) fn path(&self) -> &'static str {
        match self {
            ListingKind::Posts => "new",
            ListingKind::Comments => "comments",
        }
    }
}

/// What a subscription yields.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Thing(Thing),
    /// The poller gave up; no further events will arrive.
    Closed,
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub poll_interval: Duration,
    /// Consecutive failed polls before the subscription closes itself.
    pub max_poll_failures: u32,
    /// How many fullnames to remember for dedup across polls.
    pub seen_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
            max_poll_failures: 3,
            seen_capacity: 500,
        }
    }
}

/// A live feed of new things from one listing. The poller task stops when
/// the subscription is dropped.
pub struct Subscription {
    rx: mpsc::Receiver<StreamEvent>,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Next event, or `None` once the poller has exited.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Bounded insertion-ordered set; evicts the oldest entry when full.
pub(crate) struct SeenSet {
    order: VecDeque<String>,
    set: HashSet<String>,
    capacity: usize,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            set: HashSet::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Returns true if the key was not already present.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.set.contains(key) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.order.push_back(key.to_string());
        self.set.insert(key.to_string());
        true
    }

    /// Things from a newest-first listing not seen before, oldest first.
    pub fn fresh(&mut self, listing: Vec<Thing>) -> Vec<Thing> {
        listing
            .into_iter()
            .rev()
            .filter(|thing| self.insert(thing.fullname()))
            .collect()
    }
}

struct HistoryState {
    seen: SeenSet,
    primed: bool,
}

/// Dedup history for one listing, shared by every subscription made with
/// it. The first subscription only records the current listing; later ones
/// emit whatever appeared while the previous subscription was down.
#[derive(Clone)]
pub struct SeenHistory {
    state: Arc<Mutex<HistoryState>>,
}

impl SeenHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HistoryState {
                seen: SeenSet::new(capacity),
                primed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Backlog to emit when a subscription starts from `listing`.
    pub(crate) fn start(&self, listing: Vec<Thing>) -> Vec<Thing> {
        let mut state = self.lock();
        if state.primed {
            return state.seen.fresh(listing);
        }
        for thing in &listing {
            state.seen.insert(thing.fullname());
        }
        state.primed = true;
        Vec::new()
    }

    /// New things from a later poll, oldest first.
    pub(crate) fn fresh(&self, listing: Vec<Thing>) -> Vec<Thing> {
        self.lock().seen.fresh(listing)
    }
}

/// Consecutive poll failures; trips once `limit` are reached in a row.
pub(crate) struct PollFailures {
    consecutive: u32,
    limit: u32,
}

impl PollFailures {
    pub fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit: limit.max(1),
        }
    }

    pub fn success(&mut self) {
        self.consecutive = 0;
    }

    /// Record a failure. Returns true when the subscription should close.
    pub fn failure(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive >= self.limit
    }

    pub fn count(&self) -> u32 {
        self.consecutive
    }
}

impl RedditClient {
    /// Subscribe to new submissions in a subreddit. Pass the same `history`
    /// when re-subscribing so nothing created in between is skipped.
    pub async fn stream_posts(
        &self,
        subreddit: &str,
        options: StreamOptions,
        history: &SeenHistory,
    ) -> crate::Result<Subscription> {
        self.subscribe(subreddit, ListingKind::Posts, options, history)
            .await
    }

    /// Subscribe to new comments in a subreddit.
    pub async fn stream_comments(
        &self,
        subreddit: &str,
        options: StreamOptions,
        history: &SeenHistory,
    ) -> crate::Result<Subscription> {
        self.subscribe(subreddit, ListingKind::Comments, options, history)
            .await
    }

    /// Fetch the current listing to settle the backlog against `history`,
    /// then hand polling to a background task.
    async fn subscribe(
        &self,
        subreddit: &str,
        kind: ListingKind,
        options: StreamOptions,
        history: &SeenHistory,
    ) -> crate::Result<Subscription> {
        let initial = self.listing(subreddit, kind).await?;
        let listed = initial.len();
        let backlog = history.start(initial);
        debug!(
            subreddit,
            listing = kind.path(),
            listed,
            backlog = backlog.len(),
            "Subscription started"
        );

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let client = self.clone();
        let subreddit = subreddit.to_string();
        let history = history.clone();
        let handle = tokio::spawn(async move {
            for thing in backlog {
                if tx.send(StreamEvent::Thing(thing)).await.is_err() {
                    return;
                }
            }
            poll_loop(client, subreddit, kind, options, history, tx).await;
        });

        Ok(Subscription { rx, handle })
    }
}

async fn poll_loop(
    client: RedditClient,
    subreddit: String,
    kind: ListingKind,
    options: StreamOptions,
    history: SeenHistory,
    tx: mpsc::Sender<StreamEvent>,
) {
    let mut failures = PollFailures::new(options.max_poll_failures);
    loop {
        tokio::time::sleep(options.poll_interval).await;

        match client.listing(&subreddit, kind).await {
            Ok(things) => {
                failures.success();
                for thing in history.fresh(things) {
                    if tx.send(StreamEvent::Thing(thing)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let close = failures.failure();
                warn!(
                    subreddit = subreddit.as_str(),
                    listing = kind.path(),
                    failures = failures.count(),
                    error = %e,
                    "Listing poll failed"
                );
                if close {
                    let _ = tx.send(StreamEvent::Closed).await;
                    return;
                }
            }
        }
    }
}
