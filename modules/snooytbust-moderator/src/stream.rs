use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use snooytbust_common::{DiscussionItem, SubscribeError};

use crate::deps::ModeratorDeps;
use crate::retry::RetryPolicy;
use crate::traits::{DiscussionSource, ItemChannel, SubscriptionEvent, SubscriptionKind};

/// Items buffered per subscription while the pipeline is busy.
const HANDOFF_BUFFER: usize = 64;

/// Merges the submission and comment subscriptions into one sequence.
///
/// Each subscription is owned by its own worker task, which re-subscribes
/// whenever its channel closes and hands items over through a dedicated
/// channel. A worker stuck in its retry loop never holds up the other one.
pub struct StreamSupervisor {
    submissions: Option<mpsc::Receiver<DiscussionItem>>,
    comments: Option<mpsc::Receiver<DiscussionItem>>,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

enum Next {
    Item(DiscussionItem),
    Ended(SubscriptionKind),
    Cancelled,
}

impl StreamSupervisor {
    /// Establish both subscriptions, then hand them to their workers.
    /// A failure here is a startup failure and is not retried.
    pub async fn connect(deps: &ModeratorDeps, cancel: &CancellationToken) -> Result<Self> {
        let cancel = cancel.child_token();
        let mut supervisor = Self {
            submissions: None,
            comments: None,
            cancel: cancel.clone(),
            workers: Vec::with_capacity(2),
        };

        for kind in [SubscriptionKind::Submissions, SubscriptionKind::Comments] {
            let initial = subscribe(deps.source.as_ref(), kind, &deps.community)
                .await
                .map_err(|e| anyhow::anyhow!("could not create {kind} stream: {e}"))?;
            info!(kind = %kind, community = deps.community.as_str(), "Subscription active");

            let (tx, rx) = mpsc::channel(HANDOFF_BUFFER);
            let worker = SubscriptionWorker {
                kind,
                source: deps.source.clone(),
                community: deps.community.clone(),
                retry: deps.retry.clone(),
                cancel: cancel.clone(),
                tx,
            };
            supervisor.workers.push(tokio::spawn(worker.run(initial)));
            match kind {
                SubscriptionKind::Submissions => supervisor.submissions = Some(rx),
                SubscriptionKind::Comments => supervisor.comments = Some(rx),
            }
        }

        Ok(supervisor)
    }

    /// Next item from whichever subscription has one ready first.
    ///
    /// Returns `None` on cancellation, or once both workers have given up
    /// (only possible with a bounded retry policy).
    pub async fn next(&mut self) -> Option<DiscussionItem> {
        loop {
            if self.submissions.is_none() && self.comments.is_none() {
                return None;
            }

            let next = tokio::select! {
                _ = self.cancel.cancelled() => Next::Cancelled,
                item = recv(&mut self.submissions) => match item {
                    Some(item) => Next::Item(item),
                    None => Next::Ended(SubscriptionKind::Submissions),
                },
                item = recv(&mut self.comments) => match item {
                    Some(item) => Next::Item(item),
                    None => Next::Ended(SubscriptionKind::Comments),
                },
            };

            match next {
                Next::Item(item) => return Some(item),
                Next::Cancelled => return None,
                Next::Ended(kind) => {
                    warn!(kind = %kind, "Subscription worker stopped");
                    match kind {
                        SubscriptionKind::Submissions => self.submissions = None,
                        SubscriptionKind::Comments => self.comments = None,
                    }
                }
            }
        }
    }
}

impl Drop for StreamSupervisor {
    fn drop(&mut self) {
        self.cancel.cancel();
        for worker in &self.workers {
            worker.abort();
        }
    }
}

/// Pending forever once a handoff channel has been retired, so `select!`
/// only ever completes on live ones.
async fn recv(rx: &mut Option<mpsc::Receiver<DiscussionItem>>) -> Option<DiscussionItem> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn subscribe(
    source: &dyn DiscussionSource,
    kind: SubscriptionKind,
    community: &str,
) -> Result<ItemChannel, SubscribeError> {
    match kind {
        SubscriptionKind::Submissions => source.subscribe_submissions(community).await,
        SubscriptionKind::Comments => source.subscribe_comments(community).await,
    }
}

/// Owns one subscription for the life of the process.
struct SubscriptionWorker {
    kind: SubscriptionKind,
    source: Arc<dyn DiscussionSource>,
    community: String,
    retry: RetryPolicy,
    cancel: CancellationToken,
    tx: mpsc::Sender<DiscussionItem>,
}

impl SubscriptionWorker {
    async fn run(self, initial: ItemChannel) {
        let mut channel = initial;
        loop {
            if !self.forward(&mut channel).await {
                return;
            }
            warn!(kind = %self.kind, "Subscription closed, recreating");

            match self.reconnect().await {
                Some(fresh) => channel = fresh,
                None => return,
            }
        }
    }

    /// Pump items until the channel closes (`true`) or the worker must stop
    /// because of cancellation or a dropped supervisor (`false`).
    async fn forward(&self, channel: &mut ItemChannel) -> bool {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => return false,
                event = channel.next() => event,
            };

            match event {
                Some(SubscriptionEvent::Item(item)) => {
                    let sent = tokio::select! {
                        _ = self.cancel.cancelled() => return false,
                        sent = self.tx.send(item) => sent,
                    };
                    if sent.is_err() {
                        return false;
                    }
                }
                Some(SubscriptionEvent::Closed) | None => return true,
            }
        }
    }

    /// Re-subscribe until it works, the retry policy gives up, or we are
    /// cancelled. Nothing from this subscription is emitted meanwhile.
    async fn reconnect(&self) -> Option<ItemChannel> {
        let mut attempt = 0u32;
        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                result = subscribe(self.source.as_ref(), self.kind, &self.community) => result,
            };

            let err = match result {
                Ok(channel) => {
                    info!(kind = %self.kind, attempts = attempt + 1, "Subscription recreated");
                    return Some(channel);
                }
                Err(e) => e,
            };
            attempt += 1;

            let Some(delay) = self.retry.delay_for(attempt) else {
                error!(
                    kind = %self.kind,
                    attempts = attempt,
                    error = %err,
                    "Giving up on subscription"
                );
                return None;
            };

            if err.is_credentials() {
                error!(
                    kind = %self.kind,
                    attempt,
                    retry_in_secs = delay.as_secs(),
                    error = %err,
                    "Credentials rejected while recreating subscription, will keep retrying"
                );
            } else {
                warn!(
                    kind = %self.kind,
                    attempt,
                    retry_in_secs = delay.as_secs(),
                    error = %err,
                    "Could not recreate subscription (upstream down?), retrying"
                );
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
