use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::deps::ModeratorDeps;
use crate::pipeline::ModerationPipeline;
use crate::stream::StreamSupervisor;
use crate::types::ModerationStats;

/// The main worker: takes items off the merged stream one at a time and
/// runs each through the pipeline to completion before taking the next.
pub struct Moderator {
    streams: StreamSupervisor,
    pipeline: ModerationPipeline,
    cancel: CancellationToken,
}

impl Moderator {
    /// Subscribe to both streams. Fails if either initial subscription fails.
    pub async fn start(deps: &ModeratorDeps, cancel: CancellationToken) -> Result<Self> {
        let streams = StreamSupervisor::connect(deps, &cancel).await?;
        let pipeline = ModerationPipeline::new(deps);
        Ok(Self {
            streams,
            pipeline,
            cancel,
        })
    }

    /// Run until cancelled. Steady-state failures never end the loop.
    pub async fn run(mut self) -> ModerationStats {
        let mut stats = ModerationStats::default();

        loop {
            let Some(item) = self.streams.next().await else {
                break;
            };

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => {
                    warn!(thing_id = %item.id, "Shutdown requested mid-item");
                    break;
                }
                outcome = self.pipeline.process(&item) => outcome,
            };
            stats.record(item.kind(), &outcome);
        }

        info!("Moderator stopped. {stats}");
        stats
    }
}
