use async_trait::async_trait;

use snooytbust_common::ModerationEvent;

/// Pluggable delivery for moderation notices.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    /// Deliver one notice. One attempt; the caller decides what a failure means.
    async fn send(&self, event: &ModerationEvent) -> anyhow::Result<()>;
}
