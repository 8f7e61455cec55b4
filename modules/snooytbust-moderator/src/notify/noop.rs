use async_trait::async_trait;

use snooytbust_common::ModerationEvent;

use super::backend::NotifyBackend;

/// Used when no Slack destination is configured.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn send(&self, _event: &ModerationEvent) -> anyhow::Result<()> {
        Ok(())
    }
}
