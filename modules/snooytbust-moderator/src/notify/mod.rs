pub mod backend;
pub mod noop;
pub mod slack;

use tracing::{debug, warn};

use snooytbust_common::ModerationEvent;

use backend::NotifyBackend;

/// Best-effort front for a notification backend: one attempt per event,
/// failures logged and dropped. No retry, no queue.
pub struct Notifier {
    backend: Box<dyn NotifyBackend>,
}

impl Notifier {
    pub fn new(backend: Box<dyn NotifyBackend>) -> Self {
        Self { backend }
    }

    pub fn disabled() -> Self {
        Self::new(Box::new(noop::NoopBackend))
    }

    pub async fn notify(&self, event: &ModerationEvent) {
        match self.backend.send(event).await {
            Ok(()) => debug!(
                thing_id = %event.item.id,
                channel_id = event.publisher.publisher_id.as_str(),
                "Moderation notice sent"
            ),
            Err(e) => warn!(
                thing_id = %event.item.id,
                channel_id = event.publisher.publisher_id.as_str(),
                error = %e,
                "Failed to send moderation notice"
            ),
        }
    }
}
