use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModeratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything that fails before the moderation loop starts. The process
    /// exits rather than running degraded.
    #[error("Startup failed: {0}")]
    Startup(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Why a subscription could not be (re)created. Both kinds are retried;
/// the distinction only changes how loudly it is logged.
#[derive(Error, Debug)]
pub enum SubscribeError {
    #[error("transient subscription failure: {0}")]
    Transient(anyhow::Error),

    #[error("credentials rejected: {0}")]
    Credentials(anyhow::Error),
}

impl SubscribeError {
    pub fn is_credentials(&self) -> bool {
        matches!(self, SubscribeError::Credentials(_))
    }
}
