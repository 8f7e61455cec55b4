pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, SlackConfig};
pub use error::{ModeratorError, SubscribeError};
pub use types::*;
