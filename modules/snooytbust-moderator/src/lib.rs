pub mod blacklist;
pub mod deps;
pub mod links;
pub mod moderator;
pub mod notify;
pub mod pipeline;
pub mod retry;
pub mod stream;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod types;
