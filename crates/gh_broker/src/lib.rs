pub mod backoff;
pub mod broker;
pub mod error;
pub mod metrics;
pub mod model;
pub mod rate_limit;
pub mod token;

pub use backoff::{retry_with_backoff, RetryPolicy};
pub use broker::{GithubBroker, GithubBrokerBuilder, HttpExec, ReqwestExecutor};
pub use error::{HttpStatusError, TransportError};
pub use model::RateLimitSnapshot;
pub use rate_limit::RateLimitTracker;
pub use token::GithubToken;
