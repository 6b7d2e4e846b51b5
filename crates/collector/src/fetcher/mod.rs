use std::sync::Arc;

use common::config::FetchConfig;
use gh_broker::GithubBroker;

pub mod buffer;
pub mod discovery;
pub mod queries;
pub mod repo;
pub mod search;
pub mod two_step;

pub use buffer::RecordBuffer;
pub use discovery::{AccountKind, DateRange};
pub use search::{SearchSummary, StopReason};
pub use two_step::{AccountFilters, TwoStepSummary};

pub struct GraphqlRepoFetcher {
    broker: Arc<dyn GithubBroker>,
    config: FetchConfig,
}

impl GraphqlRepoFetcher {
    pub fn new(broker: Arc<dyn GithubBroker>, config: FetchConfig) -> Self {
        Self { broker, config }
    }
}
