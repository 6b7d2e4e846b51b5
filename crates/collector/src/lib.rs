pub mod fetcher;
pub mod metrics;
pub mod service;
pub mod sink;

pub use fetcher::{AccountFilters, GraphqlRepoFetcher, RecordBuffer};
pub use service::{Collector, FetchMode, LocationStrategy};
pub use sink::{CsvSink, JsonLinesSink, OutputFormat, ParquetSink, RecordSink};
