use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gh_broker_requests_total",
        "GraphQL requests by response status class",
        &["status"]
    )
    .expect("requests total")
});

pub static RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gh_broker_retries_total",
        "Retries scheduled by the backoff wrapper, per operation",
        &["operation"]
    )
    .expect("retries")
});

pub static GRAPHQL_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gh_broker_graphql_errors_total",
        "Responses rejected because they carried a GraphQL error list"
    )
    .expect("graphql errors")
});

pub static SLEEP_SECONDS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gh_broker_rate_limit_sleep_seconds_total",
        "Seconds spent waiting for the rate limit window to reset"
    )
    .expect("sleep seconds")
});

pub static RATE_REMAINING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "gh_broker_rate_remaining",
        "Remaining GraphQL quota from the most recent snapshot"
    )
    .expect("rate remaining")
});

pub static LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "gh_broker_latency_seconds",
        "Round-trip latency of a single GraphQL request attempt"
    )
    .expect("latency")
});
