use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

pub static RECORDS_FETCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_records_fetched_total",
        "Repository records appended to the output buffer, per fetch mode",
        &["mode"]
    )
    .expect("collector records fetched")
});

pub static NODES_SCANNED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_nodes_scanned_total",
        "Repository nodes extracted from search pages, before any location filter"
    )
    .expect("collector nodes scanned")
});

pub static CHECKPOINTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_checkpoints_total",
        "Periodic saves triggered by the record buffer"
    )
    .expect("collector checkpoints")
});

pub static ACCOUNTS_DISCOVERED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_accounts_discovered_total",
        "Distinct logins found by location discovery, per account kind",
        &["kind"]
    )
    .expect("collector accounts discovered")
});

pub static ACCOUNT_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_account_failures_total",
        "Accounts whose repository listing failed and contributed no records"
    )
    .expect("collector account failures")
});

pub static DATE_RANGE_SPLITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_date_range_splits_total",
        "Creation-date ranges halved because their match count exceeded the search ceiling"
    )
    .expect("collector date range splits")
});

pub static TRUNCATED_RANGES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_truncated_ranges_total",
        "Single-day ranges enumerated only up to the search ceiling"
    )
    .expect("collector truncated ranges")
});

pub fn render() -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
