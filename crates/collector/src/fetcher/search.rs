use anyhow::Result;
use common::text::{contains_ignore_case, join_qualifiers};
use normalizer::{extract_record, SearchPage};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::fetcher::queries::{with_repository_fields, SEARCH_REPOS_QUERY};
use crate::fetcher::{GraphqlRepoFetcher, RecordBuffer};
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ReachedMax,
    EndOfResults,
    EmptyPage,
    MissingCursor,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub matched: usize,
    pub scanned: usize,
    pub stop: StopReason,
}

pub fn build_search_query(language: Option<&str>, min_stars: u64) -> String {
    let language = language.map(|lang| format!("language:{lang}"));
    join_qualifiers([
        language.unwrap_or_default(),
        format!("stars:>={min_stars}"),
        "sort:stars".to_string(),
    ])
}

pub fn build_custom_query(custom_query: &str, min_stars: u64) -> String {
    if custom_query.contains("stars:") {
        custom_query.trim().to_string()
    } else {
        join_qualifiers([custom_query.to_string(), format!("stars:>={min_stars}")])
    }
}

impl GraphqlRepoFetcher {
    /// A failed page ends the loop without an error; records gathered so far
    /// are still saved.
    pub async fn search_repositories(
        &self,
        query: &str,
        max_repos: usize,
        location_filter: Option<&str>,
        buffer: &mut RecordBuffer,
    ) -> Result<SearchSummary> {
        let mode = if location_filter.is_some() {
            "location_search"
        } else {
            "query"
        };
        info!(
            query,
            location = location_filter.unwrap_or_default(),
            max_repos,
            rate_limit = %self.broker.rate_limit_info().await,
            "searching repositories"
        );

        let document = with_repository_fields(SEARCH_REPOS_QUERY);
        let mut cursor: Option<String> = None;
        let mut matched = 0usize;
        let mut scanned = 0usize;

        let stop = loop {
            if matched >= max_repos {
                break StopReason::ReachedMax;
            }
            if let Err(err) = self.broker.wait_if_low(self.config.min_rate_limit).await {
                warn!(error = %err, matched, "rate limit check failed; stopping search");
                break StopReason::Failed;
            }

            let variables = json!({
                "query": query,
                "first": self.config.page_size,
                "after": cursor,
            });
            let data = match self.broker.execute(&document, Some(variables)).await {
                Ok(data) => data,
                Err(err) => {
                    warn!(error = %err, matched, "search page failed; stopping search");
                    break StopReason::Failed;
                }
            };

            let page = SearchPage::from_data(&data);
            if page.nodes.is_empty() {
                info!(matched, "no more results");
                break StopReason::EmptyPage;
            }

            for node in &page.nodes {
                let record = extract_record(node);
                scanned += 1;
                metrics::NODES_SCANNED_TOTAL.inc();
                if let Some(location) = location_filter {
                    if !contains_ignore_case(&record.owner_location, location) {
                        continue;
                    }
                }
                buffer.push(record);
                matched += 1;
                metrics::RECORDS_FETCHED_TOTAL
                    .with_label_values(&[mode])
                    .inc();
                if matched >= max_repos {
                    break;
                }
            }
            debug!(
                matched,
                scanned,
                remaining = ?self.broker.rate_remaining().await,
                "search page processed"
            );

            if matched >= max_repos {
                break StopReason::ReachedMax;
            }
            match page.page_info.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None if page.page_info.has_next_page => {
                    warn!(matched, "next page advertised without a cursor; stopping search");
                    break StopReason::MissingCursor;
                }
                None => {
                    info!(matched, "reached end of search results");
                    break StopReason::EndOfResults;
                }
            }
        };

        buffer.finish()?;
        info!(
            matched,
            scanned,
            stop = ?stop,
            rate_limit = %self.broker.rate_limit_info().await,
            "search finished"
        );
        Ok(SearchSummary {
            matched,
            scanned,
            stop,
        })
    }

    pub async fn fetch_by_query(
        &self,
        custom_query: &str,
        min_stars: u64,
        max_repos: usize,
        buffer: &mut RecordBuffer,
    ) -> Result<SearchSummary> {
        let query = build_custom_query(custom_query, min_stars);
        self.search_repositories(&query, max_repos, None, buffer)
            .await
    }

    pub async fn fetch_by_location_search(
        &self,
        location: &str,
        language: Option<&str>,
        min_stars: u64,
        max_repos: usize,
        buffer: &mut RecordBuffer,
    ) -> Result<SearchSummary> {
        let query = build_search_query(language, min_stars);
        self.search_repositories(&query, max_repos, Some(location), buffer)
            .await
    }
}
