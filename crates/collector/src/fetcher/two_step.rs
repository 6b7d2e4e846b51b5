use anyhow::Result;
use common::text::join_qualifiers;
use gh_broker::TransportError;
use normalizer::{extract_record, RepositoryRecord, SearchPage};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::fetcher::queries::{with_repository_fields, SEARCH_REPOS_QUERY};
use crate::fetcher::{GraphqlRepoFetcher, RecordBuffer};
use crate::metrics;

#[derive(Debug, Clone, Default)]
pub struct AccountFilters {
    pub min_stars: u64,
    pub include_forks: bool,
    pub extra_filter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwoStepSummary {
    pub accounts: usize,
    pub failed_accounts: usize,
    pub records: usize,
}

pub fn build_account_query(login: &str, filters: &AccountFilters) -> String {
    let stars = if filters.min_stars > 0 {
        format!("stars:>={}", filters.min_stars)
    } else {
        String::new()
    };
    let forks = if filters.include_forks { "" } else { "fork:false" };
    join_qualifiers([
        format!("user:{login}"),
        stars,
        forks.to_string(),
        filters.extra_filter.clone(),
    ])
}

impl GraphqlRepoFetcher {
    pub async fn fetch_by_location_two_step(
        &self,
        location: &str,
        include_orgs: bool,
        max_users: Option<usize>,
        filters: &AccountFilters,
        buffer: &mut RecordBuffer,
    ) -> Result<TwoStepSummary> {
        info!(location, include_orgs, max_users = ?max_users, "step 1: finding accounts");
        let logins = self
            .fetch_accounts_by_location(location, include_orgs, max_users)
            .await?;
        if logins.is_empty() {
            info!(location, "no accounts found");
            return Ok(TwoStepSummary::default());
        }

        info!(
            accounts = logins.len(),
            min_stars = filters.min_stars,
            include_forks = filters.include_forks,
            extra_filter = %filters.extra_filter,
            "step 2: fetching repositories"
        );
        self.fetch_repos_for_accounts(&logins, filters, buffer).await
    }

    /// Appends every repository of every account to `buffer`. An account
    /// whose listing fails contributes nothing; the loop moves on. A failed
    /// rate-limit check saves what was gathered and ends the run with the error.
    pub async fn fetch_repos_for_accounts(
        &self,
        logins: &[String],
        filters: &AccountFilters,
        buffer: &mut RecordBuffer,
    ) -> Result<TwoStepSummary> {
        info!(
            accounts = logins.len(),
            rate_limit = %self.broker.rate_limit_info().await,
            "fetching repositories for accounts"
        );
        let mut summary = TwoStepSummary {
            accounts: logins.len(),
            ..TwoStepSummary::default()
        };

        for (index, login) in logins.iter().enumerate() {
            if let Err(err) = self.broker.wait_if_low(self.config.min_rate_limit).await {
                warn!(login = %login, error = %err, "rate limit check failed; stopping");
                buffer.finish()?;
                return Err(err.into());
            }

            match self.fetch_account_repos(login, filters).await {
                Ok(records) => {
                    summary.records += records.len();
                    metrics::RECORDS_FETCHED_TOTAL
                        .with_label_values(&["two_step"])
                        .inc_by(records.len() as u64);
                    buffer.extend(records);
                }
                Err(err) => {
                    summary.failed_accounts += 1;
                    metrics::ACCOUNT_FAILURES_TOTAL.inc();
                    warn!(login = %login, error = %err, "skipping account");
                }
            }
            debug!(
                done = index + 1,
                accounts = logins.len(),
                records = buffer.len(),
                remaining = ?self.broker.rate_remaining().await,
                "account processed"
            );
        }

        buffer.finish()?;
        info!(
            records = summary.records,
            failed_accounts = summary.failed_accounts,
            rate_limit = %self.broker.rate_limit_info().await,
            "fetched repositories for accounts"
        );
        Ok(summary)
    }

    pub async fn fetch_account_repos(
        &self,
        login: &str,
        filters: &AccountFilters,
    ) -> Result<Vec<RepositoryRecord>, TransportError> {
        let query = build_account_query(login, filters);
        let document = with_repository_fields(SEARCH_REPOS_QUERY);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            if cursor.is_some() {
                self.broker.wait_if_low(self.config.min_rate_limit).await?;
            }
            let variables = json!({
                "query": query,
                "first": self.config.page_size,
                "after": cursor,
            });
            let data = self.broker.execute(&document, Some(variables)).await?;

            let page = SearchPage::from_data(&data);
            if page.nodes.is_empty() {
                break;
            }
            records.extend(page.nodes.iter().map(extract_record));

            match page.page_info.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        debug!(login, records = records.len(), "account listed");
        Ok(records)
    }
}
