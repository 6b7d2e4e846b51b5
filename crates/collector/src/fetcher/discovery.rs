use std::collections::{HashSet, VecDeque};
use std::fmt;

use chrono::{Duration, NaiveDate, Utc};
use common::text::join_qualifiers;
use gh_broker::TransportError;
use normalizer::SearchPage;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::fetcher::queries::{USER_COUNT_QUERY, USER_SEARCH_QUERY};
use crate::fetcher::GraphqlRepoFetcher;
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    User,
    Organization,
}

impl AccountKind {
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Organization => "organization",
        }
    }

    pub fn location_query(&self, location: &str) -> String {
        let kind = match self {
            AccountKind::User => "user",
            AccountKind::Organization => "org",
        };
        format!("location:\"{location}\" type:{kind}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn split(&self) -> Option<(DateRange, DateRange)> {
        let days = self.days();
        if days <= 1 {
            return None;
        }
        let mid = self.start + Duration::days(days / 2);
        Some((
            DateRange::new(self.start, mid),
            DateRange::new(mid + Duration::days(1), self.end),
        ))
    }

    pub fn qualifier(&self) -> String {
        format!("created:{}..{}", self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl GraphqlRepoFetcher {
    /// Every user login matching `location`, followed by organization logins
    /// when `include_orgs` is set. The organization pass only gets whatever
    /// is left of `max_users`, and is skipped when nothing is left.
    pub async fn fetch_accounts_by_location(
        &self,
        location: &str,
        include_orgs: bool,
        max_users: Option<usize>,
    ) -> Result<Vec<String>, TransportError> {
        info!(location, "discovering users");
        let mut accounts = self
            .discover_accounts(&AccountKind::User.location_query(location), max_users)
            .await?;
        record_discovered(AccountKind::User, accounts.len());
        info!(location, count = accounts.len(), "found users");

        if include_orgs {
            let remaining = max_users.map(|max| max.saturating_sub(accounts.len()));
            if remaining == Some(0) {
                info!(location, "account limit reached; skipping organizations");
            } else {
                info!(location, "discovering organizations");
                let orgs = self
                    .discover_accounts(
                        &AccountKind::Organization.location_query(location),
                        remaining,
                    )
                    .await?;
                record_discovered(AccountKind::Organization, orgs.len());
                info!(location, count = orgs.len(), "found organizations");
                accounts.extend(orgs);
            }
        }

        info!(location, total = accounts.len(), "account discovery finished");
        Ok(accounts)
    }

    pub async fn discover_accounts(
        &self,
        base_query: &str,
        max_users: Option<usize>,
    ) -> Result<Vec<String>, TransportError> {
        let range = DateRange::new(self.config.discovery_start, Utc::now().date_naive());
        self.discover_accounts_in(base_query, range, max_users).await
    }

    /// Enumerates logins for `base_query` across `range`, halving any
    /// sub-range whose count exceeds the search ceiling. Halves go back on
    /// the front of the queue, so narrow ranges resolve first.
    ///
    /// A failed count skips its range. A failed rate-limit check is returned.
    pub async fn discover_accounts_in(
        &self,
        base_query: &str,
        range: DateRange,
        max_users: Option<usize>,
    ) -> Result<Vec<String>, TransportError> {
        let ceiling = self.config.search_ceiling;
        let mut queue = VecDeque::from([range]);
        let mut logins: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let is_full = |logins: &[String]| max_users.is_some_and(|max| logins.len() >= max);

        while !is_full(&logins) {
            let Some(range) = queue.pop_front() else {
                break;
            };
            let query = join_qualifiers([base_query.to_string(), range.qualifier()]);

            self.broker.wait_if_low(self.config.min_rate_limit).await?;
            let count = match self
                .broker
                .execute(USER_COUNT_QUERY, Some(json!({ "query": query })))
                .await
            {
                Ok(data) => SearchPage::from_data(&data).user_count,
                Err(err) => {
                    warn!(
                        range = %range,
                        error = %err,
                        "counting accounts failed; skipping range"
                    );
                    continue;
                }
            };
            if count == 0 {
                continue;
            }

            let remaining = max_users.map(|max| max.saturating_sub(logins.len()) as u64);
            let wanted = if count <= ceiling {
                remaining.map_or(count, |left| count.min(left))
            } else if let Some((left, right)) = range.split() {
                metrics::DATE_RANGE_SPLITS_TOTAL.inc();
                debug!(range = %range, count, "splitting date range");
                queue.push_front(right);
                queue.push_front(left);
                continue;
            } else {
                metrics::TRUNCATED_RANGES_TOTAL.inc();
                warn!(
                    range = %range,
                    count,
                    ceiling,
                    "range cannot be split further; accounts past the ceiling are unreachable"
                );
                remaining.map_or(ceiling, |left| ceiling.min(left))
            };

            let found = self.paginated_account_search(&query, wanted).await?;
            for login in found {
                if is_full(&logins) {
                    break;
                }
                if seen.insert(login.clone()) {
                    logins.push(login);
                }
            }
            debug!(range = %range, total = logins.len(), "range enumerated");
        }

        Ok(logins)
    }

    pub async fn paginated_account_search(
        &self,
        query: &str,
        max_count: u64,
    ) -> Result<Vec<String>, TransportError> {
        let mut logins = Vec::new();
        let mut cursor: Option<String> = None;

        while (logins.len() as u64) < max_count {
            self.broker.wait_if_low(self.config.min_rate_limit).await?;

            let first = (max_count - logins.len() as u64)
                .min(u64::from(self.config.account_page_size));
            let variables = json!({ "query": query, "first": first, "after": cursor });
            let data = match self.broker.execute(USER_SEARCH_QUERY, Some(variables)).await {
                Ok(data) => data,
                Err(err) => {
                    warn!(query, error = %err, "account search page failed");
                    break;
                }
            };

            let page = SearchPage::from_data(&data);
            for login in page.logins() {
                logins.push(login);
                if logins.len() as u64 >= max_count {
                    break;
                }
            }
            match page.page_info.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        Ok(logins)
    }
}

fn record_discovered(kind: AccountKind, count: usize) {
    metrics::ACCOUNTS_DISCOVERED_TOTAL
        .with_label_values(&[kind.label()])
        .inc_by(count as u64);
}
