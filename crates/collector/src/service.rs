use std::time::Instant;

use anyhow::Result;
use common::AppError;
use tracing::{info, instrument};

use crate::fetcher::{AccountFilters, GraphqlRepoFetcher, RecordBuffer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationStrategy {
    #[default]
    TwoStep,
    Search,
}

#[derive(Debug, Clone)]
pub enum FetchMode {
    Repo {
        nwo: String,
    },
    Query {
        query: String,
        min_stars: u64,
        max_repos: usize,
    },
    Location {
        location: String,
        strategy: LocationStrategy,
        include_orgs: bool,
        max_users: Option<usize>,
        max_repos: usize,
        language: Option<String>,
        filters: AccountFilters,
    },
}

impl FetchMode {
    pub fn label(&self) -> &'static str {
        match self {
            FetchMode::Repo { .. } => "repo",
            FetchMode::Query { .. } => "query",
            FetchMode::Location {
                strategy: LocationStrategy::TwoStep,
                ..
            } => "two_step",
            FetchMode::Location {
                strategy: LocationStrategy::Search,
                ..
            } => "location_search",
        }
    }
}

pub struct Collector {
    fetcher: GraphqlRepoFetcher,
}

impl Collector {
    pub fn new(fetcher: GraphqlRepoFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &GraphqlRepoFetcher {
        &self.fetcher
    }

    /// Runs `mode` to completion, leaving every record in `buffer`. Returns
    /// the number of records the run added.
    #[instrument(skip_all, fields(mode = mode.label()))]
    pub async fn run(&self, mode: &FetchMode, buffer: &mut RecordBuffer) -> Result<usize> {
        let started = Instant::now();
        let before = buffer.len();

        match mode {
            FetchMode::Repo { nwo } => {
                let record = self
                    .fetcher
                    .fetch_repo_details(nwo)
                    .await?
                    .ok_or_else(|| AppError::NotFound(nwo.clone()))?;
                buffer.push(record);
                buffer.finish()?;
            }
            FetchMode::Query {
                query,
                min_stars,
                max_repos,
            } => {
                self.fetcher
                    .fetch_by_query(query, *min_stars, *max_repos, buffer)
                    .await?;
            }
            FetchMode::Location {
                location,
                strategy: LocationStrategy::Search,
                language,
                max_repos,
                filters,
                ..
            } => {
                self.fetcher
                    .fetch_by_location_search(
                        location,
                        language.as_deref(),
                        filters.min_stars,
                        *max_repos,
                        buffer,
                    )
                    .await?;
            }
            FetchMode::Location {
                location,
                strategy: LocationStrategy::TwoStep,
                include_orgs,
                max_users,
                filters,
                ..
            } => {
                self.fetcher
                    .fetch_by_location_two_step(
                        location,
                        *include_orgs,
                        *max_users,
                        filters,
                        buffer,
                    )
                    .await?;
            }
        }

        let added = buffer.len() - before;
        info!(
            records = added,
            elapsed_secs = started.elapsed().as_secs(),
            "fetch finished"
        );
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_strategy() {
        let location = |strategy| FetchMode::Location {
            location: "Peru".into(),
            strategy,
            include_orgs: true,
            max_users: None,
            max_repos: 10,
            language: None,
            filters: AccountFilters::default(),
        };
        assert_eq!(location(LocationStrategy::TwoStep).label(), "two_step");
        assert_eq!(location(LocationStrategy::Search).label(), "location_search");
        assert_eq!(FetchMode::Repo { nwo: "a/b".into() }.label(), "repo");
    }
}
