use common::{AppError, Result};
use normalizer::{extract_record, RepositoryRecord};
use serde_json::json;
use tracing::{info, warn};

use crate::fetcher::queries::{with_repository_fields, SINGLE_REPO_QUERY};
use crate::fetcher::GraphqlRepoFetcher;
use crate::metrics;

pub fn parse_nwo(nwo: &str) -> Result<(&str, &str)> {
    let mut parts = nwo.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner, name))
        }
        _ => Err(AppError::invalid(format!(
            "invalid repository `{nwo}`; expected owner/name"
        ))),
    }
}

impl GraphqlRepoFetcher {
    /// Looks up one repository. `Ok(None)` covers both a missing repository
    /// and a failed lookup; the failure is logged.
    pub async fn fetch_repo_details(&self, nwo: &str) -> Result<Option<RepositoryRecord>> {
        let (owner, name) = parse_nwo(nwo)?;

        if let Err(err) = self.broker.wait_if_low(self.config.min_rate_limit).await {
            warn!(nwo, error = %err, "rate limit check failed");
            return Ok(None);
        }

        let variables = json!({ "owner": owner, "name": name });
        let data = match self
            .broker
            .execute(&with_repository_fields(SINGLE_REPO_QUERY), Some(variables))
            .await
        {
            Ok(data) => data,
            Err(err) => {
                warn!(nwo, error = %err, "repository lookup failed");
                return Ok(None);
            }
        };

        match data.get("repository") {
            Some(node) if !node.is_null() => {
                metrics::RECORDS_FETCHED_TOTAL
                    .with_label_values(&["repo"])
                    .inc();
                let record = extract_record(node);
                info!(nwo = %record.nwo, stars = record.stars, "fetched repository");
                Ok(Some(record))
            }
            _ => {
                info!(nwo, "repository not found");
                Ok(None)
            }
        }
    }
}
