#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use collector::{GraphqlRepoFetcher, RecordSink};
use common::config::FetchConfig;
use gh_broker::{GithubBroker, RateLimitSnapshot, TransportError};
use normalizer::RepositoryRecord;
use serde_json::{json, Value};

type Handler = Box<dyn Fn(&str, &Value) -> Result<Value, TransportError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Call {
    pub operation: String,
    pub variables: Value,
}

impl Call {
    pub fn query(&self) -> &str {
        self.variables["query"].as_str().unwrap_or_default()
    }
}

/// Answers each request through `handler(operation_name, variables)` and
/// records every call.
pub struct StubBroker {
    handler: Handler,
    calls: Mutex<Vec<Call>>,
    waits: AtomicUsize,
    wait_budget: Option<usize>,
}

impl StubBroker {
    pub fn new(
        handler: impl Fn(&str, &Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::build(handler, None)
    }

    /// Rate-limit checks succeed `budget` times, then fail.
    pub fn with_wait_budget(
        budget: usize,
        handler: impl Fn(&str, &Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::build(handler, Some(budget))
    }

    fn build(
        handler: impl Fn(&str, &Value) -> Result<Value, TransportError> + Send + Sync + 'static,
        wait_budget: Option<usize>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            waits: AtomicUsize::new(0),
            wait_budget,
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .collect()
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GithubBroker for StubBroker {
    async fn execute(&self, query: &str, variables: Option<Value>) -> Result<Value, TransportError> {
        let operation = operation_name(query).to_string();
        let variables = variables.unwrap_or(Value::Null);
        self.calls.lock().unwrap().push(Call {
            operation: operation.clone(),
            variables: variables.clone(),
        });
        (self.handler)(&operation, &variables)
    }

    async fn refresh_rate_limit(&self) -> Result<RateLimitSnapshot, TransportError> {
        Ok(RateLimitSnapshot {
            remaining: 5000,
            limit: Some(5000),
            reset_at: "2030-01-01T00:00:00Z".into(),
            cost: Some(1),
        })
    }

    async fn wait_if_low(&self, _threshold: i64) -> Result<(), TransportError> {
        let done = self.waits.fetch_add(1, Ordering::SeqCst);
        match self.wait_budget {
            Some(budget) if done >= budget => Err(TransportError::Network(anyhow::anyhow!(
                "rate limit endpoint unreachable"
            ))),
            _ => Ok(()),
        }
    }

    async fn rate_limit_info(&self) -> String {
        "5000/5000 (resets at 00:00:00)".into()
    }

    async fn rate_remaining(&self) -> Option<i64> {
        Some(5000)
    }
}

/// `query Name(...)` -> `Name`
pub fn operation_name(document: &str) -> &str {
    document
        .trim_start()
        .strip_prefix("query ")
        .and_then(|rest| rest.split(['(', ' ', '{']).next())
        .unwrap_or_default()
}

pub fn fetcher(broker: Arc<StubBroker>) -> GraphqlRepoFetcher {
    GraphqlRepoFetcher::new(broker, FetchConfig::default())
}

pub fn fetcher_with(broker: Arc<StubBroker>, config: FetchConfig) -> GraphqlRepoFetcher {
    GraphqlRepoFetcher::new(broker, config)
}

pub fn graphql_error(message: &str) -> TransportError {
    TransportError::Graphql(vec![message.to_string()])
}

pub fn repo_node(nwo: &str, stars: u64, location: &str) -> Value {
    let owner = nwo.split('/').next().unwrap_or_default();
    json!({
        "nameWithOwner": nwo,
        "name": nwo.split('/').nth(1).unwrap_or_default(),
        "stargazerCount": stars,
        "owner": {
            "login": owner,
            "__typename": "User",
            "location": location
        }
    })
}

pub fn repo_page(nodes: Vec<Value>, next: Option<&str>) -> Value {
    json!({
        "search": {
            "repositoryCount": nodes.len(),
            "pageInfo": { "hasNextPage": next.is_some(), "endCursor": next },
            "nodes": nodes
        },
        "rateLimit": { "remaining": 4999, "resetAt": "2030-01-01T00:00:00Z" }
    })
}

pub fn user_count(count: u64) -> Value {
    json!({ "search": { "userCount": count } })
}

pub fn account_page(logins: &[&str], next: Option<&str>) -> Value {
    let nodes: Vec<Value> = logins
        .iter()
        .map(|login| json!({ "login": login, "__typename": "User" }))
        .collect();
    json!({
        "search": {
            "userCount": logins.len(),
            "pageInfo": { "hasNextPage": next.is_some(), "endCursor": next },
            "nodes": nodes
        }
    })
}

pub fn cursor(variables: &Value) -> Option<&str> {
    variables["after"].as_str()
}

#[derive(Default)]
pub struct RecordingSink {
    saves: Mutex<Vec<usize>>,
}

impl RecordingSink {
    pub fn saves(&self) -> Vec<usize> {
        self.saves.lock().unwrap().clone()
    }
}

impl RecordSink for RecordingSink {
    fn save(&self, records: &[RepositoryRecord], _destination: &Path) -> Result<()> {
        self.saves.lock().unwrap().push(records.len());
        Ok(())
    }
}
