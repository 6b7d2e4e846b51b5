use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use common::text::truncate_chars;
use http::{header, Method, Request, Response, Uri};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::backoff::{retry_with_backoff, RetryPolicy};
use crate::error::{HttpStatusError, TransportError};
use crate::metrics;
use crate::model::{
    status_class, GraphqlRequest, GraphqlResponse, RateLimitSnapshot, RATE_LIMIT_QUERY,
};
use crate::rate_limit::RateLimitTracker;
use crate::token::GithubToken;

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";

#[async_trait]
pub trait HttpExec: Send + Sync {
    async fn execute(&self, req: Request<Vec<u8>>) -> anyhow::Result<Response<Vec<u8>>>;
}

pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|err| TransportError::Network(err.into()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExec for ReqwestExecutor {
    async fn execute(&self, req: Request<Vec<u8>>) -> anyhow::Result<Response<Vec<u8>>> {
        let (parts, body) = req.into_parts();
        let mut builder = self.client.request(parts.method, parts.uri.to_string());
        builder = builder.headers(parts.headers);
        let resp = builder.body(body).send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        let mut response = Response::builder().status(status).body(bytes.to_vec())?;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[async_trait]
pub trait GithubBroker: Send + Sync {
    /// Executes `query` and returns the `data` payload. Transient failures are
    /// retried; an embedded error list fails immediately.
    async fn execute(&self, query: &str, variables: Option<Value>) -> Result<Value, TransportError>;

    async fn refresh_rate_limit(&self) -> Result<RateLimitSnapshot, TransportError>;

    async fn wait_if_low(&self, threshold: i64) -> Result<(), TransportError>;

    async fn rate_limit_info(&self) -> String;

    async fn rate_remaining(&self) -> Option<i64>;
}

pub struct GithubBrokerBuilder {
    token: GithubToken,
    endpoint: String,
    user_agent: String,
    retry: RetryPolicy,
    http_exec: Option<Arc<dyn HttpExec>>,
}

impl GithubBrokerBuilder {
    pub fn new(token: GithubToken) -> Self {
        Self {
            token,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: "github-repo-fetcher".to_string(),
            retry: RetryPolicy::new(3, Duration::from_secs(2)),
            http_exec: None,
        }
    }

    pub fn http_exec(mut self, exec: Arc<dyn HttpExec>) -> Self {
        self.http_exec = Some(exec);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn build(self) -> Result<Arc<dyn GithubBroker>, TransportError> {
        let endpoint: Uri = self
            .endpoint
            .parse()
            .map_err(|err: http::uri::InvalidUri| TransportError::Request(err.into()))?;
        let http_exec = match self.http_exec {
            Some(exec) => exec,
            None => Arc::new(ReqwestExecutor::new(&self.user_agent)?),
        };
        debug!(endpoint = %endpoint, schedule = ?self.retry.schedule(), "broker ready");

        Ok(Arc::new(LocalGithubBroker {
            http_exec,
            token: self.token,
            endpoint,
            user_agent: self.user_agent,
            retry: self.retry,
            tracker: Mutex::new(RateLimitTracker::new()),
        }))
    }
}

pub struct LocalGithubBroker {
    http_exec: Arc<dyn HttpExec>,
    token: GithubToken,
    endpoint: Uri,
    user_agent: String,
    retry: RetryPolicy,
    tracker: Mutex<RateLimitTracker>,
}

impl LocalGithubBroker {
    async fn send(&self, body: &[u8]) -> Result<Vec<u8>, TransportError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(header::AUTHORIZATION, self.token.authorization())
            .header(header::USER_AGENT, self.user_agent.as_str())
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())?;

        let start = Instant::now();
        let response = self.http_exec.execute(request).await;
        metrics::LATENCY.observe(start.elapsed().as_secs_f64());

        let response = match response {
            Ok(resp) => resp,
            Err(err) => {
                metrics::REQUESTS_TOTAL.with_label_values(&["error"]).inc();
                return Err(TransportError::Network(err));
            }
        };

        let status = response.status();
        metrics::REQUESTS_TOTAL
            .with_label_values(&[status_class(status)])
            .inc();
        if !status.is_success() {
            warn!(
                status = %status,
                body_preview = %body_preview(response.body()),
                "GitHub returned error response"
            );
            return Err(HttpStatusError::with_endpoint(status, "graphql").into());
        }
        Ok(response.into_body())
    }
}

#[async_trait]
impl GithubBroker for LocalGithubBroker {
    async fn execute(&self, query: &str, variables: Option<Value>) -> Result<Value, TransportError> {
        let payload = serde_json::to_vec(&GraphqlRequest {
            query,
            variables: variables.as_ref(),
        })?;

        let body = retry_with_backoff(
            &self.retry,
            "graphql request",
            || self.send(&payload),
            TransportError::is_transient,
        )
        .await?;

        let envelope: GraphqlResponse = serde_json::from_slice(&body)?;
        if let Some(snapshot) = envelope.rate_limit() {
            metrics::RATE_REMAINING.set(snapshot.remaining);
            self.tracker.lock().await.update(snapshot);
        }
        if let Some(messages) = envelope.error_messages() {
            metrics::GRAPHQL_ERRORS_TOTAL.inc();
            return Err(TransportError::Graphql(messages));
        }
        Ok(envelope.into_data())
    }

    async fn refresh_rate_limit(&self) -> Result<RateLimitSnapshot, TransportError> {
        let data = self.execute(RATE_LIMIT_QUERY, None).await?;
        let value = data.get("rateLimit").cloned().unwrap_or(Value::Null);
        let snapshot: RateLimitSnapshot = serde_json::from_value(value)?;
        Ok(snapshot)
    }

    async fn wait_if_low(&self, threshold: i64) -> Result<(), TransportError> {
        if self.tracker.lock().await.snapshot().is_none() {
            self.refresh_rate_limit().await?;
        }

        let (wait, remaining) = {
            let tracker = self.tracker.lock().await;
            (
                tracker.wait_duration(threshold, Utc::now()),
                tracker.remaining().unwrap_or_default(),
            )
        };

        match wait {
            Some(wait) if !wait.is_zero() => {
                info!(
                    remaining,
                    wait_secs = wait.as_secs(),
                    "rate limit low; waiting until reset"
                );
                metrics::SLEEP_SECONDS.inc_by(wait.as_secs());
                sleep(wait).await;
                self.refresh_rate_limit().await?;
            }
            Some(_) => {}
            None if remaining < threshold => {
                warn!(remaining, "rate limit low but reset time unknown; continuing");
            }
            None => {}
        }
        Ok(())
    }

    async fn rate_limit_info(&self) -> String {
        if self.tracker.lock().await.snapshot().is_none() {
            if let Err(err) = self.refresh_rate_limit().await {
                debug!(error = %err, "rate limit probe failed");
            }
        }
        self.tracker.lock().await.describe()
    }

    async fn rate_remaining(&self) -> Option<i64> {
        self.tracker.lock().await.remaining()
    }
}

fn body_preview(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }
    let text = String::from_utf8_lossy(body);
    truncate_chars(&text, 256)
}
