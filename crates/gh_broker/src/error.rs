use std::fmt;

use http::StatusCode;
use thiserror::Error;

#[derive(Debug)]
pub struct HttpStatusError {
    pub status: StatusCode,
    pub endpoint: String,
}

impl HttpStatusError {
    pub fn with_endpoint(status: StatusCode, endpoint: impl Into<String>) -> Self {
        Self {
            status,
            endpoint: endpoint.into(),
        }
    }
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected status {} for {}", self.status, self.endpoint)
    }
}

impl std::error::Error for HttpStatusError {}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(#[source] anyhow::Error),
    #[error(transparent)]
    Status(#[from] HttpStatusError),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("GraphQL errors: {}", .0.join("; "))]
    Graphql(Vec<String>),
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),
    #[error("invalid credential: {0}")]
    Credential(String),
}

impl TransportError {
    /// Network failures and non-2xx responses are worth another attempt;
    /// everything else is a definitive answer for this request.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Network(_) | TransportError::Status(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status(err) => Some(err.status),
            _ => None,
        }
    }
}
