use std::fmt;

use http::HeaderValue;

use crate::error::TransportError;

/// Static bearer credential. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct GithubToken {
    secret: String,
}

impl GithubToken {
    pub fn new(secret: impl Into<String>) -> Result<Self, TransportError> {
        let secret = secret.into().trim().to_string();
        if secret.is_empty() {
            return Err(TransportError::Credential("GitHub token is required".into()));
        }
        if HeaderValue::from_str(&format!("Bearer {secret}")).is_err() {
            return Err(TransportError::Credential(
                "token contains characters not allowed in a header".into(),
            ));
        }
        Ok(Self { secret })
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.secret)
    }
}

impl fmt::Debug for GithubToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubToken")
            .field("secret", &"<redacted>")
            .finish()
    }
}
