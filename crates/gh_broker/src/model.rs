use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RATE_LIMIT_QUERY: &str = r#"
query {
  rateLimit {
    remaining
    resetAt
    limit
    cost
  }
}
"#;

#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<Value>>,
}

impl GraphqlResponse {
    pub fn error_messages(&self) -> Option<Vec<String>> {
        let errors = self.errors.as_ref().filter(|errors| !errors.is_empty())?;
        Some(
            errors
                .iter()
                .map(|err| {
                    err.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| err.to_string())
                })
                .collect(),
        )
    }

    pub fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        let value = self.data.as_ref()?.get("rateLimit")?;
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn into_data(self) -> Value {
        match self.data {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(data) => data,
        }
    }
}

/// Quota as reported by the `rateLimit` sub-object of a response.
///
/// Some query shapes select only `remaining` and `resetAt`, so `limit` and
/// `cost` are optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSnapshot {
    #[serde(default)]
    pub remaining: i64,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub reset_at: String,
    #[serde(default)]
    pub cost: Option<i64>,
}

pub fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_partial_rate_limit() {
        let response: GraphqlResponse = serde_json::from_value(json!({
            "data": {
                "search": { "userCount": 3 },
                "rateLimit": { "remaining": 4990, "resetAt": "2024-05-01T12:00:00Z" }
            }
        }))
        .unwrap();

        let snapshot = response.rate_limit().unwrap();
        assert_eq!(snapshot.remaining, 4990);
        assert_eq!(snapshot.limit, None);
        assert_eq!(snapshot.reset_at, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn error_messages_fall_back_to_raw_entry() {
        let response: GraphqlResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Something went wrong" }, { "type": "INTERNAL" }]
        }))
        .unwrap();

        let messages = response.error_messages().unwrap();
        assert_eq!(messages[0], "Something went wrong");
        assert!(messages[1].contains("INTERNAL"));
        assert!(response.into_data().as_object().unwrap().is_empty());
    }
}
