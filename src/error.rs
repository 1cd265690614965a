use crate::models::family::Family;
use crate::utils::json_recovery::RecoveryError;
use serde_json::Value as JsonValue;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generation request timed out after {0}s")]
    Timeout(u64),

    #[error("Provider error {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Provider returned no text: {0}")]
    EmptyResponse(String),

    #[error("Malformed model output: {0}")]
    MalformedOutput(#[from] RecoveryError),

    #[error("{family} violates '{rule}'")]
    ContractViolation {
        family: Family,
        rule: String,
        item: Option<JsonValue>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn violation(family: Family, rule: impl Into<String>, item: Option<&JsonValue>) -> Self {
        Error::ContractViolation {
            family,
            rule: rule.into(),
            item: item.cloned(),
        }
    }

    /// Transport failures and unparseable output are worth another request;
    /// contract violations point at a prompt/schema mismatch and are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::MalformedOutput(_) | Error::EmptyResponse(_) => true,
            Error::Provider { status, .. } => *status == 429 || *status >= 500,
            Error::Reqwest(err) => !err.is_builder() && !err.is_decode(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err {
            e if e.is_status() => Error::Provider {
                status: e.status().map(|s| s.as_u16()).unwrap_or_default(),
                body: e.to_string(),
            },
            other => Error::Reqwest(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_retry_only_on_throttle_and_server_faults() {
        let throttled = Error::Provider { status: 429, body: String::new() };
        let unavailable = Error::Provider { status: 503, body: String::new() };
        let bad_request = Error::Provider { status: 400, body: String::new() };

        assert!(throttled.is_retryable());
        assert!(unavailable.is_retryable());
        assert!(!bad_request.is_retryable());
    }

    #[test]
    fn contract_violations_are_not_retried() {
        let err = Error::violation(Family::Quantitative, "exact count 12", None);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "XYZ violates 'exact count 12'");
        assert!(Error::Timeout(30).is_retryable());
    }
}
