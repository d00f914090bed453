use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload handed over by the CI trigger.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    /// `owner/repo`
    pub repository_name: String,
    pub pull_request_number: PullRequestNumber,
}

/// CI templating hands the number over as either a JSON string or integer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PullRequestNumber {
    Number(u64),
    Text(String),
}

impl PullRequestNumber {
    /// The positive pull request number, or `None` if it is zero or not numeric.
    pub fn value(&self) -> Option<u64> {
        let number = match self {
            PullRequestNumber::Number(n) => *n,
            PullRequestNumber::Text(s) => s.trim().parse().ok()?,
        };
        (number > 0).then_some(number)
    }
}

impl fmt::Display for PullRequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PullRequestNumber::Number(n) => write!(f, "{n}"),
            PullRequestNumber::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Terminal result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    /// JSON-encoded body, e.g. `"\"Success\""`
    pub body: String,
}

impl InvocationResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: serde_json::Value::from("Success").to_string(),
        }
    }
}

/// Classification of every way an invocation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    HttpStatus,
    MalformedResponse,
    MissingCredential,
    InvalidRequest,
    Config,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Transport => "transport",
            FailureKind::HttpStatus => "http_status",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::MissingCredential => "missing_credential",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Structured record emitted for a failed invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationFailure {
    pub error_kind: FailureKind,
    pub error_message: String,
}
