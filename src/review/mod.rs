pub mod prompt;
pub mod types;

pub use prompt::ReviewPrompt;
pub use types::ReviewFeedback;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::github::DiffPayload;
use types::{ChatRequest, ChatResponse};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Completion API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Completion API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Pull request diff is empty, nothing to review")]
    EmptyDiff,
}

/// A language model that turns a diff into review feedback.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn generate_review(&self, diff: &DiffPayload) -> Result<ReviewFeedback, ReviewError>;
}

/// Settings fixed for the lifetime of an [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub max_diff_bytes: usize,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    settings: ModelSettings,
}

impl OpenAiClient {
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        api_key: String,
        settings: ModelSettings,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            settings,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.settings.model, diff_bytes = diff.len()))]
    async fn generate_review(&self, diff: &DiffPayload) -> Result<ReviewFeedback, ReviewError> {
        if diff.is_blank() {
            return Err(ReviewError::EmptyDiff);
        }

        let prompt = ReviewPrompt::build(diff, self.settings.max_diff_bytes);
        let request = ChatRequest {
            model: &self.settings.model,
            messages: prompt.into_messages(),
            max_tokens: self.settings.max_tokens,
        };

        debug!("requesting chat completion");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ReviewError::Status {
                status: status.as_u16(),
                body,
            });
        }

        extract_feedback(&body)
    }
}

/// Parse a completion response body and pull out `choices[0].message.content`.
fn extract_feedback(body: &str) -> Result<ReviewFeedback, ReviewError> {
    let raw: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ReviewError::MalformedResponse(format!("invalid JSON: {e}")))?;
    debug!(response = %raw, "completion response");

    let parsed: ChatResponse = serde_json::from_value(raw)
        .map_err(|e| ReviewError::MalformedResponse(format!("unexpected shape: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ReviewError::MalformedResponse("no choices returned".to_string()))?
        .message
        .content
        .ok_or_else(|| ReviewError::MalformedResponse("first choice has no content".to_string()))?;

    ReviewFeedback::new(content)
        .ok_or_else(|| ReviewError::MalformedResponse("first choice content is empty".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn settings() -> ModelSettings {
        ModelSettings {
            model: "gpt-4o".to_string(),
            max_tokens: 300,
            max_diff_bytes: 60_000,
        }
    }

    fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
        OpenAiClient::new(
            reqwest::Client::new(),
            &server.url(),
            "sk-test".to_string(),
            settings(),
        )
    }

    #[tokio::test]
    async fn test_generate_review_sends_chat_request() {
        let diff = DiffPayload::new("--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n");
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({
                    "model": "gpt-4o",
                    "max_tokens": 300
                })),
                Matcher::Regex(r#""role":"system","content":"You are a code review assistant\.""#.to_string()),
                Matcher::Regex(r#""role":"user""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Rename `a` to something descriptive."}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let feedback = client_for(&server).generate_review(&diff).await.unwrap();

        assert_eq!(feedback.as_str(), "Rename `a` to something descriptive.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_review_rejects_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .generate_review(&DiffPayload::new("+x"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_generate_review_transport_failure() {
        // Nothing listens on port 1.
        let client = OpenAiClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1",
            "sk-test".to_string(),
            settings(),
        );
        let err = client
            .generate_review(&DiffPayload::new("+x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::Transport(_)));
    }

    #[tokio::test]
    async fn test_empty_diff_skips_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let err = client_for(&server)
            .generate_review(&DiffPayload::new("\n"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::EmptyDiff));
        mock.assert_async().await;
    }

    #[test]
    fn test_extract_feedback_missing_choices() {
        let err = extract_feedback(r#"{"id":"chatcmpl-1","object":"chat.completion"}"#).unwrap_err();
        assert!(matches!(err, ReviewError::MalformedResponse(_)));
    }

    #[test]
    fn test_extract_feedback_empty_choices() {
        let err = extract_feedback(r#"{"choices":[]}"#).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_extract_feedback_invalid_json() {
        let err = extract_feedback("<html>Bad Gateway</html>").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_extract_feedback_null_and_blank_content() {
        let null_content = extract_feedback(r#"{"choices":[{"message":{"content":null}}]}"#);
        assert!(matches!(null_content, Err(ReviewError::MalformedResponse(_))));

        let blank_content = extract_feedback(r#"{"choices":[{"message":{"content":"  "}}]}"#);
        assert!(matches!(blank_content, Err(ReviewError::MalformedResponse(_))));
    }

    #[test]
    fn test_extract_feedback_uses_first_choice() {
        let feedback = extract_feedback(
            r#"{"choices":[{"message":{"content":"first"}},{"message":{"content":"second"}}]}"#,
        )
        .unwrap();
        assert_eq!(feedback.as_str(), "first");
    }
}
