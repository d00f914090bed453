pub mod types;

pub use types::{FailureKind, InvocationFailure, InvocationRequest, InvocationResponse};

use std::time::Duration;
use thiserror::Error;
use tracing::{info, info_span, Instrument};

use crate::config::{Config, ConfigError};
use crate::github::{CommentRecord, GitHubClient, GitHubError, RepoSlug, SourceHost};
use crate::review::{CompletionService, ModelSettings, OpenAiClient, ReviewError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Invalid invocation request: {0}")]
    InvalidRequest(String),

    #[error("Failed to fetch pull request diff: {0}")]
    Fetch(#[source] GitHubError),

    #[error("Failed to generate review: {0}")]
    Generate(#[from] ReviewError),

    #[error("Failed to post review comment: {0}")]
    Publish(#[source] GitHubError),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Config(ConfigError::MissingCredential(_)) => {
                FailureKind::MissingCredential
            }
            PipelineError::Config(_) | PipelineError::HttpClient(_) => FailureKind::Config,
            PipelineError::InvalidRequest(_) => FailureKind::InvalidRequest,
            PipelineError::Fetch(e) | PipelineError::Publish(e) => match e {
                GitHubError::Transport(_) => FailureKind::Transport,
                GitHubError::Status { .. } => FailureKind::HttpStatus,
                GitHubError::InvalidRepository(_) => FailureKind::InvalidRequest,
            },
            PipelineError::Generate(e) => match e {
                ReviewError::Transport(_) => FailureKind::Transport,
                ReviewError::Status { .. } => FailureKind::HttpStatus,
                ReviewError::MalformedResponse(_) => FailureKind::MalformedResponse,
                ReviewError::EmptyDiff => FailureKind::InvalidRequest,
            },
        }
    }

    pub fn to_failure(&self) -> InvocationFailure {
        InvocationFailure {
            error_kind: self.kind(),
            error_message: self.to_string(),
        }
    }
}

/// Decode the trigger's JSON payload. Any decoding failure is an invalid request.
pub fn parse_request(raw_payload: &str) -> Result<InvocationRequest, PipelineError> {
    serde_json::from_str(raw_payload)
        .map_err(|e| PipelineError::InvalidRequest(format!("malformed payload: {e}")))
}

/// Resolve credentials, build the GitHub and completion clients from `config`,
/// and run one review invocation.
///
/// A missing credential fails here, before any request is sent.
pub async fn invoke(
    config: &Config,
    request: &InvocationRequest,
) -> Result<InvocationResponse, PipelineError> {
    let credentials = config.credentials()?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .map_err(PipelineError::HttpClient)?;

    let host = GitHubClient::new(
        http.clone(),
        &config.github.api_base,
        credentials.github_token,
    );
    let model = OpenAiClient::new(
        http,
        &config.completion.api_base,
        credentials.completion_api_key,
        ModelSettings {
            model: config.completion.model.clone(),
            max_tokens: config.completion.max_tokens,
            max_diff_bytes: config.review.max_diff_bytes,
        },
    );

    handle(&host, &model, request).await
}

/// Run fetch → generate → publish for one pull request.
///
/// Stages run strictly in order and the first failure aborts the rest, so a
/// comment is only ever posted once feedback has been fully obtained. Repeated
/// calls with the same request post repeated comments.
pub async fn handle(
    host: &dyn SourceHost,
    model: &dyn CompletionService,
    request: &InvocationRequest,
) -> Result<InvocationResponse, PipelineError> {
    let repo: RepoSlug = request
        .repository_name
        .parse()
        .map_err(|e: GitHubError| PipelineError::InvalidRequest(e.to_string()))?;
    let number = request.pull_request_number.value().ok_or_else(|| {
        PipelineError::InvalidRequest(format!(
            "pull request number '{}' is not a positive integer",
            request.pull_request_number
        ))
    })?;

    let span = info_span!("review_invocation", repo = %repo, pr = number);
    async {
        info!("fetching diff");
        let diff = host
            .fetch_diff(&repo, number)
            .await
            .map_err(PipelineError::Fetch)?;

        info!(diff_bytes = diff.len(), "generating review");
        let feedback = model.generate_review(&diff).await?;

        info!("publishing comment");
        let comment = CommentRecord::from_feedback(feedback.as_str());
        host.post_comment(&repo, number, &comment)
            .await
            .map_err(PipelineError::Publish)?;

        info!("review posted");
        Ok::<_, PipelineError>(InvocationResponse::success())
    }
    .instrument(span)
    .await
}
