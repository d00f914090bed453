pub mod types;

pub use types::{CommentRecord, DiffPayload, RepoSlug};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const CLIENT_USER_AGENT: &str = "pr-reviewer";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("GitHub API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),
}

/// The source-hosting side of a review: where diffs come from and where
/// feedback goes.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Fetch the complete unified diff of a pull request.
    async fn fetch_diff(&self, repo: &RepoSlug, number: u64) -> Result<DiffPayload, GitHubError>;

    /// Create a new comment on the pull request's discussion thread.
    async fn post_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        comment: &CommentRecord,
    ) -> Result<(), GitHubError>;
}

/// GitHub REST client authenticated with a single token.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, api_base: &str, token: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[derive(Serialize)]
struct CreateComment<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct CreatedComment {
    id: u64,
}

#[async_trait]
impl SourceHost for GitHubClient {
    #[instrument(skip(self, repo, number), fields(repo = %repo, pr = number))]
    async fn fetch_diff(&self, repo: &RepoSlug, number: u64) -> Result<DiffPayload, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_base, repo.owner, repo.repo, number
        );

        debug!("fetching PR diff from GitHub API");
        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, DIFF_MEDIA_TYPE)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let diff_text = ensure_success(response).await?.text().await?;
        debug!(diff_bytes = diff_text.len(), "received PR diff");

        Ok(DiffPayload::new(diff_text))
    }

    #[instrument(skip(self, repo, number, comment), fields(repo = %repo, pr = number, body_bytes = comment.body.len()))]
    async fn post_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        comment: &CommentRecord,
    ) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_base, repo.owner, repo.repo, number
        );

        debug!("posting review comment to GitHub API");
        let response = self
            .http
            .post(&url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .bearer_auth(&self.token)
            .json(&CreateComment {
                body: &comment.body,
            })
            .send()
            .await?;

        let response_text = ensure_success(response).await?.text().await?;
        // The comment id is informational only.
        match serde_json::from_str::<CreatedComment>(&response_text) {
            Ok(created) => debug!(comment_id = created.id, "comment created"),
            Err(_) => debug!("comment created"),
        }

        Ok(())
    }
}

/// Turn any non-2xx response into `GitHubError::Status`, keeping the body for diagnosis.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GitHubError::Status {
        status: status.as_u16(),
        body,
    })
}
