use std::fmt;
use std::str::FromStr;

use super::GitHubError;

/// Fixed header placed above the model's feedback in every posted comment.
pub const COMMENT_HEADER: &str = "Code Review Feedback:";

/// A validated `owner/repo` repository name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl FromStr for RepoSlug {
    type Err = GitHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GitHubError::InvalidRepository(s.to_string());

        let (owner, repo) = s.split_once('/').ok_or_else(invalid)?;
        let valid_part = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid_part(owner) || !valid_part(repo) {
            return Err(invalid());
        }

        Ok(RepoSlug {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Raw unified diff of one pull request, as returned by GitHub.
/// Nothing is parsed out of it; it is forwarded to the model as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPayload(String);

impl DiffPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Body of the single issue comment posted per successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub body: String,
}

impl CommentRecord {
    pub fn from_feedback(feedback: &str) -> Self {
        Self {
            body: format!("{COMMENT_HEADER}\n\n{feedback}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_repo_slug() {
        let slug: RepoSlug = "acme/widgets".parse().unwrap();
        assert_eq!(slug.owner, "acme");
        assert_eq!(slug.repo, "widgets");
        assert_eq!(slug.to_string(), "acme/widgets");

        let dotted: RepoSlug = "rust-lang/rust.vim".parse().unwrap();
        assert_eq!(dotted.repo, "rust.vim");
    }

    #[test]
    fn test_parse_invalid_repo_slug() {
        assert!("widgets".parse::<RepoSlug>().is_err());
        assert!("/widgets".parse::<RepoSlug>().is_err());
        assert!("acme/".parse::<RepoSlug>().is_err());
        assert!("acme/widgets/extra".parse::<RepoSlug>().is_err());
        assert!("acme/wid gets".parse::<RepoSlug>().is_err());
    }

    #[test]
    fn test_comment_record_has_header() {
        let record = CommentRecord::from_feedback("Looks good, minor nit on line 3.");
        assert_eq!(record.body, "Code Review Feedback:\n\nLooks good, minor nit on line 3.");
    }

    #[test]
    fn test_diff_payload_blank() {
        assert!(DiffPayload::new(" \n\t").is_blank());
        assert!(!DiffPayload::new("--- a/x\n+++ b/x\n").is_blank());
    }
}
