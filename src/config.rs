use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing credential: set {0} in the environment or the config file")]
    MissingCredential(&'static str),
}

/// Top-level configuration loaded from .pr-reviewer.toml.
/// All fields are optional; the tool runs with zero config as long as both
/// credentials are present in the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub review: ReviewConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// REST API root, overridable for GitHub Enterprise
    pub api_base: String,
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_base: String,
    pub model: String,
    /// Upper bound on generated tokens per review
    pub max_tokens: u32,
    /// Completion API key. If None, falls back to OPENAI_API_KEY env var.
    pub api_key: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 300,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Diffs longer than this are truncated before being sent to the model
    pub max_diff_bytes: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_diff_bytes: 60_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 120 }
    }
}

/// The two secrets an invocation needs. Read once, never mutated, never logged.
#[derive(Clone)]
pub struct Credentials {
    pub github_token: String,
    pub completion_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("github_token", &"<redacted>")
            .field("completion_api_key", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from `path`, or from .pr-reviewer.toml in the current
    /// directory when no path is given. A missing default file yields
    /// `Config::default()`; a missing explicit file is an error.
    ///
    /// Credentials left unset in the file are filled from the environment.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(".pr-reviewer.toml");
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Fill unset credentials using `lookup`. Config file values take precedence.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.github.token.is_none() {
            self.github.token = lookup(GITHUB_TOKEN_VAR);
        }
        if self.completion.api_key.is_none() {
            self.completion.api_key = lookup(OPENAI_API_KEY_VAR);
        }
    }

    /// Resolve both credentials, failing on the first one that is absent or blank.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let github_token = non_blank(self.github.token.as_deref())
            .ok_or(ConfigError::MissingCredential(GITHUB_TOKEN_VAR))?;
        let completion_api_key = non_blank(self.completion.api_key.as_deref())
            .ok_or(ConfigError::MissingCredential(OPENAI_API_KEY_VAR))?;

        Ok(Credentials {
            github_token,
            completion_api_key,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
