use tracing::warn;

use super::types::{ChatMessage, Role};
use crate::github::DiffPayload;

pub const SYSTEM_INSTRUCTION: &str = "You are a code review assistant.";

const USER_INSTRUCTION: &str =
    "Please review the following code changes and provide concise, actionable feedback:";

/// The two-message conversation sent to the completion service.
/// Built fresh for every invocation.
#[derive(Debug, Clone)]
pub struct ReviewPrompt {
    pub system: String,
    pub user: String,
}

impl ReviewPrompt {
    /// Embed `diff` after the fixed instruction, truncating it to at most
    /// `max_diff_bytes` bytes of diff text.
    pub fn build(diff: &DiffPayload, max_diff_bytes: usize) -> Self {
        let diff_text = truncate_diff(diff.as_str(), max_diff_bytes);
        Self {
            system: SYSTEM_INSTRUCTION.to_string(),
            user: format!("{USER_INSTRUCTION}\n\n{diff_text}"),
        }
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: self.system,
            },
            ChatMessage {
                role: Role::User,
                content: self.user,
            },
        ]
    }
}

/// Cut `diff` at the last char boundary within `max_bytes` and append a
/// marker stating how much was kept.
fn truncate_diff(diff: &str, max_bytes: usize) -> String {
    if diff.len() <= max_bytes {
        return diff.to_string();
    }

    let mut cut = max_bytes;
    while !diff.is_char_boundary(cut) {
        cut -= 1;
    }

    warn!(
        diff_bytes = diff.len(),
        kept_bytes = cut,
        "diff exceeds max_diff_bytes, truncating"
    );
    format!(
        "{}\n\n[diff truncated: showing {} of {} bytes]",
        &diff[..cut],
        cut,
        diff.len()
    )
}
