use serde::Deserialize;
use thiserror::Error;

/// Thread history page from `conversations.replies`, oldest first. Only the
/// block structure the binding recovery walks is deserialized.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadHistory {
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    #[serde(default)]
    pub blocks: Vec<MessageBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub elements: Vec<BlockElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockElement {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub ts: String,
}

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("missing configuration value: {0}")]
    MissingConfig(&'static str),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("slack api {method} failed with status {status}: {body}")]
    HttpStatus {
        method: &'static str,
        status: u16,
        body: String,
    },
    #[error("slack api {method} failed: {error}")]
    Api { method: &'static str, error: String },
}

impl SlackApiError {
    /// Reaction markers are best-effort; re-adding or re-removing one is not
    /// a real failure.
    pub fn is_benign_reaction_error(&self) -> bool {
        matches!(
            self,
            Self::Api { error, .. } if error == "already_reacted" || error == "no_reaction"
        )
    }
}
