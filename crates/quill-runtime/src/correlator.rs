//! Resolves a chat thread to its AI conversation, recovering lost bindings
//! from the thread's own history after a restart.

use std::sync::Arc;

use quill_slack::{SlackApiError, SlackClient};
use thiserror::Error;

use crate::annotation::recover_thread_id;
use crate::directory::ThreadDirectory;

/// `conversations.replies` includes the parent message alongside the limited
/// replies, so one reply is enough to see the opening answer.
const RECOVERY_HISTORY_LIMIT: usize = 1;

#[derive(Debug, Error)]
pub enum CorrelateError {
    #[error("conversation state lost for thread {thread_ts}")]
    StateLost { thread_ts: String },
    #[error(transparent)]
    Slack(#[from] SlackApiError),
}

pub struct Correlator {
    directory: Arc<ThreadDirectory>,
    slack: SlackClient,
}

impl Correlator {
    pub fn new(directory: Arc<ThreadDirectory>, slack: SlackClient) -> Self {
        Self { directory, slack }
    }

    /// In-memory lookup first; on a miss (every resumed thread after a
    /// restart) the binding is read back out of the thread's opening reply
    /// and re-inserted so later replies skip the round trip.
    pub async fn resolve_or_recover(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<String, CorrelateError> {
        if let Some(ai_thread_id) = self.directory.resolve(thread_ts) {
            return Ok(ai_thread_id);
        }

        let history = self
            .slack
            .thread_history(channel, thread_ts, RECOVERY_HISTORY_LIMIT)
            .await?;
        let recovered = recover_thread_id(&history).ok_or_else(|| CorrelateError::StateLost {
            thread_ts: thread_ts.to_string(),
        })?;

        tracing::info!(thread_ts, ai_thread_id = %recovered, "recovered thread binding from history");
        Ok(self.directory.bind_if_absent(thread_ts, &recovered))
    }
}
