//! Per-event state machine: start a conversation on a root message, continue
//! one on a thread reply, and keep the user informed when a backend lets us
//! down.

use std::sync::Arc;

use quill_ai::{AssistantClient, QuillAiError};
use quill_slack::{SlackApiError, SlackClient};
use thiserror::Error;

use crate::annotation::annotation_token;
use crate::correlator::{CorrelateError, Correlator};
use crate::directory::ThreadDirectory;
use crate::event::MessageEvent;

/// Posted to the thread on any failure; the user never sees raw error detail.
pub const FALLBACK_MESSAGE: &str =
    ":exploding_head: Sorry, sometimes i'm forgetful. Please start another thread.";

const THINKING_REACTION: &str = "thinking";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("chat transport failure: {0}")]
    Slack(#[from] SlackApiError),
    #[error("assistant transport failure: {0}")]
    Ai(#[from] QuillAiError),
    #[error("conversation state lost for thread {thread_ts}")]
    StateLost { thread_ts: String },
}

impl From<CorrelateError> for EventError {
    fn from(error: CorrelateError) -> Self {
        match error {
            CorrelateError::Slack(error) => Self::Slack(error),
            CorrelateError::StateLost { thread_ts } => Self::StateLost { thread_ts },
        }
    }
}

pub struct Dispatcher {
    slack: SlackClient,
    ai: AssistantClient,
    directory: Arc<ThreadDirectory>,
    correlator: Correlator,
}

impl Dispatcher {
    pub fn new(slack: SlackClient, ai: AssistantClient, directory: Arc<ThreadDirectory>) -> Self {
        let correlator = Correlator::new(directory.clone(), slack.clone());
        Self {
            slack,
            ai,
            directory,
            correlator,
        }
    }

    /// Entry point for one spawned event. Nothing propagates further than the
    /// log: the webhook has long been acknowledged, completion is observable
    /// only through the messages posted back into the thread.
    pub async fn handle(&self, event: MessageEvent) {
        let _gate = self.directory.guard(event.thread_root()).await;

        let result = if event.is_thread_reply() {
            self.continue_conversation(&event).await
        } else {
            self.start_conversation(&event).await
        };

        match result {
            Ok(()) => tracing::debug!(
                channel = %event.channel,
                thread_ts = %event.thread_root(),
                "message event processed"
            ),
            Err(error) => tracing::error!(
                channel = %event.channel,
                ts = %event.ts,
                thread_ts = %event.thread_root(),
                error = %error,
                "failed to process message event"
            ),
        }
    }

    async fn start_conversation(&self, event: &MessageEvent) -> Result<(), EventError> {
        // A failed marker aborts the event before any backend work starts.
        self.slack
            .add_reaction(&event.channel, THINKING_REACTION, &event.ts)
            .await?;

        let outcome = self.run_start_flow(event).await;
        self.clear_thinking(event).await;
        outcome
    }

    async fn run_start_flow(&self, event: &MessageEvent) -> Result<(), EventError> {
        let thread = match self.ai.create_thread().await {
            Ok(thread) => thread,
            Err(error) => {
                self.post_fallback(event).await;
                return Err(error.into());
            }
        };

        self.directory.bind(event.thread_root(), &thread.id);

        let answer = match self
            .ai
            .send_and_await_answer(&thread.id, &priming_prompt(&event.text))
            .await
        {
            Ok(answer) => answer,
            Err(error) => {
                self.post_fallback(event).await;
                return Err(error.into());
            }
        };

        if let Err(error) = self
            .slack
            .post_annotated_message(
                &event.channel,
                event.thread_root(),
                &answer,
                annotation_token(&thread.id),
            )
            .await
        {
            self.post_fallback(event).await;
            return Err(error.into());
        }
        Ok(())
    }

    async fn continue_conversation(&self, event: &MessageEvent) -> Result<(), EventError> {
        let ai_thread_id = match self
            .correlator
            .resolve_or_recover(&event.channel, &event.thread_ts)
            .await
        {
            Ok(id) => id,
            Err(error) => {
                self.post_fallback(event).await;
                return Err(error.into());
            }
        };

        // Best-effort on replies: the conversation is already established.
        if let Err(error) = self
            .slack
            .add_reaction(&event.channel, THINKING_REACTION, &event.ts)
            .await
        {
            if !error.is_benign_reaction_error() {
                tracing::warn!(channel = %event.channel, ts = %event.ts, error = %error, "failed to add thinking reaction");
            }
        }

        let outcome = self.run_reply_flow(event, &ai_thread_id).await;
        self.clear_thinking(event).await;
        outcome
    }

    async fn run_reply_flow(
        &self,
        event: &MessageEvent,
        ai_thread_id: &str,
    ) -> Result<(), EventError> {
        let answer = match self.ai.send_and_await_answer(ai_thread_id, &event.text).await {
            Ok(answer) => answer,
            Err(error) => {
                self.post_fallback(event).await;
                return Err(error.into());
            }
        };

        if let Err(error) = self
            .slack
            .post_message(&event.channel, event.thread_root(), &answer)
            .await
        {
            self.post_fallback(event).await;
            return Err(error.into());
        }
        Ok(())
    }

    /// Exactly one fallback message per failed event. Its own failure is not
    /// escalated; there is nobody left to tell.
    async fn post_fallback(&self, event: &MessageEvent) {
        if let Err(error) = self
            .slack
            .post_message(&event.channel, event.thread_root(), FALLBACK_MESSAGE)
            .await
        {
            tracing::warn!(
                channel = %event.channel,
                thread_ts = %event.thread_root(),
                error = %error,
                "failed to post fallback message"
            );
        }
    }

    async fn clear_thinking(&self, event: &MessageEvent) {
        if let Err(error) = self
            .slack
            .remove_reaction(&event.channel, THINKING_REACTION, &event.ts)
            .await
        {
            if !error.is_benign_reaction_error() {
                tracing::warn!(channel = %event.channel, ts = %event.ts, error = %error, "failed to remove thinking reaction");
            }
        }
    }
}

/// First instruction of a new conversation: pull the colleague's mention out
/// of the raw text and open the questionnaire.
fn priming_prompt(text: &str) -> String {
    format!(
        "Parse the \"Text\" and extract the name of the colleague as feedback receiver. \
The name is in the format like <@U069DBU1TGQ>.\n\
If you can't find a name, please ask the user to provide the name of the colleague.\n\
After that start with the questionnaire.\n\n\
Text: {text}"
    )
}
