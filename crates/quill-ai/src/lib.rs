//! OpenAI Assistants API client: threads, messages, runs and run polling.
mod client;
mod types;

pub use client::{AssistantClient, AssistantConfig};
pub use types::{
    Assistant, FileObject, MessageContent, MessageList, MessageText, QuillAiError, Run, RunStatus,
    Thread, ThreadMessage,
};
