//! Slack Web API client: thread messages, thread history and reaction markers.
mod client;
mod types;

pub use client::{SlackClient, SlackConfig};
pub use types::{
    BlockElement, HistoryMessage, MessageBlock, PostedMessage, SlackApiError, ThreadHistory,
};
