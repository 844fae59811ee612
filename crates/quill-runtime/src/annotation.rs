//! The recovery annotation format: a conversation's opening reply carries the
//! AI thread id, fixed prefix stripped, as the single plain-text element of a
//! trailing context block. Binding recovery walks exactly that slot, so the
//! embed and extract sides live together here.

use quill_slack::ThreadHistory;

pub const AI_THREAD_ID_PREFIX: &str = "thread_";

/// Index of the message holding the annotation: the root message is the
/// user's, the next one is the relay's own opening reply.
const OPENING_REPLY_INDEX: usize = 1;

pub fn annotation_token(ai_thread_id: &str) -> &str {
    ai_thread_id
        .strip_prefix(AI_THREAD_ID_PREFIX)
        .unwrap_or(ai_thread_id)
}

pub fn thread_id_from_token(token: &str) -> String {
    format!("{AI_THREAD_ID_PREFIX}{token}")
}

/// Walks a fetched thread history back to the embedded AI thread id:
/// opening reply → last block → first element → text. Any missing step means
/// the binding is unrecoverable.
pub fn recover_thread_id(history: &ThreadHistory) -> Option<String> {
    let message = history.messages.get(OPENING_REPLY_INDEX)?;
    let block = message.blocks.last()?;
    let element = block.elements.first()?;
    let token = element.text.as_deref()?.trim();
    if token.is_empty() {
        return None;
    }
    Some(thread_id_from_token(token))
}
