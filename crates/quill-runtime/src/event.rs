//! Inbound webhook payload shapes; only the fields the relay consumes.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub challenge: String,
    #[serde(default)]
    pub event: Option<MessageEvent>,
}

impl InboundEvent {
    pub fn is_url_verification(&self) -> bool {
        self.kind == "url_verification"
    }

    /// The only events that reach the dispatcher: a user-authored message
    /// (no bot id, a user profile present) inside an event callback.
    pub fn into_processable_message(self) -> Option<MessageEvent> {
        if self.kind != "event_callback" {
            return None;
        }
        let event = self.event?;
        if event.event_type != "message" || !event.bot_id.is_empty() || event.user_profile.is_none()
        {
            return None;
        }
        Some(event)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub thread_ts: String,
    #[serde(default)]
    pub event_ts: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub bot_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub real_name: String,
}

impl MessageEvent {
    /// An empty `thread_ts` marks the root message that starts a
    /// conversation; anything else is a reply within one.
    pub fn is_thread_reply(&self) -> bool {
        !self.thread_ts.is_empty()
    }

    /// The root timestamp anchoring the chat thread: the binding key, and
    /// the `thread_ts` every posted reply hangs off.
    pub fn thread_root(&self) -> &str {
        if self.is_thread_reply() {
            &self.thread_ts
        } else {
            &self.ts
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InboundEvent;

    fn parse(raw: &str) -> InboundEvent {
        serde_json::from_str(raw).expect("payload should parse")
    }

    #[test]
    fn url_verification_is_classified() {
        let inbound = parse(r#"{"type":"url_verification","challenge":"abc"}"#);
        assert!(inbound.is_url_verification());
        assert_eq!(inbound.challenge, "abc");
    }

    #[test]
    fn user_messages_are_processable() {
        let inbound = parse(
            r#"{
                "type": "event_callback",
                "event": {
                    "type": "message",
                    "ts": "1700000000.000100",
                    "channel": "C1",
                    "text": "feedback for <@U123>",
                    "user": "U9",
                    "user_profile": { "real_name": "Sam" }
                }
            }"#,
        );
        let event = inbound
            .into_processable_message()
            .expect("user message should be processable");
        assert!(!event.is_thread_reply());
        assert_eq!(event.thread_root(), "1700000000.000100");
    }

    #[test]
    fn replies_anchor_on_their_thread() {
        let inbound = parse(
            r#"{
                "type": "event_callback",
                "event": {
                    "type": "message",
                    "ts": "1700000000.000300",
                    "thread_ts": "1700000000.000100",
                    "channel": "C1",
                    "text": "more detail",
                    "user_profile": {}
                }
            }"#,
        );
        let event = inbound.into_processable_message().expect("processable");
        assert!(event.is_thread_reply());
        assert_eq!(event.thread_root(), "1700000000.000100");
    }

    #[test]
    fn bot_and_profile_less_messages_are_ignored() {
        let bot = parse(
            r#"{
                "type": "event_callback",
                "event": {
                    "type": "message",
                    "bot_id": "B1",
                    "user_profile": {}
                }
            }"#,
        );
        assert!(bot.into_processable_message().is_none());

        let no_profile = parse(
            r#"{"type":"event_callback","event":{"type":"message","text":"hi"}}"#,
        );
        assert!(no_profile.into_processable_message().is_none());

        let wrong_type = parse(
            r#"{"type":"event_callback","event":{"type":"reaction_added","user_profile":{}}}"#,
        );
        assert!(wrong_type.into_processable_message().is_none());

        let no_event = parse(r#"{"type":"event_callback"}"#);
        assert!(no_event.into_processable_message().is_none());
    }
}
