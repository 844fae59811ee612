//! Runtime assembly: validate every configured value once at startup, then
//! hand back a ready router. Nothing in the request path re-validates.

use std::sync::Arc;

use axum::Router;
use quill_ai::{AssistantClient, AssistantConfig, QuillAiError};
use quill_slack::{SlackApiError, SlackClient, SlackConfig};
use thiserror::Error;

use crate::directory::ThreadDirectory;
use crate::dispatcher::Dispatcher;
use crate::server::{router, AppState};
use crate::signature::{SignatureError, SignatureVerifier};

pub const DEFAULT_EVENTS_PATH: &str = "/api/v1/events";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(&'static str),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Slack(#[from] SlackApiError),
    #[error(transparent)]
    Ai(#[from] QuillAiError),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub events_path: String,
    pub signing_secret: String,
    pub signature_tolerance_seconds: u64,
    pub slack: SlackConfig,
    pub assistant: AssistantConfig,
}

/// Builds the full service router. Every construction error surfaces here,
/// before the listener binds.
pub fn build_router(config: RuntimeConfig) -> Result<Router, ConfigError> {
    if config
        .assistant
        .assistant_id
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty()
    {
        return Err(ConfigError::Missing("assistant id"));
    }

    let verifier = SignatureVerifier::new(config.signing_secret)?
        .with_tolerance_seconds(config.signature_tolerance_seconds);
    let slack = SlackClient::new(config.slack)?;
    let ai = AssistantClient::new(config.assistant)?;
    let directory = Arc::new(ThreadDirectory::new());
    let dispatcher = Arc::new(Dispatcher::new(slack, ai, directory));

    let state = Arc::new(AppState {
        verifier,
        dispatcher,
    });
    Ok(router(state, &config.events_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RuntimeConfig {
        RuntimeConfig {
            events_path: DEFAULT_EVENTS_PATH.to_string(),
            signing_secret: "secret".to_string(),
            signature_tolerance_seconds: 300,
            slack: SlackConfig {
                api_base: "https://slack.example.com/api".to_string(),
                bot_token: "xoxb-test".to_string(),
                request_timeout_ms: 5_000,
            },
            assistant: AssistantConfig {
                api_base: "https://ai.example.com".to_string(),
                api_key: "sk-test".to_string(),
                assistant_id: Some("asst_1".to_string()),
                ..AssistantConfig::default()
            },
        }
    }

    #[test]
    fn a_valid_config_builds() {
        build_router(valid_config()).expect("router should build");
    }

    #[test]
    fn missing_values_fail_construction() {
        let mut config = valid_config();
        config.signing_secret = String::new();
        assert!(matches!(
            build_router(config),
            Err(ConfigError::Signature(_))
        ));

        let mut config = valid_config();
        config.slack.bot_token = String::new();
        assert!(matches!(build_router(config), Err(ConfigError::Slack(_))));

        let mut config = valid_config();
        config.assistant.api_key = String::new();
        assert!(matches!(build_router(config), Err(ConfigError::Ai(_))));

        let mut config = valid_config();
        config.assistant.assistant_id = None;
        assert!(matches!(
            build_router(config),
            Err(ConfigError::Missing("assistant id"))
        ));
    }
}
