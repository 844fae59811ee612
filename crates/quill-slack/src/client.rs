//! HTTP client for the Slack Web API methods Quill drives.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{PostedMessage, SlackApiError, ThreadHistory};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Deserialize)]
struct MessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReactionResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct HistoryResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    messages: Vec<crate::types::HistoryMessage>,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub api_base: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            bot_token: String::new(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(config: SlackConfig) -> Result<Self, SlackApiError> {
        if config.api_base.trim().is_empty() {
            return Err(SlackApiError::MissingConfig("slack api base url"));
        }
        if config.bot_token.trim().is_empty() {
            return Err(SlackApiError::MissingConfig("slack bot token"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("quill"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.trim().to_string(),
        })
    }

    /// Plain thread reply.
    pub async fn post_message(
        &self,
        channel: &str,
        thread_ts: &str,
        text: &str,
    ) -> Result<PostedMessage, SlackApiError> {
        let payload = json!({
            "channel": channel,
            "thread_ts": thread_ts,
            "text": text,
        });
        self.post_chat_message(payload).await
    }

    /// Opening thread reply carrying the recovery annotation: one section
    /// block per paragraph, then a trailing context block whose single
    /// plain-text element is read back verbatim by binding recovery.
    pub async fn post_annotated_message(
        &self,
        channel: &str,
        thread_ts: &str,
        text: &str,
        annotation: &str,
    ) -> Result<PostedMessage, SlackApiError> {
        let payload = json!({
            "channel": channel,
            "thread_ts": thread_ts,
            "text": text,
            "blocks": annotated_blocks(text, annotation),
        });
        self.post_chat_message(payload).await
    }

    async fn post_chat_message(&self, payload: Value) -> Result<PostedMessage, SlackApiError> {
        let response: MessageResponse = self
            .request_json("chat.postMessage", self.post("chat.postMessage", &payload))
            .await?;
        if !response.ok {
            return Err(api_error("chat.postMessage", response.error));
        }
        Ok(PostedMessage {
            ts: response.ts.unwrap_or_default(),
        })
    }

    /// First page of a thread, oldest first, anchored at the root message.
    pub async fn thread_history(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: usize,
    ) -> Result<ThreadHistory, SlackApiError> {
        let request = self
            .http
            .get(format!("{}/conversations.replies", self.api_base))
            .bearer_auth(&self.bot_token)
            .query(&[
                ("channel", channel),
                ("ts", thread_ts),
                ("oldest", thread_ts),
                ("limit", &limit.to_string()),
            ]);
        let response: HistoryResponse = self.request_json("conversations.replies", request).await?;
        if !response.ok {
            return Err(api_error("conversations.replies", response.error));
        }
        Ok(ThreadHistory {
            messages: response.messages,
        })
    }

    pub async fn add_reaction(
        &self,
        channel: &str,
        name: &str,
        timestamp: &str,
    ) -> Result<(), SlackApiError> {
        self.send_reaction("reactions.add", channel, name, timestamp)
            .await
    }

    pub async fn remove_reaction(
        &self,
        channel: &str,
        name: &str,
        timestamp: &str,
    ) -> Result<(), SlackApiError> {
        self.send_reaction("reactions.remove", channel, name, timestamp)
            .await
    }

    async fn send_reaction(
        &self,
        method: &'static str,
        channel: &str,
        name: &str,
        timestamp: &str,
    ) -> Result<(), SlackApiError> {
        let payload = json!({
            "channel": channel,
            "name": name,
            "timestamp": timestamp,
        });
        let response: ReactionResponse = self.request_json(method, self.post(method, &payload)).await?;
        if !response.ok {
            return Err(api_error(method, response.error));
        }
        Ok(())
    }

    fn post(&self, method: &str, payload: &Value) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(payload)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SlackApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackApiError::HttpStatus {
                method,
                status: status.as_u16(),
                body: truncate_body(&body, 800),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

fn api_error(method: &'static str, error: Option<String>) -> SlackApiError {
    SlackApiError::Api {
        method,
        error: error.unwrap_or_else(|| "unknown error".to_string()),
    }
}

fn annotated_blocks(text: &str, annotation: &str) -> Vec<Value> {
    let mut blocks = text
        .trim()
        .split('\n')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            json!({
                "type": "section",
                "text": { "type": "mrkdwn", "text": part },
            })
        })
        .collect::<Vec<_>>();
    blocks.push(json!({
        "type": "context",
        "elements": [{ "type": "plain_text", "text": annotation }],
    }));
    blocks
}

fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let truncated = body.chars().take(max_chars).collect::<String>();
    format!("{truncated}…")
}
