//! HTTP client for the Assistants API endpoints Quill drives.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::types::{
    Assistant, FileObject, MessageList, QuillAiError, Run, RunStatus, Thread, ThreadMessage,
};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 20_000;
const DEFAULT_POLL_MAX_ATTEMPTS: usize = 20;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_base: String,
    pub api_key: String,
    pub organization: Option<String>,
    /// Required for `create_run`; the bootstrap flow runs without one.
    pub assistant_id: Option<String>,
    pub request_timeout_ms: u64,
    pub poll_max_attempts: usize,
    pub poll_interval_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            organization: None,
            assistant_id: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            poll_max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    config: AssistantConfig,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Result<Self, QuillAiError> {
        if config.api_base.trim().is_empty() {
            return Err(QuillAiError::MissingConfig("assistant api base url"));
        }
        if config.api_key.trim().is_empty() {
            return Err(QuillAiError::MissingConfig("assistant api key"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("quill"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v1"));

        // The assistants backend can be slow; keep the timeout generous.
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            http,
            config: AssistantConfig {
                api_base: config.api_base.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    pub async fn create_thread(&self) -> Result<Thread, QuillAiError> {
        self.request_json(self.post("/v1/threads")).await
    }

    pub async fn create_message(
        &self,
        thread_id: &str,
        text: &str,
    ) -> Result<ThreadMessage, QuillAiError> {
        let request = self
            .post(&format!("/v1/threads/{thread_id}/messages"))
            .json(&json!({ "role": "user", "content": text }));
        self.request_json(request).await
    }

    pub async fn create_run(&self, thread_id: &str) -> Result<Run, QuillAiError> {
        let assistant_id = self
            .config
            .assistant_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(QuillAiError::MissingConfig("assistant id"))?;
        let request = self
            .post(&format!("/v1/threads/{thread_id}/runs"))
            .json(&json!({ "assistant_id": assistant_id }));
        self.request_json(request).await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, QuillAiError> {
        self.request_json(self.get(&format!("/v1/threads/{thread_id}/runs/{run_id}")))
            .await
    }

    /// Polls the run to a terminal state: re-fetches while the status is
    /// `queued` or `in_progress`, sleeping the poll interval between
    /// attempts, bounded by the attempt budget. Anything other than a final
    /// `completed` is an error carrying the last observed status.
    pub async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<Run, QuillAiError> {
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut run = self.get_run(thread_id, run_id).await?;

        let mut attempts = 0usize;
        while run.status.is_pending() && attempts < self.config.poll_max_attempts {
            tokio::time::sleep(interval).await;
            run = self.get_run(thread_id, run_id).await?;
            attempts += 1;
        }

        if run.status != RunStatus::Completed {
            return Err(QuillAiError::RunIncomplete { status: run.status });
        }
        Ok(run)
    }

    pub async fn list_messages_before(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<MessageList, QuillAiError> {
        let request = self
            .get(&format!("/v1/threads/{thread_id}/messages"))
            .query(&[("before", message_id)]);
        self.request_json(request).await
    }

    /// The full question-and-answer round trip: post the user text, issue a
    /// run, poll it to completion and collect every answer message the run
    /// produced into one text blob.
    pub async fn send_and_await_answer(
        &self,
        thread_id: &str,
        text: &str,
    ) -> Result<String, QuillAiError> {
        let message = self.create_message(thread_id, text).await?;
        let run = self.create_run(thread_id).await?;
        self.wait_for_run(thread_id, &run.id).await?;
        let messages = self.list_messages_before(thread_id, &message.id).await?;
        join_answer_fragments(&messages.data)
    }

    /// Bootstrap only: upload one file for assistant retrieval.
    pub async fn upload_file(&self, path: &Path) -> Result<FileObject, QuillAiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );
        self.request_json(self.post("/v1/files").multipart(form))
            .await
    }

    /// Bootstrap only: create the assistant resource over the uploaded files.
    pub async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        model: &str,
        tool_type: &str,
        file_ids: &[String],
    ) -> Result<Assistant, QuillAiError> {
        let request = self.post("/v1/assistants").json(&json!({
            "name": name,
            "instructions": instructions,
            "model": model,
            "tools": [{ "type": tool_type }],
            "file_ids": file_ids,
        }));
        self.request_json(request).await
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.decorate(self.http.post(format!("{}{path}", self.config.api_base)))
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.decorate(self.http.get(format!("{}{path}", self.config.api_base)))
    }

    fn decorate(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.bearer_auth(&self.config.api_key);
        match self.config.organization.as_deref() {
            Some(organization) if !organization.trim().is_empty() => {
                request.header("OpenAI-Organization", organization)
            }
            _ => request,
        }
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, QuillAiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuillAiError::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(&body, 800),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

/// The list endpoint returns messages newest first; the answer shown to the
/// user must read oldest first.
fn join_answer_fragments(messages: &[ThreadMessage]) -> Result<String, QuillAiError> {
    let fragments = messages
        .iter()
        .rev()
        .filter_map(|message| message.content.first())
        .map(|content| content.text.value.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>();

    if fragments.is_empty() {
        return Err(QuillAiError::EmptyAnswer);
    }
    Ok(fragments.join("\n\n"))
}

fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let truncated = body.chars().take(max_chars).collect::<String>();
    format!("{truncated}…")
}
