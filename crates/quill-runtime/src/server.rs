//! Webhook ingress. The acknowledgment never waits on backend work: events
//! are classified, spawned and answered `ok` in one pass.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;

use crate::dispatcher::Dispatcher;
use crate::event::InboundEvent;
use crate::signature::{current_unix_timestamp_seconds, SignatureVerifier};

pub struct AppState {
    pub verifier: SignatureVerifier,
    pub dispatcher: Arc<Dispatcher>,
}

pub fn router(state: Arc<AppState>, events_path: &str) -> Router {
    Router::new()
        .route(events_path, post(handle_events))
        .route("/healthz", get(handle_health))
        .with_state(state)
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(json!({ "status": "ok" })))
}

async fn handle_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let timestamp = header_str(&headers, state.verifier.timestamp_header());
    let signature = header_str(&headers, state.verifier.signature_header());
    if let Err(error) = state.verifier.verify(
        &body,
        timestamp,
        signature,
        current_unix_timestamp_seconds(),
    ) {
        // Opaque rejection: the caller learns nothing, the log everything.
        tracing::warn!(error = %error, "rejected webhook request");
        return StatusCode::NOT_FOUND.into_response();
    }

    let inbound: InboundEvent = match serde_json::from_slice(&body) {
        Ok(inbound) => inbound,
        Err(error) => {
            tracing::warn!(error = %error, "failed to parse webhook body");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    // One-time handshake when the webhook is registered.
    if inbound.is_url_verification() {
        tracing::info!(challenge = %inbound.challenge, "answering url verification");
        return inbound.challenge.into_response();
    }

    if let Some(event) = inbound.into_processable_message() {
        let dispatcher = state.dispatcher.clone();
        // Fire and forget: no result is awaited here, and in-flight work is
        // not cancelled on shutdown. Completion shows up in the logs and as
        // messages posted back into the thread.
        tokio::spawn(async move { dispatcher.handle(event).await });
    }

    "ok".into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
