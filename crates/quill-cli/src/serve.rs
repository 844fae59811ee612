//! The `serve` subcommand: assemble the runtime and run the webhook server.

use anyhow::{Context, Result};
use clap::Args;
use quill_ai::AssistantConfig;
use quill_runtime::{build_router, RuntimeConfig, DEFAULT_EVENTS_PATH};
use quill_slack::SlackConfig;
use tokio::net::TcpListener;

#[derive(Debug, Args)]
pub(crate) struct ServeArgs {
    #[arg(long, env = "QUILL_BIND", default_value = "0.0.0.0:3000")]
    bind: String,
    #[arg(long, env = "QUILL_EVENTS_PATH", default_value = DEFAULT_EVENTS_PATH)]
    events_path: String,

    #[arg(long, env = "SLACK_API_URL")]
    slack_api_url: String,
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    slack_bot_token: String,
    #[arg(long, env = "SLACK_SIGNING_SECRET", hide_env_values = true)]
    slack_signing_secret: String,
    #[arg(long, env = "QUILL_SLACK_TIMEOUT_MS", default_value_t = 5_000)]
    slack_timeout_ms: u64,
    #[arg(long, env = "QUILL_SIGNATURE_TOLERANCE_SECONDS", default_value_t = 300)]
    signature_tolerance_seconds: u64,

    #[arg(long, env = "OPENAI_API_URL")]
    openai_api_url: String,
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,
    #[arg(long, env = "OPENAI_ORGANIZATION")]
    openai_organization: Option<String>,
    #[arg(long, env = "OPENAI_ASSISTANT_ID")]
    assistant_id: String,
    #[arg(long, env = "QUILL_OPENAI_TIMEOUT_MS", default_value_t = 20_000)]
    openai_timeout_ms: u64,
    #[arg(long, env = "QUILL_POLL_MAX_ATTEMPTS", default_value_t = 20)]
    poll_max_attempts: usize,
    #[arg(long, env = "QUILL_POLL_INTERVAL_MS", default_value_t = 2_000)]
    poll_interval_ms: u64,
}

pub(crate) async fn run(args: ServeArgs) -> Result<()> {
    let app = build_router(RuntimeConfig {
        events_path: args.events_path.clone(),
        signing_secret: args.slack_signing_secret,
        signature_tolerance_seconds: args.signature_tolerance_seconds,
        slack: SlackConfig {
            api_base: args.slack_api_url,
            bot_token: args.slack_bot_token,
            request_timeout_ms: args.slack_timeout_ms,
        },
        assistant: AssistantConfig {
            api_base: args.openai_api_url,
            api_key: args.openai_api_key,
            organization: args.openai_organization,
            assistant_id: Some(args.assistant_id),
            request_timeout_ms: args.openai_timeout_ms,
            poll_max_attempts: args.poll_max_attempts,
            poll_interval_ms: args.poll_interval_ms,
        },
    })
    .context("invalid runtime configuration")?;

    let listener = TcpListener::bind(args.bind.as_str())
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound address")?;
    tracing::info!(addr = %local_addr, path = %args.events_path, "events webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("events webhook server exited unexpectedly")?;
    Ok(())
}
