use httpmock::prelude::*;
use quill_slack::{SlackApiError, SlackClient, SlackConfig};
use serde_json::json;

fn test_client(base_url: &str) -> SlackClient {
    SlackClient::new(SlackConfig {
        api_base: base_url.to_string(),
        bot_token: "xoxb-test".to_string(),
        request_timeout_ms: 3_000,
    })
    .expect("slack client should be created")
}

#[tokio::test]
async fn post_message_sends_a_plain_thread_reply() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat.postMessage")
            .header("authorization", "Bearer xoxb-test")
            .json_body(json!({
                "channel": "C1",
                "thread_ts": "1700000000.000100",
                "text": "hello thread",
            }));
        then.status(200)
            .json_body(json!({ "ok": true, "ts": "1700000000.000200" }));
    });

    let posted = test_client(&server.base_url())
        .post_message("C1", "1700000000.000100", "hello thread")
        .await
        .expect("message should post");

    mock.assert();
    assert_eq!(posted.ts, "1700000000.000200");
}

#[tokio::test]
async fn annotated_message_carries_the_context_block() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/chat.postMessage").json_body(json!({
            "channel": "C1",
            "thread_ts": "1700000000.000100",
            "text": "What should I ask?\nLet's begin.",
            "blocks": [
                { "type": "section", "text": { "type": "mrkdwn", "text": "What should I ask?" } },
                { "type": "section", "text": { "type": "mrkdwn", "text": "Let's begin." } },
                { "type": "context", "elements": [{ "type": "plain_text", "text": "abc123" }] }
            ],
        }));
        then.status(200)
            .json_body(json!({ "ok": true, "ts": "1700000000.000300" }));
    });

    test_client(&server.base_url())
        .post_annotated_message(
            "C1",
            "1700000000.000100",
            "What should I ask?\nLet's begin.",
            "abc123",
        )
        .await
        .expect("annotated message should post");

    mock.assert();
}

#[tokio::test]
async fn thread_history_parses_the_block_structure() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/conversations.replies")
            .query_param("channel", "C1")
            .query_param("ts", "1700000000.000100")
            .query_param("oldest", "1700000000.000100")
            .query_param("limit", "1");
        then.status(200).json_body(json!({
            "ok": true,
            "messages": [
                { "text": "root message" },
                {
                    "blocks": [
                        { "type": "section", "elements": [] },
                        { "type": "context", "elements": [{ "type": "plain_text", "text": "abc123" }] }
                    ]
                }
            ]
        }));
    });

    let history = test_client(&server.base_url())
        .thread_history("C1", "1700000000.000100", 1)
        .await
        .expect("history should fetch");

    mock.assert();
    assert_eq!(history.messages.len(), 2);
    let second = &history.messages[1];
    let last_block = second.blocks.last().expect("blocks");
    assert_eq!(last_block.block_type, "context");
    assert_eq!(last_block.elements[0].text.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn reactions_round_trip_and_benign_errors_are_recognizable() {
    let server = MockServer::start();
    let add = server.mock(|when, then| {
        when.method(POST).path("/reactions.add").json_body(json!({
            "channel": "C1",
            "name": "thinking_face",
            "timestamp": "1700000000.000100",
        }));
        then.status(200).json_body(json!({ "ok": true }));
    });
    let remove = server.mock(|when, then| {
        when.method(POST).path("/reactions.remove");
        then.status(200)
            .json_body(json!({ "ok": false, "error": "no_reaction" }));
    });

    let client = test_client(&server.base_url());
    client
        .add_reaction("C1", "thinking_face", "1700000000.000100")
        .await
        .expect("reaction should be added");
    let err = client
        .remove_reaction("C1", "thinking_face", "1700000000.000100")
        .await
        .expect_err("ok:false must surface");

    add.assert();
    remove.assert();
    assert!(err.is_benign_reaction_error());
}

#[tokio::test]
async fn api_level_failure_is_typed() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat.postMessage");
        then.status(200)
            .json_body(json!({ "ok": false, "error": "channel_not_found" }));
    });

    let err = test_client(&server.base_url())
        .post_message("C404", "1.1", "hello")
        .await
        .expect_err("ok:false must surface");
    match err {
        SlackApiError::Api { method, error } => {
            assert_eq!(method, "chat.postMessage");
            assert_eq!(error, "channel_not_found");
        }
        other => panic!("unexpected error: {other}"),
    }
}
