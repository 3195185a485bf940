//! HTTP-level tests for the OpenAI-compatible chat client against a mock server.

use herald_core::{AssistantConfig, BackendError, ChatBackend, OpenAiChat};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> AssistantConfig {
    AssistantConfig {
        api_base: format!("{}/v1", server.uri()),
        api_key: "test-key".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn plain_string_reply_is_returned_and_remembered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hi there" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chat = OpenAiChat::from_config(&config_for(&server)).unwrap();
    assert_eq!(chat.model(), "llama3");

    let reply = chat.chat("hello").await.unwrap();
    assert_eq!(reply.extract_text(), "Hi there");
    // system + user + assistant
    assert_eq!(chat.history_len().await, 3);
}

#[tokio::test]
async fn part_list_reply_is_flattened() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": [
                { "type": "text", "text": "first" },
                { "type": "text", "text": "second" }
            ] } }]
        })))
        .mount(&server)
        .await;

    let chat = OpenAiChat::from_config(&config_for(&server)).unwrap();
    let reply = chat.chat("hello").await.unwrap();
    assert_eq!(reply.extract_text(), "first second");
}

#[tokio::test]
async fn error_status_is_reported_and_history_rolled_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let chat = OpenAiChat::from_config(&config_for(&server)).unwrap();
    let err = chat.chat("hello").await.unwrap_err();
    match err {
        BackendError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(chat.history_len().await, 1);
}
