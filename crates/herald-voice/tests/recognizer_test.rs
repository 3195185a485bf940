//! Transcription client against a mock `/audio/transcriptions` endpoint.

use chrono::Utc;
use herald_voice::{ApiRecognizer, AudioTurn, Microphone, RecognitionError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn phrase() -> AudioTurn {
    AudioTurn {
        samples: vec![0.25f32; 4800],
        timestamp: Utc::now(),
        duration: Duration::from_millis(300),
        sample_rate: 16000,
    }
}

async fn recognizer_replying(response: ResponseTemplate) -> (MockServer, ApiRecognizer) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer stt-key"))
        .respond_with(response)
        .mount(&server)
        .await;
    let recognizer = ApiRecognizer::new(
        Microphone::default(),
        format!("{}/v1/", server.uri()),
        "stt-key",
        "whisper-1",
    )
    .unwrap();
    (server, recognizer)
}

#[tokio::test]
async fn transcript_is_trimmed() {
    let (_server, recognizer) =
        recognizer_replying(ResponseTemplate::new(200).set_body_json(json!({ "text": "  What time is it? " })))
            .await;
    let text = recognizer.transcribe(&phrase(), "en").await.unwrap();
    assert_eq!(text, "What time is it?");
}

#[tokio::test]
async fn empty_transcript_is_unintelligible() {
    let (_server, recognizer) =
        recognizer_replying(ResponseTemplate::new(200).set_body_json(json!({ "text": "" }))).await;
    assert_eq!(
        recognizer.transcribe(&phrase(), "en").await,
        Err(RecognitionError::Unintelligible)
    );
}

#[tokio::test]
async fn server_error_is_network_failure() {
    let (_server, recognizer) =
        recognizer_replying(ResponseTemplate::new(500).set_body_string("overloaded")).await;
    let err = recognizer.transcribe(&phrase(), "en").await.unwrap_err();
    assert!(matches!(err, RecognitionError::NetworkFailure(msg) if msg.contains("overloaded")));
}
