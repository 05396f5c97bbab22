//! API endpoint integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use parley::api::ApiServer;
use parley::voice::{AudioFormat, AudioFrame};
use parley::{GenerationError, Pipeline, TranscriptionError};
use tower::ServiceExt;

mod common;
use common::{
    FakeGenerator, FakeSynthesizer, FakeTranscriber, GatedGenerator, happy_pipeline,
    spoken_phrase,
};

fn build_server(pipeline: Pipeline) -> ApiServer {
    ApiServer::builder(Arc::new(pipeline)).build()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn chat_request(text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "text": text }).to_string()))
        .unwrap()
}

fn listen_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/voice/listen")
        .header(header::CONTENT_TYPE, "audio/wav")
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = build_server(happy_pipeline("unused", "unused"));

    let response = server.router().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_chat_returns_turn_with_audio() {
    let server = build_server(happy_pipeline("unused", "Hi there!"));

    let response = server.router().oneshot(chat_request("Hello")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user"], "Hello");
    assert_eq!(json["assistant"], "Hi there!");
    assert_eq!(json["audio"], "//uQAA==");
    assert!(json["synthesis_error"].is_null());
}

#[tokio::test]
async fn test_chat_rejects_empty_text() {
    let server = build_server(happy_pipeline("unused", "unused"));

    let response = server.router().oneshot(chat_request("   ")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_chat_generation_failure_is_bad_gateway() {
    let server = build_server(Pipeline::new(
        FakeTranscriber::hears("unused"),
        FakeGenerator::fails(GenerationError::Upstream {
            status: Some(429),
            message: "rate limited".to_string(),
        }),
        FakeSynthesizer::speaks(),
    ));

    let response = server.router().oneshot(chat_request("Hello")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "generation_failed");

    // Nothing logged, error surfaced in history
    let response = server.router().oneshot(get("/api/history")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["turns"].as_array().unwrap().len(), 0);
    assert!(json["error"].as_str().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn test_chat_while_turn_in_flight_is_conflict() {
    let generator = GatedGenerator::replies("Hi there!");
    let server = build_server(Pipeline::new(
        FakeTranscriber::hears("unused"),
        generator.clone(),
        FakeSynthesizer::speaks(),
    ));

    let first = tokio::spawn(server.router().oneshot(chat_request("Hello")));
    generator.started.notified().await;

    let response = server.router().oneshot(chat_request("Again")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "busy");

    generator.release.notify_one();
    let response = first.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user"], "Hello");
}

#[tokio::test]
async fn test_chat_waits_for_reader_instead_of_conflict() {
    let server = build_server(happy_pipeline("unused", "Hi there!"));
    let session = server.session();
    let reader = session.lock().await;

    let pending = tokio::spawn(server.router().oneshot(chat_request("Hello")));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());

    drop(reader);
    let response = pending.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(session.lock().await.log().len(), 1);
}

#[tokio::test]
async fn test_history_polling_does_not_block_chat() {
    let server = build_server(happy_pipeline("unused", "reply"));

    let readers: Vec<_> = (0..8)
        .map(|_| tokio::spawn(server.router().oneshot(get("/api/history"))))
        .collect();
    let response = server.router().oneshot(chat_request("Hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for reader in readers {
        assert_eq!(reader.await.unwrap().unwrap().status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let server = build_server(happy_pipeline("unused", "reply"));

    for text in ["first", "second"] {
        let response = server.router().oneshot(chat_request(text)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = server.router().oneshot(get("/api/history")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let turns = json["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["user"], "second");
    assert_eq!(turns[1]["user"], "first");
    assert!(json["error"].is_null());
    assert!(json["session_id"].is_string());
}

#[tokio::test]
async fn test_listen_returns_turn() {
    let server = build_server(happy_pipeline("What is 2+2?", "4"));

    let wav = spoken_phrase().to_wav().unwrap();
    let response = server.router().oneshot(listen_request(wav)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user"], "What is 2+2?");
    assert_eq!(json["assistant"], "4");
}

#[tokio::test]
async fn test_listen_rejects_empty_body() {
    let server = build_server(happy_pipeline("unused", "unused"));

    let response = server
        .router()
        .oneshot(listen_request(Vec::new()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listen_rejects_garbage() {
    let server = build_server(happy_pipeline("unused", "unused"));

    let response = server
        .router()
        .oneshot(listen_request(b"not a wav file".to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listen_wrong_sample_rate_is_unprocessable() {
    let server = build_server(happy_pipeline("Hello", "unused"));

    let audio = AudioFrame::from_f32(AudioFormat::mono_16bit(8000), &[0.5; 8000]);
    let response = server
        .router()
        .oneshot(listen_request(audio.to_wav().unwrap()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_listen_unrecognized_is_unprocessable() {
    let server = build_server(Pipeline::new(
        FakeTranscriber::fails(TranscriptionError::Unrecognized),
        FakeGenerator::replies("unused"),
        FakeSynthesizer::speaks(),
    ));

    let wav = spoken_phrase().to_wav().unwrap();
    let response = server.router().oneshot(listen_request(wav)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(
        json["error"]["message"],
        "Sorry, I couldn't understand what you said."
    );
}

#[tokio::test]
async fn test_listen_service_failure_is_bad_gateway() {
    let server = build_server(Pipeline::new(
        FakeTranscriber::fails(TranscriptionError::ServiceUnavailable(
            "connection refused".to_string(),
        )),
        FakeGenerator::replies("unused"),
        FakeSynthesizer::speaks(),
    ));

    let wav = spoken_phrase().to_wav().unwrap();
    let response = server.router().oneshot(listen_request(wav)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_latest_audio() {
    let server = build_server(happy_pipeline("unused", "Hi there!"));

    let response = server
        .router()
        .oneshot(get("/api/voice/audio/latest"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = server.router().oneshot(chat_request("Hello")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .router()
        .oneshot(get("/api/voice/audio/latest"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], &common::MP3_BYTES[..]);
}
