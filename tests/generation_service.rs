//! Integration tests for the HTTP generation client, run against an in-process
//! stub service speaking the `/api/generate` contract.

use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use local_ai_chat::client::{GenerationBackend, GenerationClient};
use local_ai_chat::config::Config;
use local_ai_chat::errors::ChatError;

/// Stub generation service speaking the fixed `/api/generate` contract.
/// Behavior is keyed off the requested model id.
async fn generate_handler(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["stream"] != json!(false) {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "streaming unsupported"})));
    }
    let model = body["model"].as_str().unwrap_or_default();
    let prompt = body["prompt"].as_str().unwrap_or_default();
    match model {
        "ghost" => (StatusCode::NOT_FOUND, Json(json!({"error": "model 'ghost' not found"}))),
        "flaky" => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"}))),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            (StatusCode::OK, Json(json!({"response": "too late"})))
        }
        _ if prompt.contains("very brief title") => {
            (StatusCode::OK, Json(json!({"response": " \"Quantum Entanglement\" \n"})))
        }
        _ => (
            StatusCode::OK,
            Json(json!({
                "response": format!("echo: {prompt}"),
                "model": model,
                "done": true
            })),
        ),
    }
}

async fn start_stub() -> Config {
    let app = Router::new().route("/api/generate", post(generate_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Config { base_url: format!("http://{addr}"), default_model: "mistral".to_string() }
}

#[tokio::test]
async fn returns_the_completion_text_and_ignores_extra_fields() {
    let config = start_stub().await;
    let client = GenerationClient::new(&config);

    let reply = client
        .generate("mistral", "hello", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reply, "echo: hello");
}

#[tokio::test]
async fn missing_model_maps_to_model_not_found() {
    let config = start_stub().await;
    let client = GenerationClient::new(&config);

    let err = client
        .generate("ghost", "hello", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(&err, ChatError::ModelNotFound { model } if model == "ghost"));
    let text = err.to_string();
    assert!(text.contains("ghost"));
    assert!(text.contains("not found"));
}

#[tokio::test]
async fn server_errors_map_to_service_unreachable() {
    let config = start_stub().await;
    let client = GenerationClient::new(&config);

    let err = client
        .generate("flaky", "hello", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::ServiceUnreachable { .. }));
}

#[tokio::test]
async fn connection_failures_map_to_service_unreachable() {
    // nothing listens here
    let config = Config {
        base_url: "http://127.0.0.1:9".to_string(),
        default_model: "mistral".to_string(),
    };
    let client = GenerationClient::new(&config);

    let err = client
        .generate("mistral", "hello", &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ChatError::ServiceUnreachable { base_url } => assert!(base_url.contains("127.0.0.1:9")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cancellation_aborts_the_inflight_request() {
    let config = start_stub().await;
    let client = GenerationClient::new(&config);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.generate("slow", "hello", &cancel),
    )
    .await
    .expect("cancellation should resolve the call promptly");

    assert!(matches!(result, Err(ChatError::Cancelled)));
}

#[tokio::test]
async fn titles_come_back_trimmed_and_unquoted() {
    let config = start_stub().await;
    let client = GenerationClient::new(&config);

    let title = client
        .generate_title("mistral", "what is quantum entanglement?")
        .await
        .unwrap();

    assert_eq!(title, "Quantum Entanglement");
}

#[tokio::test]
async fn title_failures_map_to_the_swallowed_kind() {
    let config = start_stub().await;
    let client = GenerationClient::new(&config);

    let err = client.generate_title("ghost", "hello").await.unwrap_err();

    assert!(matches!(err, ChatError::TitleGenerationFailed { .. }));
}
