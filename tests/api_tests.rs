use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::util::ServiceExt;

use turnwise::core::agent::{AgentError, AgentReply, ResponseEngine};
use turnwise::{ServerConfig, default_stt_factory, routes, state::AppState};

struct SilentEngine;

#[async_trait::async_trait]
impl ResponseEngine for SilentEngine {
    async fn submit_utterance(&self, _: &str, _: &str) -> Result<AgentReply, AgentError> {
        Ok(AgentReply::default())
    }

    fn provider_name(&self) -> &'static str {
        "silent"
    }
}

#[tokio::test]
async fn test_health_check() {
    let app_state = AppState::with_providers(
        ServerConfig::default(),
        default_stt_factory(),
        Arc::new(SilentEngine),
    );
    let app = routes::create_app(app_state);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, json!({"status": "OK"}));
}

#[tokio::test]
async fn test_unknown_route() {
    let app_state = AppState::with_providers(
        ServerConfig::default(),
        default_stt_factory(),
        Arc::new(SilentEngine),
    );
    let app = routes::create_app(app_state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/voices")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
