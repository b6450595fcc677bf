use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mimichat::persona::{EMPTY_MESSAGE_REPLY, FALLBACK_REPLY};
use mimichat::{
    router, segment_sentences, AppState, CompletionError, CompletionResponse, Config, LLMProvider,
    Message, ModelMetadata, Role,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

type Scripted = Result<CompletionResponse, CompletionError>;

/// Upstream double: replays a script (repeating the last entry) and records calls.
struct FakeUpstream {
    script: Mutex<VecDeque<Scripted>>,
    last: fn() -> Scripted,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl FakeUpstream {
    fn new(script: Vec<Scripted>, last: fn() -> Scripted) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn replying(text: &'static str) -> Arc<Self> {
        Self::new(vec![Ok(CompletionResponse::text(text))], || {
            Ok(CompletionResponse::text("again"))
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn last_request(&self) -> Vec<Message> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for FakeUpstream {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            provider: "fake".to_string(),
            id: "fake-model".to_string(),
        }
    }

    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse, CompletionError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(self.last)
    }
}

fn test_config() -> Config {
    Config {
        api_key: Some("test-key".to_string()),
        retry_backoff_ms: 5,
        ..Config::default()
    }
}

fn app(upstream: Arc<FakeUpstream>) -> Router {
    let state = AppState::with_provider(test_config(), upstream).unwrap();
    router(state)
}

async fn post_chat(app: Router, payload: Value) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/mimichat")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))?;
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, body))
}

fn reply(body: &Value) -> &str {
    body["reply"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn greeting_gets_rewritten_reply() -> Result<()> {
    let upstream = FakeUpstream::replying("Dạ thầy ơi, em chào ạ! Sensei cần tìm figure nào?");
    let (status, body) = post_chat(
        app(upstream.clone()),
        json!({"msg": "xin chào", "level": 1, "history": []}),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply(&body), "Dạ Sensei ơi, em chào ạ! Thầy cần tìm figure nào?");
    let sentences = segment_sentences(reply(&body));
    assert!(sentences[0].contains("Sensei"));
    assert_eq!(upstream.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn greeting_still_200_when_upstream_errors() -> Result<()> {
    let upstream = FakeUpstream::new(vec![], || Err(CompletionError::Unauthorized));
    let (status, body) = post_chat(app(upstream), json!({"msg": "xin chào", "level": 1})).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(!reply(&body).is_empty());
    assert!(segment_sentences(reply(&body))[0].contains("Sensei"));
    Ok(())
}

#[tokio::test]
async fn upstream_request_has_persona_window_and_final_turn() -> Result<()> {
    let upstream = FakeUpstream::replying("Vâng ạ Sensei!");
    let history: Vec<Value> = (0..15)
        .map(|i| json!({"role": if i % 2 == 0 { "me" } else { "mimi" }, "text": format!("t{i}")}))
        .collect();
    post_chat(
        app(upstream.clone()),
        json!({"msg": "còn hàng không?", "level": "3", "history": history}),
    )
    .await?;

    let sent = upstream.last_request();
    assert_eq!(sent.len(), 14);
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent[1].content, "t3");
    assert_eq!(sent[1].role, Role::Assistant);
    assert_eq!(sent[2].role, Role::User);
    assert_eq!(sent[13].content, "Level hiện tại: 3. Tin nhắn mới: còn hàng không?");
    Ok(())
}

#[tokio::test]
async fn empty_message_rejected_without_upstream_call() -> Result<()> {
    let upstream = FakeUpstream::replying("unused");
    let (status, body) = post_chat(app(upstream.clone()), json!({"msg": "", "level": 1})).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply(&body), EMPTY_MESSAGE_REPLY);
    assert_eq!(upstream.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_body_rejected_without_upstream_call() -> Result<()> {
    let upstream = FakeUpstream::replying("unused");
    let request = Request::builder()
        .method("POST")
        .uri("/api/mimichat")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;
    let (status, body) = send(app(upstream.clone()), request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply(&body), EMPTY_MESSAGE_REPLY);
    assert_eq!(upstream.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn rate_limit_retried_once_then_second_reply_used() -> Result<()> {
    let upstream = FakeUpstream::new(
        vec![
            Err(CompletionError::from_status(429, "slow down")),
            Ok(CompletionResponse::text("Em đây Sensei! Sensei chờ em xíu nhé.")),
        ],
        || Ok(CompletionResponse::text("third call")),
    );
    let (status, body) = post_chat(app(upstream.clone()), json!({"msg": "hi", "level": 2})).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(upstream.call_count(), 2);
    assert_eq!(reply(&body), "Em đây Sensei! Thầy chờ em xíu nhé.");
    Ok(())
}

#[tokio::test]
async fn permanent_failure_absorbed_into_fallback() -> Result<()> {
    let upstream = FakeUpstream::new(vec![], || {
        Err(CompletionError::from_status(500, "internal"))
    });
    let (status, body) = post_chat(app(upstream.clone()), json!({"msg": "hi", "level": 2})).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(upstream.call_count(), 1);
    assert_eq!(reply(&body), FALLBACK_REPLY);
    Ok(())
}

#[tokio::test]
async fn empty_completion_uses_fallback() -> Result<()> {
    let upstream = FakeUpstream::replying("   ");
    let (status, body) = post_chat(app(upstream), json!({"msg": "hi"})).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply(&body), FALLBACK_REPLY);
    Ok(())
}

#[tokio::test]
async fn health_and_diag() -> Result<()> {
    let upstream = FakeUpstream::replying("unused");

    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = send(app(upstream.clone()), request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let request = Request::builder().uri("/diag").body(Body::empty())?;
    let (status, body) = send(app(upstream), request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"provider": "fake", "model": "fake-model", "hasKey": true}));
    Ok(())
}

#[tokio::test]
async fn cors_allows_only_configured_origins() -> Result<()> {
    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/api/mimichat")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
    };

    let upstream = FakeUpstream::replying("unused");
    let response = app(upstream.clone())
        .oneshot(preflight("https://animekpdtshop.com")?)
        .await?;
    assert_eq!(
        response.headers().get("access-control-allow-origin").map(|v| v.as_bytes()),
        Some("https://animekpdtshop.com".as_bytes())
    );

    let response = app(upstream).oneshot(preflight("https://evil.example")?).await?;
    assert!(response.headers().get("access-control-allow-origin").is_none());
    Ok(())
}
