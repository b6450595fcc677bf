//! Route handlers and request validation.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, Instrument};
use uuid::Uuid;

use super::state::SharedState;
use crate::chat::ChatInput;
use crate::llm::parse_history;
use crate::persona::{render_level, EMPTY_MESSAGE_REPLY};

/// Response body of the chat endpoint
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

impl ChatReply {
    fn new(reply: impl Into<String>) -> Json<Self> {
        Json(Self { reply: reply.into() })
    }
}

/// Validate a raw chat payload. `None` when `msg` is missing, not a string,
/// or blank; everything else is accepted leniently.
pub fn parse_chat_payload(payload: &Value) -> Option<ChatInput> {
    let msg = payload.get("msg").and_then(Value::as_str)?;
    if msg.trim().is_empty() {
        return None;
    }

    Some(ChatInput {
        msg: msg.to_string(),
        level: render_level(payload.get("level")),
        history: parse_history(payload.get("history")),
    })
}

pub async fn index(State(state): State<SharedState>) -> String {
    format!(
        "MimiChat is running. Provider={} Model={}. Try /health or POST /api/mimichat",
        state.config.provider.name(),
        state.config.model()
    )
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Configuration echo: provider, model, and whether a key is set.
pub async fn diag(State(state): State<SharedState>) -> Json<Value> {
    let meta = state.pipeline.provider().metadata();
    Json(json!({
        "provider": meta.provider,
        "model": meta.id,
        "hasKey": state.config.has_key(),
    }))
}

/// POST /api/mimichat
///
/// 400 only for a missing message; every upstream failure is answered with
/// 200 and the fallback reply so the widget never shows an error.
pub async fn chat(State(state): State<SharedState>, body: Bytes) -> (StatusCode, Json<ChatReply>) {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let Some(input) = parse_chat_payload(&payload) else {
        return (StatusCode::BAD_REQUEST, ChatReply::new(EMPTY_MESSAGE_REPLY));
    };

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id, history = input.history.len());
    let reply = async {
        let reply = state.pipeline.answer_or_fallback(&input).await;
        info!(reply_chars = reply.chars().count(), "reply sent");
        reply
    }
    .instrument(span)
    .await;

    (StatusCode::OK, ChatReply::new(reply))
}
