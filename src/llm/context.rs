//! Context Window Management.
//!
//! The caller sends the whole visible chat history on every request. Only a
//! fixed-size tail of it is forwarded upstream so prompts (and cost) stay
//! bounded no matter how long the widget conversation gets.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::Message;

/// Number of historical turns forwarded with each request.
pub const WINDOW_SIZE: usize = 12;

/// Role marker the widget uses for the shopper's own messages.
pub const USER_MARKER: &str = "me";

/// One message of caller-supplied history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
        }
    }

    /// Lenient conversion from an arbitrary JSON history entry.
    ///
    /// A missing role falls through to the assistant side; a missing text is
    /// empty; scalar texts keep their JSON spelling.
    pub fn from_value(value: &Value) -> Self {
        let role = value
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let text = match value.get("text") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Self { role, text }
    }

    pub fn to_message(&self) -> Message {
        if self.role == USER_MARKER {
            Message::user(self.text.clone())
        } else {
            Message::assistant(self.text.clone())
        }
    }
}

/// Parse an optional JSON `history` field; anything but an array is empty.
pub fn parse_history(value: Option<&Value>) -> Vec<ChatTurn> {
    match value {
        Some(Value::Array(items)) => items.iter().map(ChatTurn::from_value).collect(),
        _ => Vec::new(),
    }
}

/// Build the window of the last `size` turns, in original order.
pub fn build_window(history: &[ChatTurn], size: usize) -> Vec<Message> {
    let start = history.len().saturating_sub(size);
    history[start..].iter().map(ChatTurn::to_message).collect()
}
