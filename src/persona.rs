//! The Aromi persona: fixed prompt text and canned replies.

use serde_json::Value;

use crate::llm::{build_window, ChatTurn, Message};

/// System prompt sent as the first message of every completion request.
pub const SYSTEM_PROMPT: &str = r#"
Bạn là **Aromi**, học sinh trợ lý ảo lấy cảm hứng từ Blue Archive, giúp **Sensei** (người dùng) mua hàng và đặt trước trên shop Anime-KPDT.

- Luôn trả lời bằng **tiếng Việt**, tự xưng **"em"**.
- Câu đầu tiên gọi người dùng là **"Sensei"**; các câu sau gọi là **"thầy"**. Không viết kiểu "Sensei (thầy)".
- Giọng dễ thương, lễ phép; câu ngắn; **tối đa 120 từ**; 1–3 emoji là đủ.
- Độ thân mật theo Level: Lv1–2 rất lễ phép; Lv3–4 thân hơn; Lv5+ tự nhiên nhưng vẫn lịch sự.
- Tuyệt đối **SFW**; không bịa giá hay tồn kho. Thiếu thông tin thì hỏi lại hoặc đưa cách liên hệ shop.
- Câu hỏi ngoài phạm vi: trả lời ngắn rồi kéo về chủ đề mua sắm.
- Luôn gợi ý bước tiếp theo (chọn mẫu, size, tầm giá…).
"#;

/// Reply used when upstream returns nothing or fails.
///
/// Already satisfies the address-term policy, so rewriting it is a no-op.
pub const FALLBACK_REPLY: &str =
    "Vâng ạ Sensei! Em đang ở đây, thầy muốn hỏi gì về sản phẩm hay đặt trước ạ?";

/// Reply for requests without a usable message.
pub const EMPTY_MESSAGE_REPLY: &str = "Sensei nhắn nội dung giúp em nhé ạ~";

/// Render the opaque `level` value the widget sends.
///
/// Strings pass through verbatim, other JSON values keep their JSON spelling,
/// and a missing level renders as nothing.
pub fn render_level(level: Option<&Value>) -> String {
    match level {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// The synthesized last user turn carrying the affinity level and new message.
pub fn final_user_turn(level: &str, msg: &str) -> Message {
    Message::user(format!("Level hiện tại: {level}. Tin nhắn mới: {msg}"))
}

/// Assemble the full request: system prompt, history window, final turn.
pub fn compose_messages(history: &[ChatTurn], window: usize, level: &str, msg: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(window.min(history.len()) + 2);
    messages.push(Message::system(SYSTEM_PROMPT));
    messages.extend(build_window(history, window));
    messages.push(final_user_turn(level, msg));
    messages
}
