//! The conversation data model.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Opaque image payload carried alongside a user turn. The core never
/// inspects the bytes; they are forwarded to the backend as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// One message in the conversation log.
///
/// A turn is immutable once `is_live` becomes false; while live, `content`
/// is replaced wholesale by each streaming update.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub attachment: Option<Attachment>,
    pub is_live: bool,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachment,
            is_live: false,
            timestamp: Utc::now(),
        }
    }

    /// Empty assistant placeholder that an in-progress stream will fill.
    pub fn live_assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            attachment: None,
            is_live: true,
            timestamp: Utc::now(),
        }
    }
}
