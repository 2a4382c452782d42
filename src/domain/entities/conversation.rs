use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "New Conversation";
const QUESTION_TITLE_CHARS: usize = 30;

/// One conversation thread, bound to at most one ingested document.
///
/// The session id is the key of the history map and is not stored inside
/// the session itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub doc_id: Option<String>,
    /// Last activity, Unix seconds.
    #[serde(default)]
    pub timestamp: f64,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Session {
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            doc_id: None,
            timestamp: unix_now(),
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    pub fn add_message(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
        self.touch();
    }

    pub fn touch(&mut self) {
        self.timestamp = unix_now();
    }

    /// Renames a still-default session after the uploaded file.
    pub fn title_from_file(&mut self, file_name: &str) {
        if self.has_default_title() {
            self.title = file_name.to_string();
        }
    }

    /// Renames a still-default session after the first question asked.
    pub fn title_from_question(&mut self, question: &str) {
        if self.has_default_title() {
            self.title = truncate_chars(question, QUESTION_TITLE_CHARS);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}
