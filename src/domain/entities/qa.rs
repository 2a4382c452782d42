use std::fmt;

use serde::{Deserialize, Serialize};

use super::Message;

/// A question scoped to one ingested document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatQuery {
    pub doc_id: String,
    pub question: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

impl ChatQuery {
    pub fn new(doc_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            question: question.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub page_number: PageLabel,
    pub snippet: String,
}

/// Page reference as it travels over the wire: the service emits numbers,
/// but a page label may also arrive as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageLabel {
    Number(u32),
    Text(String),
}

impl PageLabel {
    pub fn as_number(&self) -> Option<u32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub doc_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_query_history_defaults_to_empty() {
        let query: ChatQuery =
            serde_json::from_str(r#"{"doc_id":"d","question":"q"}"#).unwrap();
        assert!(query.history.is_empty());
    }

    #[test]
    fn test_page_label_accepts_number_or_string() {
        let answer: Answer = serde_json::from_str(
            r#"{"answer":"a","sources":[{"page_number":2,"snippet":"x"},{"page_number":"iv","snippet":"y"}]}"#,
        )
        .unwrap();

        assert_eq!(answer.sources[0].page_number, PageLabel::Number(2));
        assert_eq!(answer.sources[1].page_number.to_string(), "iv");
        assert_eq!(answer.sources[1].page_number.as_number(), None);
    }

    #[test]
    fn test_page_label_serializes_as_plain_number() {
        let source = SourceRef {
            page_number: PageLabel::Number(3),
            snippet: "total".into(),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["page_number"], 3);
    }
}
