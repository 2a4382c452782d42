use std::time::Duration;

use futures::{stream, Stream, StreamExt};

use crate::application::SessionState;
use crate::domain::{MessageRole, Session, SourceRef};

const LIST_TITLE_MAX: usize = 22;
const LIST_TITLE_KEEP: usize = 20;
const ID_PREFIX_LEN: usize = 8;

/// Titles longer than 22 characters are cut to 20 plus `...`.
pub fn list_title(title: &str) -> String {
    if title.chars().count() > LIST_TITLE_MAX {
        let kept: String = title.chars().take(LIST_TITLE_KEEP).collect();
        format!("{kept}...")
    } else {
        title.to_string()
    }
}

/// One line per session, most recent first, active one marked with `*`.
pub fn session_list(state: &SessionState) -> Vec<String> {
    state
        .by_recency()
        .into_iter()
        .enumerate()
        .map(|(i, (id, session))| {
            let marker = if id == state.active_id() { '*' } else { ' ' };
            let short_id: String = id.chars().take(ID_PREFIX_LEN).collect();
            let doc = if session.doc_id.is_some() { " [pdf]" } else { "" };
            format!("{marker} {}. {} ({short_id}){doc}", i + 1, list_title(&session.title))
        })
        .collect()
}

pub fn transcript(session: &Session) -> Vec<String> {
    let mut lines = vec![format!("== {} ==", session.title)];
    match &session.doc_id {
        Some(doc_id) => lines.push(format!("document: {doc_id}")),
        None => lines.push("document: none (use /upload <path>)".to_string()),
    }
    for message in &session.messages {
        let who = match message.role {
            MessageRole::User => "You",
            MessageRole::Assistant => "Assistant",
        };
        lines.push(format!("{who}: {}", message.content));
    }
    lines
}

pub fn sources(sources: &[SourceRef]) -> Vec<String> {
    if sources.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Sources:".to_string()];
    for source in sources {
        lines.push(format!("  Page {}: {}", source.page_number, source.snippet));
    }
    lines
}

/// Yields `text` word by word (each word keeps its trailing whitespace),
/// sleeping `delay` before each one.
pub fn word_stream(text: &str, delay: Duration) -> impl Stream<Item = String> + '_ {
    stream::iter(text.split_inclusive(char::is_whitespace)).then(move |word| async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        word.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PageLabel;

    #[test]
    fn test_list_title_truncation() {
        assert_eq!(list_title("report.pdf"), "report.pdf");
        assert_eq!(list_title("exactly twenty-two chr"), "exactly twenty-two chr");
        assert_eq!(
            list_title("Quarterly financial summary.pdf"),
            "Quarterly financial ..."
        );
    }

    #[test]
    fn test_sources_lines() {
        let lines = sources(&[
            SourceRef {
                page_number: PageLabel::Number(2),
                snippet: "Total due: 42".into(),
            },
            SourceRef {
                page_number: PageLabel::Text("iv".into()),
                snippet: "Preface".into(),
            },
        ]);
        assert_eq!(lines, vec!["Sources:", "  Page 2: Total due: 42", "  Page iv: Preface"]);
        assert!(sources(&[]).is_empty());
    }

    #[test]
    fn test_transcript_without_document() {
        let mut session = Session::new();
        session.add_message(MessageRole::User, "hi");
        let lines = transcript(&session);
        assert_eq!(lines[0], "== New Conversation ==");
        assert!(lines[1].contains("none"));
        assert_eq!(lines[2], "You: hi");
    }

    #[tokio::test]
    async fn test_word_stream_reassembles_text() {
        let text = "The total is\n42 euros.";
        let words: Vec<String> = word_stream(text, Duration::ZERO).collect().await;
        assert_eq!(words, vec!["The ", "total ", "is\n", "42 ", "euros."]);
        assert_eq!(words.concat(), text);
    }
}
