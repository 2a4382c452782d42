//! Recursive character splitting.
//!
//! Text is cut on the largest separator that occurs in it (paragraph, then
//! line, then sentence, then word). Pieces that are still too long are split
//! again with the next separator, down to single characters. Pieces are then
//! merged greedily up to `chunk_size` characters, carrying up to
//! `chunk_overlap` characters of trailing pieces into the next chunk.

use std::collections::VecDeque;

use crate::domain::DomainError;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

const SENTENCE_SEPARATOR: &str = ". ";
const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", SENTENCE_SEPARATOR, " ", ""];

/// A chunk of text and the character offset where it starts in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    pub start_index: usize,
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<&'static str>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, DomainError> {
        if chunk_size == 0 {
            return Err(DomainError::configuration("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(DomainError::configuration(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.to_vec(),
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splits `text` and locates every chunk in it.
    pub fn split(&self, text: &str) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        let mut index = 0usize;
        let mut previous_len = 0usize;

        for chunk in self.split_text(text) {
            let offset = (index + previous_len).saturating_sub(self.chunk_overlap);
            index = find_from(text, &chunk, offset)
                .or_else(|| find_from(text, &chunk, 0))
                .unwrap_or(index);
            previous_len = char_len(&chunk);
            spans.push(TextSpan {
                text: chunk,
                start_index: index,
            });
        }

        spans
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut next_separators: &[&'static str] = &[];

        for (i, &candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate) {
                separator = candidate;
                next_separators = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge_splits(&pending, ""));
                pending.clear();
            }

            if next_separators.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, next_separators));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge_splits(&pending, ""));
        }

        chunks
    }

    fn merge_splits(&self, splits: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in splits {
            let len = char_len(piece);
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { separator_len }
            };

            if joined_len(&current, total) > self.chunk_size && !current.is_empty() {
                if let Some(doc) = join_docs(&current, separator) {
                    docs.push(doc);
                }

                while total > self.chunk_overlap
                    || (joined_len(&current, total) > self.chunk_size && total > 0)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    let removed =
                        char_len(first) + if current.is_empty() { 0 } else { separator_len };
                    total = total.saturating_sub(removed);
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(doc) = join_docs(&current, separator) {
            docs.push(doc);
        }

        docs
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }
}

/// Splits `text` on `separator`, keeping each separator at the start of the
/// piece that follows it. The sentence separator stays at the end of the
/// sentence it closes. An empty separator splits into characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    if separator == SENTENCE_SEPARATOR {
        return text.split_inclusive(separator).filter(|p| !p.is_empty()).collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > last {
            pieces.push(&text[last..idx]);
        }
        last = idx;
    }
    if last < text.len() {
        pieces.push(&text[last..]);
    }

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

fn join_docs(parts: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Character index of `needle` in `haystack`, searching from character
/// offset `from`.
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_from = haystack
        .char_indices()
        .nth(from)
        .map(|(b, _)| b)
        .unwrap_or(haystack.len());

    haystack[byte_from..]
        .find(needle)
        .map(|b| from + char_len(&haystack[byte_from..byte_from + b]))
}
