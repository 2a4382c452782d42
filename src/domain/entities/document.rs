use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text of a single PDF page as returned by an extractor.
///
/// `page_number` is whatever page label the extractor could recover; it is
/// `None` when the source carries no page metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    pub text: String,
    pub page_number: Option<u32>,
}

impl ExtractedPage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_number: None,
        }
    }

    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub doc_id: String,
    pub page_number: u32,
}

/// A page stamped with the document it belongs to.
#[derive(Debug, Clone)]
pub struct Page {
    pub text: String,
    pub metadata: PageMetadata,
}

impl Page {
    /// Stamps an extracted page, falling back to the 1-based `position`
    /// when the extractor did not report a page number.
    pub fn stamp(extracted: ExtractedPage, doc_id: &str, position: usize) -> Self {
        let page_number = extracted
            .page_number
            .unwrap_or_else(|| u32::try_from(position + 1).unwrap_or(u32::MAX));

        Self {
            text: extracted.text,
            metadata: PageMetadata {
                doc_id: doc_id.to_string(),
                page_number,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub page_number: u32,
    /// Character offset of the chunk inside its page text.
    pub start_index: usize,
    pub chunk_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_uses_extractor_page_number() {
        let page = Page::stamp(ExtractedPage::new("text").with_page_number(7), "doc", 0);
        assert_eq!(page.metadata.page_number, 7);
        assert_eq!(page.metadata.doc_id, "doc");
    }

    #[test]
    fn test_stamp_falls_back_to_one_based_index() {
        let page = Page::stamp(ExtractedPage::new("text"), "doc", 2);
        assert_eq!(page.metadata.page_number, 3);
    }
}
