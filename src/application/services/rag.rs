use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, LlmService, VectorStore},
    truncate_chars, Answer, ChatQuery, DomainError, PageLabel, SearchResult, SourceRef,
};

#[derive(Debug, Clone)]
pub struct RagSettings {
    pub top_k: usize,
    pub snippet_chars: usize,
    pub system_prompt: String,
}

/// Chunks retrieved for one question, best match first.
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub question: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub system: String,
    pub user: String,
}

pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmService>,
    settings: RagSettings,
}

impl RagService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmService>,
        settings: RagSettings,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            llm,
            settings,
        }
    }

    /// Answers `query.question` from the chunks of `query.doc_id`.
    ///
    /// `query.history` is accepted but each answer is single-turn.
    #[instrument(skip(self, query), fields(doc_id = %query.doc_id, history = query.history.len()))]
    pub async fn answer(&self, query: &ChatQuery) -> Result<Answer, DomainError> {
        let doc_id = query.doc_id.trim();
        let question = query.question.trim();
        if doc_id.is_empty() {
            return Err(DomainError::validation("doc_id must not be empty"));
        }
        if question.is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }

        let retrieved = self.retrieve(doc_id, question).await?;
        let context = build_context(&retrieved);
        let prompt = self.compose(&context, &retrieved.question);
        let answer = self.complete(&prompt).await?;

        Ok(Answer {
            answer,
            sources: self.sources(&retrieved),
        })
    }

    #[instrument(skip(self, question))]
    pub async fn retrieve(&self, doc_id: &str, question: &str) -> Result<Retrieved, DomainError> {
        let embedding = self.embedding.embed(question).await?;
        let results = self
            .vector_store
            .search(&embedding, doc_id, self.settings.top_k)
            .await?;

        tracing::debug!(hits = results.len(), "retrieved context");
        Ok(Retrieved {
            question: question.to_string(),
            results,
        })
    }

    pub fn compose(&self, context: &ContextBlock, question: &str) -> ComposedPrompt {
        ComposedPrompt {
            system: self.settings.system_prompt.clone(),
            user: format!("Context:\n{}\n\nQuestion: {question}", context.0),
        }
    }

    pub async fn complete(&self, prompt: &ComposedPrompt) -> Result<String, DomainError> {
        self.llm
            .complete_with_system(&prompt.system, &prompt.user)
            .await
    }

    fn sources(&self, retrieved: &Retrieved) -> Vec<SourceRef> {
        retrieved
            .results
            .iter()
            .map(|r| SourceRef {
                page_number: PageLabel::Number(r.chunk.metadata.page_number),
                snippet: truncate_chars(&r.chunk.content, self.settings.snippet_chars),
            })
            .collect()
    }
}

/// Chunk texts separated by a blank line, in retrieval order.
pub fn build_context(retrieved: &Retrieved) -> ContextBlock {
    let texts: Vec<&str> = retrieved
        .results
        .iter()
        .map(|r| r.chunk.content.as_str())
        .collect();
    ContextBlock(texts.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChunkMetadata, DocumentChunk, Embedding, Message, MessageRole};
    use crate::infrastructure::InMemoryVectorStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const NOT_FOUND: &str = "I could not find that in the document.";

    struct AxisEmbedding;

    #[async_trait]
    impl EmbeddingService for AxisEmbedding {
        async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
            let axis = if text.contains("total") { 0 } else { 1 };
            let mut v = vec![0.0; 2];
            v[axis] = 1.0;
            Ok(Embedding::new(v))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[derive(Default)]
    struct RecordingLlm {
        prompts: Mutex<Vec<ComposedPrompt>>,
    }

    #[async_trait]
    impl LlmService for RecordingLlm {
        async fn complete_with_system(
            &self,
            system: &str,
            prompt: &str,
        ) -> Result<String, DomainError> {
            self.prompts.lock().unwrap().push(ComposedPrompt {
                system: system.to_string(),
                user: prompt.to_string(),
            });
            if prompt.starts_with("Context:\n\n") {
                Ok(NOT_FOUND.to_string())
            } else {
                Ok("The total is 42.".to_string())
            }
        }
    }

    fn chunk(doc_id: &str, page: u32, content: &str) -> DocumentChunk {
        DocumentChunk::new(
            content,
            ChunkMetadata {
                doc_id: doc_id.into(),
                page_number: page,
                ..Default::default()
            },
        )
    }

    async fn setup(snippet_chars: usize) -> (RagService, Arc<RecordingLlm>) {
        let store = Arc::new(InMemoryVectorStore::new());
        let chunks = vec![
            chunk("invoice", 2, "The total due is 42 euros."),
            chunk("invoice", 1, "Billed to ACME Corp."),
            chunk("other", 1, "The total for another customer is 7."),
        ];
        let embeddings: Vec<Embedding> = vec![
            Embedding::new(vec![1.0, 0.0]),
            Embedding::new(vec![0.0, 1.0]),
            Embedding::new(vec![1.0, 0.0]),
        ];
        store.upsert_batch(&chunks, &embeddings).await.unwrap();

        let llm = Arc::new(RecordingLlm::default());
        let service = RagService::new(
            Arc::new(AxisEmbedding),
            store,
            llm.clone(),
            RagSettings {
                top_k: 5,
                snippet_chars,
                system_prompt: "Answer only from the context.".into(),
            },
        );
        (service, llm)
    }

    #[tokio::test]
    async fn test_answer_cites_pages_of_requested_document() {
        let (service, llm) = setup(300).await;

        let answer = service
            .answer(&ChatQuery::new("invoice", "What is the total?"))
            .await
            .unwrap();

        assert_eq!(answer.answer, "The total is 42.");
        let pages: Vec<Option<u32>> = answer.sources.iter().map(|s| s.page_number.as_number()).collect();
        assert_eq!(pages, vec![Some(2), Some(1)]);
        assert_eq!(answer.sources[0].snippet, "The total due is 42 euros.");

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].system, "Answer only from the context.");
        assert_eq!(
            prompts[0].user,
            "Context:\nThe total due is 42 euros.\n\nBilled to ACME Corp.\n\nQuestion: What is the total?"
        );
        assert!(!prompts[0].user.contains("another customer"));
    }

    #[tokio::test]
    async fn test_unknown_document_gets_empty_context() {
        let (service, llm) = setup(300).await;

        let answer = service
            .answer(&ChatQuery::new("never-ingested", "What is the total?"))
            .await
            .unwrap();

        assert_eq!(answer.answer, NOT_FOUND);
        assert!(answer.sources.is_empty());
        assert_eq!(llm.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snippets_are_truncated() {
        let (service, _) = setup(9).await;

        let answer = service
            .answer(&ChatQuery::new("invoice", "total?"))
            .await
            .unwrap();

        assert_eq!(answer.sources[0].snippet, "The total...");
        assert_eq!(answer.sources[1].snippet, "Billed to...");
    }

    #[tokio::test]
    async fn test_history_does_not_change_prompt() {
        let (service, llm) = setup(300).await;
        let history = vec![
            Message::new(MessageRole::User, "Who was billed?"),
            Message::new(MessageRole::Assistant, "ACME Corp."),
        ];

        service
            .answer(&ChatQuery::new("invoice", "What is the total?").with_history(history))
            .await
            .unwrap();
        service
            .answer(&ChatQuery::new("invoice", "What is the total?"))
            .await
            .unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts[0], prompts[1]);
    }

    #[tokio::test]
    async fn test_blank_inputs_are_rejected() {
        let (service, llm) = setup(300).await;

        let no_doc = service.answer(&ChatQuery::new(" ", "q")).await;
        let no_question = service.answer(&ChatQuery::new("invoice", "")).await;

        assert!(matches!(no_doc, Err(DomainError::Validation(_))));
        assert!(matches!(no_question, Err(DomainError::Validation(_))));
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_build_context_of_nothing_is_empty() {
        let retrieved = Retrieved {
            question: "q".into(),
            results: Vec::new(),
        };
        assert_eq!(build_context(&retrieved), ContextBlock(String::new()));
    }
}
