use crate::config::RetrievalSettings;
use crate::embedding_service::EmbeddingService;
use crate::models::*;
use crate::text_splitter::TextSplitter;
use anyhow::{bail, Context, Result};
use std::sync::Arc;

/// Splits a long text into overlapping chunks and keeps only the ones most
/// relevant to a query, bounded by the downstream model's token budget.
pub struct RelevantChunkRetriever {
    max_accepted_chunks: usize,
    order: ChunkOrder,
    text_splitter: Arc<TextSplitter>,
    embedding_service: Arc<EmbeddingService>,
}

impl RelevantChunkRetriever {
    pub fn new(settings: &RetrievalSettings, embedding_service: Arc<EmbeddingService>) -> Result<Self> {
        let text_splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)?;

        let max_accepted_chunks = settings.max_token_support / settings.chunk_size;
        if max_accepted_chunks == 0 {
            bail!(
                "max token support ({}) is smaller than the chunk size ({}), no chunk could be accepted",
                settings.max_token_support,
                settings.chunk_size
            );
        }

        log::info!(
            "Chunk retriever ready: chunk_size={} overlap={} max_accepted_chunks={} order={}",
            settings.chunk_size,
            settings.chunk_overlap,
            max_accepted_chunks,
            settings.order
        );

        Ok(Self {
            max_accepted_chunks,
            order: settings.order,
            text_splitter: Arc::new(text_splitter),
            embedding_service,
        })
    }

    pub fn max_accepted_chunks(&self) -> usize {
        self.max_accepted_chunks
    }

    pub fn split_text_into_chunks(&self, text: &str) -> Vec<String> {
        self.text_splitter.split_text(text)
    }

    /// Retrieves at most `max_accepted_chunks` chunks of `long_text`, arranged
    /// by the configured [`ChunkOrder`].
    pub async fn retrieve(&self, long_text: &str, query: &str) -> Result<Vec<RetrievedChunk>> {
        // BPE counting over a long text is CPU-bound
        let text_splitter = self.text_splitter.clone();
        let text = long_text.to_string();
        let chunks = tokio::task::spawn_blocking(move || text_splitter.split_text(&text))
            .await
            .context("text splitting task failed")?;
        if chunks.is_empty() {
            log::info!("No chunks to search, returning empty result");
            return Ok(Vec::new());
        }

        let mut index = self.embedding_service.encode(chunks).await?;
        let searched = index.search(query, self.max_accepted_chunks).await;
        index.clear();
        let mut retrieved = searched?;

        match self.order {
            ChunkOrder::Rank => retrieved.sort_by_key(|chunk| chunk.rank),
            ChunkOrder::Source => retrieved.sort_by_key(|chunk| chunk.index),
        }

        Ok(retrieved)
    }

    pub async fn get_relevant_text(&self, long_text: &str, query: &str) -> Result<String> {
        let retrieved = self.retrieve(long_text, query).await?;
        Ok(join_chunks(&retrieved))
    }
}

pub fn join_chunks(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}
