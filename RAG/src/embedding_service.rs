use crate::gemini_service::GeminiService;
use crate::models::*;
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Upper bound on the fitted TF-IDF vocabulary.
const MAX_VOCABULARY: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    TfIdf,
    Gemini,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tfidf" | "tf-idf" => Ok(BackendKind::TfIdf),
            "gemini" => Ok(BackendKind::Gemini),
            other => bail!("unknown embedding backend '{}', expected 'tfidf' or 'gemini'", other),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::TfIdf => write!(f, "tfidf"),
            BackendKind::Gemini => write!(f, "gemini"),
        }
    }
}

enum Backend {
    TfIdf,
    Gemini(GeminiService),
}

/// Turns chunks and queries into vectors. Holds no per-document state: every
/// call to [`EmbeddingService::encode`] produces a fresh [`EncodedIndex`].
pub struct EmbeddingService {
    backend: Backend,
}

impl EmbeddingService {
    pub fn tfidf() -> Self {
        Self {
            backend: Backend::TfIdf,
        }
    }

    pub fn gemini(gemini: GeminiService) -> Self {
        Self {
            backend: Backend::Gemini(gemini),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self.backend {
            Backend::TfIdf => BackendKind::TfIdf,
            Backend::Gemini(_) => BackendKind::Gemini,
        }
    }

    pub async fn encode(&self, chunks: Vec<String>) -> Result<EncodedIndex<'_>> {
        let mut chunks: Vec<DocumentChunk> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, content)| DocumentChunk {
                index,
                content,
                embedding: None,
            })
            .collect();

        let (chunks, model) = match &self.backend {
            Backend::TfIdf => {
                let (chunks, model) = tokio::task::spawn_blocking(move || {
                    let model = TfIdfModel::fit(&chunks);
                    chunks.par_iter_mut().for_each(|chunk| {
                        chunk.embedding = Some(model.embed(&chunk.content));
                    });
                    (chunks, model)
                })
                .await
                .context("TF-IDF encoding task failed")?;
                (chunks, Some(model))
            }
            Backend::Gemini(gemini) => {
                let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
                let embeddings = gemini.embed_documents(&texts).await?;
                if embeddings.len() != chunks.len() {
                    bail!(
                        "embedding backend returned {} vectors for {} chunks",
                        embeddings.len(),
                        chunks.len()
                    );
                }
                for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
                    chunk.embedding = Some(embedding);
                }
                (chunks, None)
            }
        };

        log::info!("Encoded {} chunks with the {} backend", chunks.len(), self.kind());

        Ok(EncodedIndex {
            service: self,
            chunks,
            model,
        })
    }

    async fn embed_query(&self, query: &str, model: Option<&TfIdfModel>) -> Result<Vec<f32>> {
        match (&self.backend, model) {
            (Backend::TfIdf, Some(model)) => Ok(model.embed(query)),
            (Backend::TfIdf, None) => bail!("TF-IDF query embedding requires a fitted vocabulary"),
            (Backend::Gemini(gemini), _) => gemini.embed_query(query).await,
        }
    }
}

/// Chunks encoded for a single retrieval.
pub struct EncodedIndex<'a> {
    service: &'a EmbeddingService,
    chunks: Vec<DocumentChunk>,
    model: Option<TfIdfModel>,
}

impl EncodedIndex<'_> {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns at most `k` chunks, most relevant first, ranked from 1.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.service.embed_query(query, self.model.as_ref()).await?;

        let mut scored: Vec<(&DocumentChunk, f32)> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                chunk
                    .embedding
                    .as_ref()
                    .map(|embedding| (chunk, calculate_similarity(&query_embedding, embedding)))
            })
            .collect();

        // stable sort, so equal scores keep source order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let retrieved: Vec<RetrievedChunk> = scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(position, (chunk, score))| RetrievedChunk {
                rank: position + 1,
                index: chunk.index,
                score,
                content: chunk.content.clone(),
            })
            .collect();

        log::info!("Found {} relevant chunks", retrieved.len());
        Ok(retrieved)
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.model = None;
    }
}

struct TfIdfModel {
    vocabulary: HashMap<String, usize>,
    idf_scores: HashMap<String, f32>,
}

impl TfIdfModel {
    fn fit(chunks: &[DocumentChunk]) -> Self {
        let mut word_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_frequencies: HashMap<String, usize> = HashMap::new();
        let total_docs = chunks.len();

        for chunk in chunks {
            let words = tokenize(&chunk.content);
            let unique_words: HashSet<_> = words.iter().collect();

            for word in &words {
                *word_counts.entry(word.clone()).or_insert(0) += 1;
            }

            for word in unique_words {
                *doc_frequencies.entry(word.clone()).or_insert(0) += 1;
            }
        }

        // Smoothed so terms present in every chunk still carry weight
        let idf_scores: HashMap<String, f32> = doc_frequencies
            .iter()
            .map(|(word, df)| {
                let idf = ((1 + total_docs) as f32 / (1 + *df) as f32).ln() + 1.0;
                (word.clone(), idf)
            })
            .collect();

        let mut word_freq_pairs: Vec<_> = word_counts.into_iter().collect();
        word_freq_pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let vocabulary: HashMap<String, usize> = word_freq_pairs
            .into_iter()
            .take(MAX_VOCABULARY)
            .enumerate()
            .map(|(idx, (word, _))| (word, idx))
            .collect();

        Self {
            vocabulary,
            idf_scores,
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.vocabulary.len().max(1)];
        let words = tokenize(text);
        let total_words = words.len() as f32;

        for (word, count) in count_words(&words) {
            if let Some(&idx) = self.vocabulary.get(&word) {
                let tf = count as f32 / total_words;
                let idf = self.idf_scores.get(&word).copied().unwrap_or(1.0);
                embedding[idx] = tf * idf;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in embedding.iter_mut() {
                *value /= norm;
            }
        }

        embedding
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| word.chars().count() > 2)
        .collect()
}

fn count_words(words: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for word in words {
        *counts.entry(word.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn calculate_similarity(embedding1: &[f32], embedding2: &[f32]) -> f32 {
    let min_len = embedding1.len().min(embedding2.len());

    let dot_product: f32 = embedding1[..min_len]
        .iter()
        .zip(embedding2[..min_len].iter())
        .map(|(a, b)| a * b)
        .sum();

    let norm1: f32 = embedding1[..min_len].iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm2: f32 = embedding2[..min_len].iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm1 == 0.0 || norm2 == 0.0 {
        0.0
    } else {
        dot_product / (norm1 * norm2)
    }
}
