use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Joins retrieved chunks in the final relevant text.
pub const CHUNK_SEPARATOR: &str = "\n-----------------------------------------\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Position of the chunk in the split source text.
    pub index: usize,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// 1-based relevance rank, 1 being the most relevant.
    pub rank: usize,
    pub index: usize,
    pub score: f32,
    pub content: String,
}

/// How retrieved chunks are arranged before they are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkOrder {
    #[default]
    Rank,
    Source,
}

impl FromStr for ChunkOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rank" => Ok(ChunkOrder::Rank),
            "source" => Ok(ChunkOrder::Source),
            other => Err(anyhow::anyhow!(
                "unknown chunk order '{}', expected 'rank' or 'source'",
                other
            )),
        }
    }
}

impl fmt::Display for ChunkOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkOrder::Rank => write!(f, "rank"),
            ChunkOrder::Source => write!(f, "source"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiEmbedRequest {
    pub model: String,
    pub content: GeminiContent,
    pub task_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiBatchEmbedRequest {
    pub requests: Vec<GeminiEmbedRequest>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiEmbedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiEmbedResponse {
    pub embedding: GeminiEmbedding,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiBatchEmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<GeminiEmbedding>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}
