use crate::embedding_service::{BackendKind, EmbeddingService};
use crate::gemini_service::{GeminiService, DEFAULT_EMBEDDING_MODEL};
use crate::models::ChunkOrder;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 64;
pub const DEFAULT_MAX_TOKEN_SUPPORT: usize = 4096;

/// Chunking and retrieval parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Token budget of the downstream model; bounds how many chunks are kept.
    pub max_token_support: usize,
    pub order: ChunkOrder,
    pub backend: BackendKind,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_token_support: DEFAULT_MAX_TOKEN_SUPPORT,
            order: ChunkOrder::default(),
            backend: BackendKind::default(),
            gemini_api_key: None,
            gemini_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl RetrievalSettings {
    /// Reads settings from the process environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(&lookup, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            max_token_support: parse_or(&lookup, "MAX_TOKEN_SUPPORT", defaults.max_token_support)?,
            order: parse_or(&lookup, "CHUNK_ORDER", defaults.order)?,
            backend: parse_or(&lookup, "EMBEDDING_BACKEND", defaults.backend)?,
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty()),
            gemini_model: lookup("GEMINI_EMBEDDING_MODEL").unwrap_or(defaults.gemini_model),
        })
    }

    pub fn embedding_service(&self) -> Result<EmbeddingService> {
        match self.backend {
            BackendKind::TfIdf => Ok(EmbeddingService::tfidf()),
            BackendKind::Gemini => {
                let api_key = self.gemini_api_key.clone().ok_or_else(|| {
                    anyhow::anyhow!("GEMINI_API_KEY environment variable not set")
                })?;
                Ok(EmbeddingService::gemini(GeminiService::new(
                    api_key,
                    self.gemini_model.clone(),
                )?))
            }
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid value '{}' for {}", raw, key)),
        None => Ok(default),
    }
}
