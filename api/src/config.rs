use anyhow::{Context, Result};
use rag_chunks::RetrievalSettings;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Replacement for the built-in rag data table.
    pub rag_data_path: Option<PathBuf>,
    pub retrieval: RetrievalSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .parse()
            .with_context(|| format!("invalid value '{}' for BIND_ADDR", raw_addr))?;

        Ok(Self {
            bind_addr,
            rag_data_path: env::var_os("RAG_DATA_PATH").map(PathBuf::from),
            retrieval: RetrievalSettings::from_env()?,
        })
    }
}
