pub mod config;
pub mod handlers;
pub mod query_payload;
pub mod rag_data;
pub mod rag_response;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use config::AppConfig;
use rag_chunks::RelevantChunkRetriever;
use rag_data::RagData;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub rag_data: Arc<RagData>,
    pub retriever: Arc<RelevantChunkRetriever>,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let rag_data = match &config.rag_data_path {
            Some(path) => RagData::from_file(path)?,
            None => RagData::builtin()?,
        };

        let embedding_service = Arc::new(config.retrieval.embedding_service()?);
        let retriever = RelevantChunkRetriever::new(&config.retrieval, embedding_service)?;

        Ok(Self {
            rag_data: Arc::new(rag_data),
            retriever: Arc::new(retriever),
        })
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/hi", get(handlers::hi))
        .route("/get-rag-data", get(handlers::get_rag_data))
        .route("/relevant-text", post(handlers::relevant_text))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
