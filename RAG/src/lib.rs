pub mod config;
pub mod document_processor;
pub mod embedding_service;
pub mod gemini_service;
pub mod models;
pub mod relevant_chunks;
pub mod text_splitter;

pub use config::RetrievalSettings;
pub use document_processor::DocumentProcessor;
pub use embedding_service::{BackendKind, EmbeddingService, EncodedIndex};
pub use gemini_service::GeminiService;
pub use models::*;
pub use relevant_chunks::{join_chunks, RelevantChunkRetriever};
pub use text_splitter::TextSplitter;
