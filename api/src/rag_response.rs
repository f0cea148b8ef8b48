use crate::rag_data::FieldValue;
use rag_chunks::RetrievedChunk;
use serde::Serialize;

#[derive(Serialize)]
pub struct HiResponse {
    pub message: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum RagDataResponse {
    Found { data: Vec<FieldValue> },
    NotFound { error: String },
}

#[derive(Serialize)]
pub struct RelevantTextResponse {
    pub text: String,
    pub chunks: Vec<RetrievedChunk>,
}
