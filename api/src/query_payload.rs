use serde::Deserialize;

#[derive(Deserialize)]
pub struct RagDataQuery {
    pub file_name: String,
}

#[derive(Deserialize)]
pub struct RelevantTextPayload {
    pub text: String,
    pub query: String,
}
