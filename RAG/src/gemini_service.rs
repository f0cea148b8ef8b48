use crate::models::*;
use anyhow::{bail, Result};
use reqwest::Client;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini caps `batchEmbedContents` at 100 requests per call.
const MAX_BATCH_SIZE: usize = 100;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Dense embeddings from the Gemini embedding API.
pub struct GeminiService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("GEMINI_API_KEY must not be empty");
        }

        Ok(Self {
            client: Client::new(),
            base_url: API_BASE.to_string(),
            api_key,
            model: model.into(),
        })
    }

    /// Points the service at another API root, e.g. a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.model)
    }

    fn embed_request(&self, text: &str, task_type: &str) -> GeminiEmbedRequest {
        GeminiEmbedRequest {
            model: self.model_path(),
            content: GeminiContent {
                parts: vec![GeminiPart {
                    text: text.to_string(),
                }],
            },
            task_type: task_type.to_string(),
        }
    }

    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            let request = GeminiBatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| self.embed_request(text, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            };

            let url = format!(
                "{}/{}:batchEmbedContents?key={}",
                self.base_url,
                self.model_path(),
                self.api_key
            );

            let response = self.client.post(&url).json(&request).send().await?;

            if !response.status().is_success() {
                let error_text = response.text().await?;
                return Err(anyhow::anyhow!("Gemini API error: {}", error_text));
            }

            let batch_response: GeminiBatchEmbedResponse = response.json().await?;
            log::debug!("Embedded batch of {} chunks", batch_response.embeddings.len());
            embeddings.extend(batch_response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(embeddings)
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let request = self.embed_request(query, "RETRIEVAL_QUERY");

        let url = format!(
            "{}/{}:embedContent?key={}",
            self.base_url,
            self.model_path(),
            self.api_key
        );

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow::anyhow!("Gemini API error: {}", error_text));
        }

        let embed_response: GeminiEmbedResponse = response.json().await?;
        Ok(embed_response.embedding.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding_service::EmbeddingService;
    use axum::{http::StatusCode, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1beta", addr)
    }

    /// Answers every batch with `returned(n)` vectors for `n` requests and
    /// records the batch sizes it saw.
    async fn embedding_server(
        batches: Arc<Mutex<Vec<usize>>>,
        returned: fn(usize) -> usize,
    ) -> String {
        let app = Router::new().fallback(move |Json(body): Json<Value>| {
            let batches = batches.clone();
            async move {
                let requested = body["requests"].as_array().map(Vec::len).unwrap_or(0);
                batches.lock().unwrap().push(requested);
                let embeddings: Vec<Value> = (0..returned(requested))
                    .map(|i| json!({ "values": [i as f32, 1.0] }))
                    .collect();
                Json(json!({ "embeddings": embeddings }))
            }
        });
        serve(app).await
    }

    fn service(base_url: &str) -> GeminiService {
        GeminiService::new("test-key", DEFAULT_EMBEDDING_MODEL)
            .unwrap()
            .with_base_url(base_url)
    }

    fn texts(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("chunk number {}", i)).collect()
    }

    #[test]
    fn rejects_blank_api_key() {
        assert!(GeminiService::new("  ", DEFAULT_EMBEDDING_MODEL).is_err());
    }

    #[test]
    fn request_uses_camel_case_task_type() {
        let service = GeminiService::new("test-key", DEFAULT_EMBEDDING_MODEL).unwrap();
        let request = service.embed_request("hello", "RETRIEVAL_QUERY");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "models/text-embedding-004");
        assert_eq!(json["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(json["content"]["parts"][0]["text"], "hello");
    }

    #[tokio::test]
    async fn error_status_carries_the_response_body() {
        let base_url = serve(
            Router::new().fallback(|| async { (StatusCode::BAD_REQUEST, "bad key") }),
        )
        .await;

        let err = service(&base_url).embed_documents(&texts(3)).await.unwrap_err();
        assert!(err.to_string().contains("bad key"), "unexpected error: {err}");

        let err = service(&base_url).embed_query("hello").await.unwrap_err();
        assert!(err.to_string().contains("bad key"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn documents_are_sent_in_batches_of_one_hundred() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let base_url = embedding_server(batches.clone(), |requested| requested).await;

        let embeddings = service(&base_url).embed_documents(&texts(150)).await.unwrap();

        assert_eq!(embeddings.len(), 150);
        assert_eq!(*batches.lock().unwrap(), vec![100, 50]);
    }

    #[tokio::test]
    async fn short_embedding_response_is_rejected() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let base_url = embedding_server(batches, |requested| requested.saturating_sub(1)).await;
        let embedding = EmbeddingService::gemini(service(&base_url));

        let err = embedding.encode(texts(4)).await.err().unwrap();
        assert!(
            err.to_string().contains("returned 3 vectors for 4 chunks"),
            "unexpected error: {err}"
        );
    }
}
