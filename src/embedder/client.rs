// client.rs - the HTTP embedder
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use super::types::{EmbeddingRequest, EmbeddingResponse};

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Server returned error status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Server returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// Client for an OpenAI-style `/embeddings` endpoint.
///
/// Transient failures (connection errors, 429, 5xx) are retried with
/// exponential backoff: 1s doubling up to a 10s cap. Client errors other
/// than 429 fail immediately.
pub struct EmbeddingClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_attempts: u32,
}

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(10);

impl EmbeddingClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: None,
            max_attempts: 5,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a batch of texts, one vector per input, in order.
    pub async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let expected = texts.len();
        let mut backoff = BACKOFF_BASE;
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.request(&texts).await {
                Ok(embeddings) => {
                    if embeddings.len() != expected {
                        return Err(EmbedError::CountMismatch {
                            expected,
                            got: embeddings.len(),
                        });
                    }
                    return Ok(embeddings);
                }
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    warn!("Embedding attempt {attempt}/{} failed: {e}", self.max_attempts);
                    last_error = e.to_string();
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(BACKOFF_CAP);
            }
        }

        Err(EmbedError::RetriesExhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }

    /// Blocking wrapper so the synchronous CLI can drive the async client.
    pub fn embed_blocking(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        let runtime = tokio::runtime::Runtime::new().expect("Failed to build tokio runtime");
        runtime.block_on(self.embed(texts))
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let req = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let mut builder = self.http.post(format!("{}/embeddings", self.endpoint));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.json(&req).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(EmbedError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        let res: EmbeddingResponse = response.json().await?;
        Ok(res.data.into_iter().map(|d| d.embedding).collect())
    }
}

fn is_retryable(error: &EmbedError) -> bool {
    match error {
        EmbedError::RequestFailed(_) => true,
        EmbedError::ServerError { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
        }
        _ => false,
    }
}
