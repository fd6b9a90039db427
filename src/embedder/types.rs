// the embeddings API contract
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub embedding: Vec<f32>,
}

/// A chunk record with its embedding attached; one line of the embedded
/// JSON Lines file consumed by the indexing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Map<String, Value>,
}
