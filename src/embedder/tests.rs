use super::*;
use serde_json::json;

#[test]
fn batching_splits_with_remainder() {
    let batcher = Batcher::new(3);
    let items: Vec<String> = (0..5).map(|i| format!("chunk{i}")).collect();

    let batches = batcher.split(&items);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 3);
    assert_eq!(batches[1].len(), 2);
}

#[test]
fn batching_exact_size() {
    let batcher = Batcher::new(5);
    let items = vec!["a".to_string(); 10];

    let batches = batcher.split(&items);
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|b| b.len() == 5));
}

#[test]
fn batching_empty() {
    let batcher = Batcher::new(100);
    let items: Vec<String> = vec![];

    assert!(batcher.split(&items).is_empty());
}

#[test]
fn batching_zero_size_is_clamped() {
    let batcher = Batcher::new(0);
    let items = vec![1, 2, 3];

    assert_eq!(batcher.split(&items).len(), 3);
}

#[test]
fn model_info_default_is_ada() {
    let model = EmbeddingModelInfo::default();
    assert_eq!(model.name, "text-embedding-ada-002");
    assert_eq!(model.dim, 1536);
}

#[test]
fn request_serializes_to_api_shape() {
    let req = EmbeddingRequest {
        model: "text-embedding-ada-002".to_string(),
        input: vec!["hello".to_string()],
    };

    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(
        value,
        json!({ "model": "text-embedding-ada-002", "input": ["hello"] })
    );
}

#[test]
fn response_parses_api_shape() {
    let res: EmbeddingResponse = serde_json::from_value(json!({
        "object": "list",
        "data": [
            { "object": "embedding", "index": 0, "embedding": [0.1, 0.2] }
        ],
        "model": "text-embedding-ada-002"
    }))
    .unwrap();

    assert_eq!(res.data.len(), 1);
    assert_eq!(res.data[0].embedding, vec![0.1, 0.2]);
}

#[test]
fn embedded_record_keeps_contract_field_names() {
    let record = EmbeddedRecord {
        id: "vid42-1".to_string(),
        text: "a b c".to_string(),
        embedding: vec![0.5; 4],
        metadata: serde_json::Map::new(),
    };

    let value = serde_json::to_value(&record).unwrap();
    let obj = value.as_object().unwrap();
    for key in ["id", "text", "embedding", "metadata"] {
        assert!(obj.contains_key(key), "missing {key}");
    }
}

#[tokio::test]
async fn client_empty_input_skips_the_network() {
    let client = EmbeddingClient::new("http://localhost:18115/v1", "text-embedding-ada-002");
    let result = client.embed(vec![]).await;
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

// Integration test - requires a live embeddings endpoint
#[tokio::test]
#[ignore]
async fn client_round_trip() {
    let client = EmbeddingClient::new("http://localhost:18115/v1", "text-embedding-ada-002");
    let texts = vec![
        "This is a test sentence.".to_string(),
        "Another test sentence here.".to_string(),
    ];

    let embeddings = client.embed(texts).await.unwrap();
    assert_eq!(embeddings.len(), 2);
    assert!(!embeddings[0].is_empty());
}
