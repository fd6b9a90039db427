use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::embedder::EmbeddedRecord;

/// Local SQLite index of embedded chunks, the retrieval-side artifact of the
/// pipeline. One row per chunk plus the embedding vector as a little-endian
/// f32 BLOB.
pub struct TranscriptIndex {
    conn: Connection,
}

impl TranscriptIndex {
    /// Open (or create) an index at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .context(format!("Failed to open index database at {path}"))?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    /// Create an in-memory index.
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                video_id TEXT NOT NULL,
                text TEXT NOT NULL,
                text_hash TEXT NOT NULL,
                start_s REAL NOT NULL,
                end_s REAL NOT NULL,
                duration_s REAL NOT NULL,
                metadata TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS embeddings (
                chunk_id TEXT PRIMARY KEY,
                vector BLOB NOT NULL,
                model TEXT NOT NULL,
                FOREIGN KEY (chunk_id) REFERENCES chunks(id)
            );

            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_video ON chunks(video_id);
            "#,
            )
            .context("Failed to initialize index schema")?;

        self.conn
            .execute(
                "INSERT OR IGNORE INTO index_meta (key, value) VALUES ('created_at', ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .context("Failed to stamp index creation time")?;

        Ok(())
    }

    /// Insert a batch of embedded records inside one transaction.
    pub fn insert_batch(&mut self, records: &[EmbeddedRecord], model: &str) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to start insert transaction")?;

        for record in records {
            let video_id = video_id_of(record);
            let metadata = serde_json::to_string(&record.metadata)
                .context(format!("Failed to serialize metadata for {}", record.id))?;

            tx.execute(
                "INSERT OR REPLACE INTO chunks (id, video_id, text, text_hash, start_s, end_s, duration_s, metadata) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    video_id,
                    record.text,
                    text_hash(&record.text),
                    time_field(record, "start"),
                    time_field(record, "end"),
                    time_field(record, "duration"),
                    metadata
                ],
            )
            .context(format!("Failed to insert chunk: {}", record.id))?;

            tx.execute(
                "INSERT OR REPLACE INTO embeddings (chunk_id, vector, model) VALUES (?1, ?2, ?3)",
                params![record.id, f32_to_bytes(&record.embedding), model],
            )
            .context(format!("Failed to insert embedding for chunk: {}", record.id))?;
        }

        tx.commit().context("Failed to commit insert transaction")
    }

    /// Whether a chunk id is already indexed.
    pub fn contains(&self, chunk_id: &str) -> Result<bool> {
        let count: u32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM chunks WHERE id = ?1",
                params![chunk_id],
                |row| row.get(0),
            )
            .context("Failed to look up chunk")?;
        Ok(count > 0)
    }

    /// Get the stored embedding for a chunk.
    pub fn get_embedding(&self, chunk_id: &str) -> Result<Option<Vec<f32>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT vector FROM embeddings WHERE chunk_id = ?1")
            .context("Failed to prepare statement")?;

        let mut rows = stmt
            .query(params![chunk_id])
            .context("Failed to query embedding")?;

        if let Some(row) = rows.next().context("Failed to get next row")? {
            let bytes: Vec<u8> = row.get(0)?;
            Ok(Some(bytes_to_f32(&bytes)))
        } else {
            Ok(None)
        }
    }

    /// Get statistics
    pub fn get_stats(&self) -> Result<IndexStats> {
        let video_count: u32 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT video_id) FROM chunks", [], |row| {
                row.get(0)
            })
            .context("Failed to count videos")?;

        let chunk_count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
            .context("Failed to count chunks")?;

        let embedding_count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))
            .context("Failed to count embeddings")?;

        Ok(IndexStats {
            video_count,
            chunk_count,
            embedding_count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub video_count: u32,
    pub chunk_count: u32,
    pub embedding_count: u32,
}

/// `{video_id}-{n}` with a metadata fallback for records from older runs.
fn video_id_of(record: &EmbeddedRecord) -> String {
    if let Some(id) = record.metadata.get("video_id").and_then(Value::as_str) {
        return id.to_string();
    }
    match record.id.rsplit_once('-') {
        Some((video_id, _)) => video_id.to_string(),
        None => record.id.clone(),
    }
}

fn time_field(record: &EmbeddedRecord, key: &str) -> f64 {
    record
        .metadata
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn f32_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub fn bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
