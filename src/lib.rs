// Public API exports
pub mod chunker;
pub mod embedder;
pub mod records;
pub mod store;
pub mod tokenizer;
pub mod transcript;

// Re-export main types for convenience
pub use chunker::{
    chunk_transcript, Chunk, ChunkError, TokenBudget, CHUNK_TOKEN_LIMIT, OVERLAP_TOKEN_LIMIT,
};

pub use embedder::{Batcher, EmbedError, EmbeddedRecord, EmbeddingClient, EmbeddingModelInfo};

pub use records::ChunkRecord;

pub use store::TranscriptIndex;

pub use tokenizer::{BpeTokenizer, Token, Tokenizer, WhitespaceTokenizer};

pub use transcript::{Fragment, VideoRecord};
