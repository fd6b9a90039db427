mod windower;


pub use windower::{chunk_transcript, Chunk, ChunkError, TokenBudget};

/// Default tokens per window before a chunk is cut.
pub const CHUNK_TOKEN_LIMIT: usize = 80;

/// Default trailing-token overlap carried between consecutive chunks.
pub const OVERLAP_TOKEN_LIMIT: usize = 20;
