use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::tokenizer::{Token, Tokenizer};
use crate::transcript::Fragment;

use super::{CHUNK_TOKEN_LIMIT, OVERLAP_TOKEN_LIMIT};

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("invalid token budget: chunk size {chunk_tokens} must be positive and larger than overlap {overlap_tokens}")]
    InvalidBudget {
        chunk_tokens: usize,
        overlap_tokens: usize,
    },
}

/// Token budget for one chunking run.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    /// Tokens accumulated into the window before it is cut.
    pub chunk_tokens: usize,
    /// Trailing tokens carried from one chunk into the next.
    pub overlap_tokens: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            chunk_tokens: CHUNK_TOKEN_LIMIT,
            overlap_tokens: OVERLAP_TOKEN_LIMIT,
        }
    }
}

impl TokenBudget {
    fn validate(self) -> Result<(), ChunkError> {
        if self.chunk_tokens == 0 || self.overlap_tokens >= self.chunk_tokens {
            return Err(ChunkError::InvalidBudget {
                chunk_tokens: self.chunk_tokens,
                overlap_tokens: self.overlap_tokens,
            });
        }
        Ok(())
    }
}

/// A chunk ready for embedding: decoded text plus the time range it covers,
/// in seconds. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

/// Cut a transcript into overlapping, token-bounded chunks.
///
/// Single pass over the fragments: tokens accumulate into a window until it
/// holds `chunk_tokens` of them; the next `overlap_tokens` tokens fill a
/// bounded FIFO; then a chunk is emitted (window and overlap decoded
/// together) and the overlap alone seeds the next window, whose start is
/// pinned to the emitted chunk's end.
///
/// Timestamps are fragment-granular. A chunk's `end` reflects the fragment
/// that contributed the last *window* token; overlap tokens never advance
/// timestamps, so a chunk's text can outrun its nominal time range by up to
/// `overlap_tokens` tokens. The skew is one-sided: `end` never precedes the
/// fragment that filled the window.
///
/// Tokenizer failures propagate unchanged. An invalid budget is rejected
/// before any fragment is read.
pub fn chunk_transcript(
    fragments: &[Fragment],
    tokenizer: &dyn Tokenizer,
    budget: TokenBudget,
) -> Result<Vec<Chunk>> {
    budget.validate()?;

    let mut chunks = Vec::new();
    let mut window: Vec<Token> = Vec::with_capacity(budget.chunk_tokens);
    let mut overlap: VecDeque<Token> = VecDeque::with_capacity(budget.overlap_tokens);
    let mut chunk_start = 0.0;
    let mut chunk_end = 0.0;

    for fragment in fragments {
        for token in tokenizer.encode(&fragment.text)? {
            if window.len() < budget.chunk_tokens {
                window.push(token);
                if window.len() == 1 {
                    chunk_start = fragment.start;
                }
                chunk_end = fragment.start + fragment.duration;
            } else {
                if overlap.len() == budget.overlap_tokens {
                    overlap.pop_front();
                }
                overlap.push_back(token);
            }

            if window.len() >= budget.chunk_tokens && overlap.len() >= budget.overlap_tokens {
                chunks.push(emit(&window, &overlap, chunk_start, chunk_end, tokenizer)?);
                window.clear();
                window.extend(overlap.drain(..));
                chunk_start = chunk_end;
            }
        }
    }

    // Trailing partial window, plus whatever overlap accumulated.
    if !window.is_empty() {
        chunks.push(emit(&window, &overlap, chunk_start, chunk_end, tokenizer)?);
    }

    Ok(chunks)
}

fn emit(
    window: &[Token],
    overlap: &VecDeque<Token>,
    start: f64,
    end: f64,
    tokenizer: &dyn Tokenizer,
) -> Result<Chunk> {
    let mut tokens = Vec::with_capacity(window.len() + overlap.len());
    tokens.extend_from_slice(window);
    tokens.extend(overlap.iter().copied());

    let text = tokenizer.decode(&tokens)?;

    Ok(Chunk {
        text,
        start,
        end,
        duration: end - start,
    })
}
