mod bpe;
mod whitespace;


pub use bpe::BpeTokenizer;
pub use whitespace::WhitespaceTokenizer;

use anyhow::Result;

/// A single token id. Opaque to the chunker; only the tokenizer that
/// produced it can turn it back into text.
pub type Token = u32;

/// Text <-> token conversion, deterministic for a fixed model identifier.
///
/// Implementations must be round-trip stable: re-encoding a decoded token
/// sequence yields the same number of tokens, even if exact whitespace is
/// not reproduced byte-for-byte.
pub trait Tokenizer: Send + Sync {
    /// Model or vocabulary identifier this tokenizer was built for.
    fn name(&self) -> &str;

    fn encode(&self, text: &str) -> Result<Vec<Token>>;

    fn decode(&self, tokens: &[Token]) -> Result<String>;
}
