use anyhow::Result;
use tiktoken_rs::{cl100k_base, o200k_base, p50k_base, r50k_base, CoreBPE};

use super::{Token, Tokenizer};

/// Tokenizer backed by the BPE vocabularies OpenAI models use.
pub struct BpeTokenizer {
    model: String,
    encoder: CoreBPE,
}

impl BpeTokenizer {
    /// Build a tokenizer for the named model, matching it to the right
    /// vocabulary the way the upstream `tiktoken` library does.
    pub fn for_model(model: &str) -> Result<Self> {
        let encoder = match model {
            name if name.starts_with("gpt-4") || name.starts_with("gpt-3.5") => cl100k_base()?,
            name if name.starts_with("text-embedding") => cl100k_base()?,
            name if name.starts_with("o1") => o200k_base()?,
            name if name.starts_with("text-davinci") || name.starts_with("code-") => p50k_base()?,
            name if name.starts_with("davinci") || name.starts_with("curie") => r50k_base()?,
            _ => cl100k_base()?,
        };

        Ok(Self {
            model: model.to_string(),
            encoder,
        })
    }

    pub fn gpt35_turbo() -> Result<Self> {
        Self::for_model("gpt-3.5-turbo")
    }
}

impl Tokenizer for BpeTokenizer {
    fn name(&self) -> &str {
        &self.model
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        Ok(self.encoder.encode_ordinary(text))
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        self.encoder.decode(tokens.to_vec())
    }
}
