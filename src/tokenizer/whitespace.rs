use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Token, Tokenizer};

/// Whitespace tokenizer with an interned vocabulary: one token per word,
/// ids assigned in first-seen order. Decoding joins words with single
/// spaces, so round trips are token-equivalent rather than byte-exact.
///
/// Useful offline and as the deterministic tokenizer for tests; swap in
/// [`super::BpeTokenizer`] for real model vocabularies.
pub struct WhitespaceTokenizer {
    vocab: Mutex<Vocab>,
}

#[derive(Default)]
struct Vocab {
    ids: HashMap<String, Token>,
    words: Vec<String>,
}

impl WhitespaceTokenizer {
    pub fn new() -> Self {
        Self {
            vocab: Mutex::new(Vocab::default()),
        }
    }
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn encode(&self, text: &str) -> Result<Vec<Token>> {
        let mut vocab = self
            .vocab
            .lock()
            .map_err(|e| anyhow::anyhow!("vocab lock poisoned: {e}"))?;

        let tokens = text
            .split_whitespace()
            .map(|word| {
                if let Some(&id) = vocab.ids.get(word) {
                    id
                } else {
                    let id = vocab.words.len() as Token;
                    vocab.ids.insert(word.to_string(), id);
                    vocab.words.push(word.to_string());
                    id
                }
            })
            .collect();

        Ok(tokens)
    }

    fn decode(&self, tokens: &[Token]) -> Result<String> {
        let vocab = self
            .vocab
            .lock()
            .map_err(|e| anyhow::anyhow!("vocab lock poisoned: {e}"))?;

        let mut words = Vec::with_capacity(tokens.len());
        for &token in tokens {
            match vocab.words.get(token as usize) {
                Some(word) => words.push(word.as_str()),
                None => bail!("unknown token id {token}"),
            }
        }

        Ok(words.join(" "))
    }
}
