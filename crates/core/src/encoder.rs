//! Encoder trait: the abstraction over tokenizers.
//!
//! The packer only needs to know how many tokens a rendered string costs.
//! Any tokenizer (a local vocabulary, a remote service, a heuristic) can be
//! plugged in by implementing [`Encoder`], and plain closures work too.

use crate::error::EncodingError;

/// Turns text into tokens.
///
/// Implementations must be deterministic for a given text, and may block.
pub trait Encoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>, EncodingError>;
}

impl<F> Encoder for F
where
    F: Fn(&str) -> Result<Vec<u32>, EncodingError> + Send + Sync,
{
    fn encode(&self, text: &str) -> Result<Vec<u32>, EncodingError> {
        self(text)
    }
}

/// Character-based estimate: one token per `chars_per_token` bytes, rounded up.
///
/// Accurate within ~10% for BPE tokenizers on English text. Token ids are
/// chunk ordinals and carry no meaning beyond their count.
#[derive(Debug, Clone)]
pub struct HeuristicEncoder {
    chars_per_token: usize,
}

impl HeuristicEncoder {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn count(&self, text: &str) -> usize {
        text.len().div_ceil(self.chars_per_token)
    }
}

impl Default for HeuristicEncoder {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Encoder for HeuristicEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>, EncodingError> {
        Ok((0..self.count(text) as u32).collect())
    }
}
