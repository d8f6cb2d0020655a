//! Hugging Face `tokenizers` backed encoder.
//!
//! Enabled with the `hf` feature. Loads a `tokenizer.json` exported with a
//! model so token counts match what the runtime will actually see.

use std::path::Path;

use promptpack_core::{Encoder, EncodingError};
use tokenizers::Tokenizer;
use tracing::info;

pub struct HfTokenizerEncoder {
    tokenizer: Tokenizer,
}

impl HfTokenizerEncoder {
    /// Load a tokenizer from a `tokenizer.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EncodingError> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            EncodingError::new(format!(
                "Failed to load tokenizer from {}: {e}",
                path.display()
            ))
        })?;
        info!(path = %path.display(), vocab = tokenizer.get_vocab_size(true), "Tokenizer loaded");
        Ok(Self { tokenizer })
    }
}

impl From<Tokenizer> for HfTokenizerEncoder {
    fn from(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }
}

impl Encoder for HfTokenizerEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>, EncodingError> {
        // The template already spells out any special tokens.
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| EncodingError::new(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}

impl std::fmt::Debug for HfTokenizerEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizerEncoder")
            .field("vocab_size", &self.tokenizer.get_vocab_size(true))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokenizer_file_is_an_encoding_error() {
        let err = HfTokenizerEncoder::from_file("/nonexistent/tokenizer.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tokenizer.json"));
    }
}
