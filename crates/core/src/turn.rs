//! The turn data model.
//!
//! A [`Turn`] holds at most one system instruction, one user prompt and one
//! assistant response. It is the unit of truncation: the packer drops whole
//! turns so a response is never separated from the prompt it answers.

/// Estimated token cost of one embedded image. Tokenizers cannot price
/// non-text content, so every image is charged this flat amount.
pub const IMAGE_TOKEN_COST: usize = 768;

/// An image attached to a user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Conversation-wide ordinal; matches the `[img-N]` placeholder.
    pub id: usize,
    pub data: Vec<u8>,
}

/// One coherent exchange within a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turn {
    /// System instruction; `Some("")` still counts as present.
    pub system: Option<String>,
    /// User prompt, including any image placeholders.
    pub prompt: Option<String>,
    /// Assistant response.
    pub response: Option<String>,
    pub images: Vec<Image>,
    /// Estimated cost, including the image surcharge.
    pub tokens: usize,
}

impl Turn {
    /// A turn pre-seeded with a system instruction.
    pub fn with_system(system: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            ..Self::default()
        }
    }

    pub fn system(&self) -> &str {
        self.system.as_deref().unwrap_or_default()
    }

    pub fn prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or_default()
    }

    pub fn response(&self) -> &str {
        self.response.as_deref().unwrap_or_default()
    }

    /// True when any of the three slots has been set.
    pub fn is_started(&self) -> bool {
        self.system.is_some() || self.prompt.is_some() || self.response.is_some()
    }

    /// Surcharge for the images currently attached.
    pub fn image_tokens(&self) -> usize {
        self.images.len() * IMAGE_TOKEN_COST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_system_still_starts_turn() {
        let turn = Turn::with_system("");
        assert!(turn.is_started());
        assert_eq!(turn.system(), "");
    }

    #[test]
    fn default_turn_is_not_started() {
        assert!(!Turn::default().is_started());
    }

    #[test]
    fn image_surcharge_scales_with_count() {
        let mut turn = Turn::default();
        turn.images.push(Image { id: 0, data: vec![] });
        turn.images.push(Image { id: 1, data: vec![] });
        assert_eq!(turn.image_tokens(), 2 * IMAGE_TOKEN_COST);
    }
}
