//! Prompt packing under a token window.
//!
//! # Truncation
//!
//! While the summed turn costs exceed the window:
//!
//! | Oldest turn | Action |
//! |-------------|--------|
//! | more than one image | drop its oldest image, keep looping |
//! | one of several turns, no instruction | drop it, keep looping |
//! | one of several turns, with instruction | drop it, move the instruction to the next turn if that has none, stop |
//! | the only turn | stop |
//!
//! The loop never drops more than one instruction-bearing turn, so the result
//! can stay over the window. That case is reported through
//! [`PackMetadata::over_budget`] and a warning.

use std::collections::VecDeque;

use promptpack_core::{Encoder, IMAGE_TOKEN_COST, Image, Message, Result, Turn};
use promptpack_template::{Bindings, render};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::segment::segment;
use crate::token::turn_tokens;

/// A packed prompt, ready for the model runtime.
#[derive(Debug, Clone)]
pub struct PackedPrompt {
    /// Concatenated rendering of the surviving turns.
    pub prompt: String,
    /// Images still referenced by the surviving turns, oldest first.
    pub images: Vec<Image>,
    pub metadata: PackMetadata,
}

/// What truncation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackMetadata {
    /// Sum of the freshly computed turn costs, before truncation.
    pub initial_tokens: usize,
    /// Sum of the surviving turn costs.
    pub total_tokens: usize,
    pub window: usize,
    pub turns_total: usize,
    pub turns_kept: usize,
    pub turns_dropped: usize,
    pub images_dropped: usize,
    /// The packed prompt is still larger than the window.
    pub over_budget: bool,
}

/// Packs conversations for one model: its template, base system instruction
/// and context window. Holds no per-call state, so one packer can serve
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct PromptPacker {
    template: String,
    system: String,
    window: usize,
}

impl PromptPacker {
    pub fn new(template: impl Into<String>, window: usize) -> Self {
        Self {
            template: template.into(),
            system: String::new(),
            window,
        }
    }

    /// Set the base system instruction the first turn starts with.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Segment, price, truncate and render `messages`.
    pub fn pack(&self, messages: &[Message], encoder: &dyn Encoder) -> Result<PackedPrompt> {
        let mut turns = segment(messages, &self.system)?;

        for turn in turns.iter_mut() {
            turn.tokens = turn_tokens(&self.template, turn, encoder)?;
        }

        let mut metadata = PackMetadata {
            initial_tokens: total_tokens(&turns),
            window: self.window,
            turns_total: turns.len(),
            ..PackMetadata::default()
        };

        self.truncate(&mut turns, encoder, &mut metadata)?;

        metadata.total_tokens = total_tokens(&turns);
        metadata.turns_kept = turns.len();
        metadata.over_budget = metadata.total_tokens > self.window;
        if metadata.over_budget {
            warn!(
                tokens = metadata.total_tokens,
                window = self.window,
                turns = metadata.turns_kept,
                "packed prompt exceeds the context window"
            );
        }

        let mut prompt = String::new();
        for turn in &turns {
            prompt.push_str(&render(&self.template, Bindings::from(turn), true)?);
        }

        let images = turns.into_iter().flat_map(|turn| turn.images).collect();

        Ok(PackedPrompt {
            prompt,
            images,
            metadata,
        })
    }

    fn truncate(
        &self,
        turns: &mut VecDeque<Turn>,
        encoder: &dyn Encoder,
        metadata: &mut PackMetadata,
    ) -> Result<()> {
        loop {
            let total = total_tokens(turns);
            if total <= self.window {
                return Ok(());
            }

            let Some(oldest) = turns.front_mut() else {
                return Ok(());
            };

            if oldest.images.len() > 1 {
                let image = oldest.images.remove(0);
                oldest.tokens = oldest.tokens.saturating_sub(IMAGE_TOKEN_COST);
                metadata.images_dropped += 1;
                debug!(
                    id = image.id,
                    tokens = total,
                    window = self.window,
                    "context window too long, removing image"
                );
                continue;
            }

            if turns.len() == 1 {
                return Ok(());
            }

            let Some(removed) = turns.pop_front() else {
                return Ok(());
            };
            metadata.turns_dropped += 1;
            debug!(
                tokens = total,
                window = self.window,
                turn_tokens = removed.tokens,
                has_system = !removed.system().is_empty(),
                "context window too long, removing turn"
            );

            if removed.system().is_empty() {
                continue;
            }

            // Bring the instruction along and re-price the turn that gets it.
            if let Some(next) = turns.front_mut() {
                if next.system().is_empty() {
                    next.system = removed.system;
                    next.tokens = turn_tokens(&self.template, next, encoder)?;
                }
            }
            return Ok(());
        }
    }
}

fn total_tokens(turns: &VecDeque<Turn>) -> usize {
    turns.iter().map(|turn| turn.tokens).sum()
}

/// Render `messages` into one prompt that fits `window` tokens where possible.
pub fn build_prompt(
    template: &str,
    system: &str,
    messages: &[Message],
    window: usize,
    encoder: &dyn Encoder,
) -> Result<String> {
    let packer = PromptPacker::new(template, window).with_system(system);
    Ok(packer.pack(messages, encoder)?.prompt)
}
