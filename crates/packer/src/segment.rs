//! Message segmentation.
//!
//! Walks the messages in order and starts a new [`Turn`] whenever the next
//! message would give the current turn a second instruction, prompt or
//! response. The first turn starts out holding the model's base system
//! instruction.

use std::collections::VecDeque;
use std::fmt::Write as _;

use promptpack_core::{Image, Message, Result, Role, Turn};

/// Group `messages` into turns. Fails on the first message whose role is not
/// `system`, `user` or `assistant`.
pub fn segment(messages: &[Message], base_system: &str) -> Result<VecDeque<Turn>> {
    let mut turns = VecDeque::new();
    let mut turn = Turn::with_system(base_system);
    let mut next_image = 0;

    for message in messages {
        match message.role()? {
            Role::System => {
                if turn.is_started() {
                    turns.push_back(std::mem::take(&mut turn));
                }
                turn.system = Some(message.content.clone());
            }
            Role::User => {
                if turn.prompt.is_some() || turn.response.is_some() {
                    turns.push_back(std::mem::take(&mut turn));
                }
                let mut prompt = message.content.clone();
                for data in &message.images {
                    let _ = write!(prompt, " [img-{next_image}]");
                    turn.images.push(Image {
                        id: next_image,
                        data: data.clone(),
                    });
                    next_image += 1;
                }
                turn.prompt = Some(prompt);
            }
            Role::Assistant => {
                if turn.response.is_some() {
                    turns.push_back(std::mem::take(&mut turn));
                }
                turn.response = Some(message.content.clone());
            }
        }
    }

    if turn.is_started() {
        turns.push_back(turn);
    }

    Ok(turns)
}
