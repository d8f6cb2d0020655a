//! # promptpack core
//!
//! Domain types, traits, and error definitions shared by the template
//! renderer and the conversation packer. This crate has no framework
//! dependencies; it defines the model the other crates work against.
//!
//! - [`Message`] is the chat input, [`Turn`] the unit of truncation.
//! - [`Encoder`] is the seam to whatever tokenizer the caller runs.
//! - [`Error`] carries the whole failure taxonomy.

pub mod encoder;
pub mod error;
pub mod message;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use encoder::{Encoder, HeuristicEncoder};
pub use error::{EncodingError, Error, Result, TemplateError};
pub use message::{Message, Role};
pub use turn::{IMAGE_TOKEN_COST, Image, Turn};
