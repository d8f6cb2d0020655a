//! Conversation packing: fit a chat history into a model's context window.
//!
//! The pipeline runs one way:
//!
//! 1. **Segment** messages into [`Turn`](promptpack_core::Turn)s, each with at
//!    most one system instruction, one prompt and one response
//! 2. **Price** every turn by rendering it through the template and encoding
//!    the result, plus a flat surcharge per image
//! 3. **Truncate** from the oldest end: extra images first, then whole turns,
//!    carrying a dropped system instruction forward
//! 4. **Render** the surviving turns, cutting each after its output marker,
//!    and concatenate
//!
//! # Example
//!
//! ```
//! use promptpack_core::{HeuristicEncoder, Message};
//! use promptpack_packer::PromptPacker;
//!
//! let packer = PromptPacker::new("{{ .System }} {{ .Prompt }} ", 2048)
//!     .with_system("You are terse.");
//! let messages = vec![Message::user("Why is the sky blue?")];
//! let packed = packer.pack(&messages, &HeuristicEncoder::default()).unwrap();
//! assert_eq!(packed.prompt, "You are terse. Why is the sky blue? ");
//! ```

#[cfg(feature = "hf")]
pub mod encoders;
pub mod packer;
pub mod segment;
pub mod token;

#[cfg(feature = "hf")]
pub use encoders::HfTokenizerEncoder;
pub use packer::{PackMetadata, PackedPrompt, PromptPacker, build_prompt};
pub use segment::segment;
pub use token::{estimate_tokens, turn_tokens};
