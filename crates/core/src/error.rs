//! Error types for prompt building.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each stage (template, tokenizer, segmentation) has its own variant.
//! Nothing here is retried: any error aborts the whole build.

use thiserror::Error;

/// The top-level error type for all promptpack operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Template errors ---
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    // --- Tokenizer errors ---
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    // --- Segmentation errors ---
    #[error("invalid role: {0}, role must be one of [system, user, assistant]")]
    InvalidRole(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template source could not be compiled.
    #[error("syntax error at line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    /// The compiled template failed while executing against its bindings.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl TemplateError {
    pub fn syntax(line: usize, reason: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            reason: reason.into(),
        }
    }

    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution(reason.into())
    }
}

/// Tokenizer failure reported by an [`Encoder`](crate::Encoder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EncodingError(pub String);

impl EncodingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
