//! CLI command implementations.

pub mod build;
pub mod check;
pub mod init;
pub mod render;

use std::path::Path;
use std::sync::Arc;

use promptpack_config::{PackConfig, TokenizerConfig, TokenizerKind};
use promptpack_core::{Encoder, HeuristicEncoder};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Build the encoder the config asks for.
pub fn encoder(config: &TokenizerConfig) -> CliResult<Arc<dyn Encoder>> {
    match config.kind {
        TokenizerKind::Heuristic => Ok(Arc::new(HeuristicEncoder::new(config.chars_per_token))),
        TokenizerKind::Huggingface => huggingface(config),
    }
}

#[cfg(feature = "hf")]
fn huggingface(config: &TokenizerConfig) -> CliResult<Arc<dyn Encoder>> {
    let path = config
        .path
        .as_ref()
        .ok_or("tokenizer.path is required for the huggingface tokenizer")?;
    Ok(Arc::new(promptpack_packer::HfTokenizerEncoder::from_file(path)?))
}

#[cfg(not(feature = "hf"))]
fn huggingface(_config: &TokenizerConfig) -> CliResult<Arc<dyn Encoder>> {
    Err("huggingface tokenizer support is not compiled in; rebuild with `--features hf`".into())
}

/// The configured template, or the contents of `path` when given.
/// A path of `-` reads the template from stdin.
pub fn load_template(config: &mut PackConfig, path: Option<&Path>) -> CliResult<()> {
    match path {
        Some(path) if path == Path::new("-") => {
            config.template = std::io::read_to_string(std::io::stdin())?;
            config.template_file = None;
        }
        Some(path) => config.read_template_file(path)?,
        None => return Ok(()),
    }
    config.validate()?;
    Ok(())
}
