//! Configuration loading and validation for promptpack.
//!
//! Loads configuration from `~/.promptpack/config.toml` with environment
//! variable overrides. The prompt template is compiled during validation so
//! a broken template is reported at startup, not on the first request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use promptpack_template::Template;

/// The root configuration structure.
///
/// Maps directly to `~/.promptpack/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackConfig {
    /// Context window in tokens
    #[serde(default = "default_num_ctx")]
    pub num_ctx: usize,

    /// Base system instruction the first turn starts with
    #[serde(default)]
    pub system: String,

    /// Prompt template source
    #[serde(default = "default_template")]
    pub template: String,

    /// Read the template from this file instead (relative to the config file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,

    /// Tokenizer used to price turns
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
}

fn default_num_ctx() -> usize {
    2048
}
fn default_template() -> String {
    "{{ .Prompt }}".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Character-count estimate
    Heuristic,
    /// A `tokenizer.json` loaded with Hugging Face `tokenizers`
    Huggingface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default = "default_tokenizer_kind")]
    pub kind: TokenizerKind,

    /// Path to `tokenizer.json` (huggingface only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Bytes per token (heuristic only)
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
}

fn default_tokenizer_kind() -> TokenizerKind {
    TokenizerKind::Heuristic
}
fn default_chars_per_token() -> usize {
    4
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            kind: default_tokenizer_kind(),
            path: None,
            chars_per_token: default_chars_per_token(),
        }
    }
}

impl PackConfig {
    /// Load configuration from the default path (~/.promptpack/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `PROMPTPACK_NUM_CTX`
    /// - `PROMPTPACK_TEMPLATE_FILE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(file) = config.template_file.clone() {
            let file = match path.parent() {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file,
            };
            config.read_template_file(&file)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup, then re-validate.
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(num_ctx) = var("PROMPTPACK_NUM_CTX") {
            self.num_ctx = num_ctx.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "PROMPTPACK_NUM_CTX must be a non-negative integer, got {num_ctx:?}"
                ))
            })?;
        }

        if let Some(file) = var("PROMPTPACK_TEMPLATE_FILE") {
            self.read_template_file(Path::new(&file))?;
        }

        self.validate()
    }

    /// Replace the template with the contents of `path`.
    pub fn read_template_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        self.template = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.template_file = Some(path.to_path_buf());
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".promptpack")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Template::parse(&self.template)
            .map_err(|e| ConfigError::ValidationError(format!("template: {e}")))?;

        if self.tokenizer.chars_per_token == 0 {
            return Err(ConfigError::ValidationError(
                "tokenizer.chars_per_token must be > 0".into(),
            ));
        }

        if self.tokenizer.kind == TokenizerKind::Huggingface && self.tokenizer.path.is_none() {
            return Err(ConfigError::ValidationError(
                "tokenizer.path is required for the huggingface tokenizer".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            num_ctx: default_num_ctx(),
            system: String::new(),
            template: default_template(),
            template_file: None,
            tokenizer: TokenizerConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
