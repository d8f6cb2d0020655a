//! `promptpack build`: Pack conversation files into prompts.
//!
//! Each file is packed on its own blocking worker; results are printed in
//! the order the files were given. A file that fails is logged and skipped,
//! and the command fails after every file has been tried.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use promptpack_config::PackConfig;
use promptpack_core::{Encoder, Message};
use promptpack_packer::{PackedPrompt, PromptPacker};

use super::CliResult;

pub struct BuildArgs {
    pub files: Vec<PathBuf>,
    pub window: Option<usize>,
    pub system: Option<String>,
    pub template: Option<PathBuf>,
    pub report: bool,
}

pub async fn run(args: BuildArgs) -> CliResult {
    let mut config = PackConfig::load()?;
    super::load_template(&mut config, args.template.as_deref())?;

    let window = args.window.unwrap_or(config.num_ctx);
    let system = args.system.unwrap_or_else(|| config.system.clone());
    let packer = Arc::new(PromptPacker::new(config.template.clone(), window).with_system(system));
    let encoder = super::encoder(&config.tokenizer)?;

    let results = pack_all(&args.files, packer, encoder).await;

    let many = args.files.len() > 1;
    let mut failed = 0;
    for (path, result) in args.files.iter().zip(results) {
        let packed = match result {
            Ok(packed) => packed,
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "failed to pack conversation");
                failed += 1;
                continue;
            }
        };
        let meta = &packed.metadata;
        tracing::info!(
            file = %path.display(),
            tokens = meta.total_tokens,
            window = meta.window,
            turns_dropped = meta.turns_dropped,
            images_dropped = meta.images_dropped,
            "packed conversation"
        );

        if many {
            println!("==> {} <==", path.display());
        }
        println!("{}", packed.prompt);

        if args.report {
            eprintln!("{}", serde_json::to_string_pretty(meta)?);
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} files failed to pack", args.files.len()).into());
    }
    Ok(())
}

/// Pack every file on its own blocking worker. Results come back in input
/// order, one per file, and a failure never cancels the other files.
pub async fn pack_all(
    files: &[PathBuf],
    packer: Arc<PromptPacker>,
    encoder: Arc<dyn Encoder>,
) -> Vec<CliResult<PackedPrompt>> {
    let tasks: Vec<_> = files
        .iter()
        .cloned()
        .map(|path| {
            let packer = Arc::clone(&packer);
            let encoder = Arc::clone(&encoder);
            tokio::task::spawn_blocking(move || pack_file(&path, &packer, encoder.as_ref()))
        })
        .collect();

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(match task.await {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        });
    }
    results
}

/// Read a JSON message array from `path` and pack it.
pub fn pack_file(path: &Path, packer: &PromptPacker, encoder: &dyn Encoder) -> CliResult<PackedPrompt> {
    let content = std::fs::read_to_string(path)?;
    let messages: Vec<Message> = serde_json::from_str(&content)?;
    Ok(packer.pack(&messages, encoder)?)
}
