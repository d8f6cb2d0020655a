//! `promptpack check`: Validate config, template and tokenizer.

use promptpack_config::{PackConfig, TokenizerKind};
use promptpack_template::Template;

use super::CliResult;

pub fn run() -> CliResult {
    println!("🩺 promptpack check");
    println!("===================\n");

    let mut issues = 0;

    let config_path = PackConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, run `promptpack init` (using defaults)");
    }

    let config = match PackConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid (num_ctx = {})", config.num_ctx);
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue found. See above for details.");
            return Ok(());
        }
    };

    // Validation already compiled the template once.
    match Template::parse(&config.template) {
        Ok(template) if template.has_response_node() => {
            println!("  ✅ Template compiles and marks the response position");
        }
        Ok(_) => {
            println!("  ⚠️  Template has no top-level {{{{ .Response }}}}; one will be appended");
        }
        Err(e) => {
            println!("  ❌ Template invalid: {e}");
            issues += 1;
        }
    }

    match super::encoder(&config.tokenizer) {
        Ok(encoder) => match encoder.encode("hello world") {
            Ok(tokens) => println!(
                "  ✅ Tokenizer ready ({:?}, \"hello world\" = {} tokens)",
                config.tokenizer.kind,
                tokens.len()
            ),
            Err(e) => {
                println!("  ❌ Tokenizer failed to encode: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Tokenizer unavailable: {e}");
            issues += 1;
        }
    }

    if config.tokenizer.kind == TokenizerKind::Heuristic {
        println!("  ℹ️  Heuristic token counts are estimates; configure a huggingface tokenizer for exact counts");
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
