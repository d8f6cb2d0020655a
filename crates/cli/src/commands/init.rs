//! `promptpack init`: Write a default config file.

use promptpack_config::PackConfig;

use super::CliResult;

pub fn run(print: bool) -> CliResult {
    let default_toml = PackConfig::default_toml();
    if print {
        print!("{default_toml}");
        return Ok(());
    }

    let config_dir = PackConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        println!("  Config file exists: {}", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, default_toml)?;
    println!("✅ Created config file: {}", config_path.display());
    println!("   Set `template` to your model's prompt template and `num_ctx` to its window.");

    Ok(())
}
