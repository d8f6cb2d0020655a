//! promptpack CLI: the main entry point.
//!
//! Commands:
//! - `init` - Write a default config file
//! - `check` - Validate config, template and tokenizer
//! - `render` - Render one turn through the template
//! - `build` - Pack conversation files into prompts

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "promptpack",
    about = "promptpack: token-budgeted prompt rendering for chat conversations",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write ~/.promptpack/config.toml with defaults
    Init {
        /// Print the default config instead of writing it
        #[arg(long)]
        print: bool,
    },

    /// Validate the config, template and tokenizer
    Check,

    /// Render a single turn through the template
    Render {
        /// Template file, or `-` for stdin (defaults to the configured template)
        #[arg(short, long)]
        template: Option<PathBuf>,

        #[arg(long, default_value = "")]
        system: String,

        #[arg(long, default_value = "")]
        prompt: String,

        #[arg(long, default_value = "")]
        response: String,

        /// Stop rendering after the response marker
        #[arg(long)]
        cut: bool,
    },

    /// Pack JSON conversation files into prompts
    Build {
        /// Files holding a JSON array of {role, content, images} messages
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Override the context window
        #[arg(short, long, env = "PROMPTPACK_NUM_CTX")]
        window: Option<usize>,

        /// Override the base system instruction
        #[arg(short, long)]
        system: Option<String>,

        /// Template file (defaults to the configured template)
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Print pack metadata as JSON to stderr
        #[arg(long)]
        report: bool,
    },
}

#[tokio::main]
async fn main() -> commands::CliResult {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for prompts.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { print } => commands::init::run(print)?,
        Commands::Check => commands::check::run()?,
        Commands::Render {
            template,
            system,
            prompt,
            response,
            cut,
        } => commands::render::run(template, &system, &prompt, &response, cut)?,
        Commands::Build {
            files,
            window,
            system,
            template,
            report,
        } => {
            commands::build::run(commands::build::BuildArgs {
                files,
                window,
                system,
                template,
                report,
            })
            .await?
        }
    }

    Ok(())
}
