//! `promptpack render`: Render one turn through the template.

use std::path::PathBuf;

use promptpack_config::PackConfig;
use promptpack_template::{Bindings, render};

use super::CliResult;

pub fn run(
    template: Option<PathBuf>,
    system: &str,
    prompt: &str,
    response: &str,
    cut: bool,
) -> CliResult {
    let mut config = PackConfig::load()?;
    super::load_template(&mut config, template.as_deref())?;

    let vars = Bindings {
        system,
        prompt,
        response,
    };
    print!("{}", render(&config.template, vars, cut)?);
    Ok(())
}
