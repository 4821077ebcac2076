//! `htmlmail check <template>...`: compile templates without rendering.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

/// Arguments for `htmlmail check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Template files to check.
    #[arg(required = true)]
    pub templates: Vec<PathBuf>,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let mut failed = 0usize;
        for path in &self.templates {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("could not read template {}", path.display()))?;
            match htmlmail_core::compile(&source) {
                Ok(_) => println!("{} {}", "ok".green(), path.display()),
                Err(err) => {
                    failed += 1;
                    println!("{} {}: {err}", "FAIL".red().bold(), path.display());
                    if let Some(text) = err.source_line(&source) {
                        println!("    {}", text.dimmed());
                    }
                }
            }
        }
        if failed > 0 {
            bail!("{failed} of {} template(s) failed to compile", self.templates.len());
        }
        Ok(())
    }
}
