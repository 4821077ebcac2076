//! `htmlmail render <template>`: render one template to HTML.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use htmlmail_core::Value;
use htmlmail_renderer::{HtmlRenderer, RenderConfig};

/// Arguments for `htmlmail render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template file to render.
    pub template: PathBuf,

    /// CSS file injected at the style placeholder.
    #[arg(long, value_name = "CSS")]
    pub style: Option<PathBuf>,

    /// JSON file holding the model. Defaults to an empty object.
    #[arg(long, value_name = "JSON")]
    pub model: Option<PathBuf>,

    /// YAML render config.
    #[arg(long, value_name = "YAML")]
    pub config: Option<PathBuf>,

    /// Write the document here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Report suspicious evaluations such as division by zero.
    #[arg(long)]
    pub strict: bool,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)?,
            None => RenderConfig::default(),
        };
        config.strict |= self.strict;

        let model = match &self.model {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("could not read model {}", path.display()))?;
                let json: serde_json::Value = serde_json::from_str(&raw)
                    .with_context(|| format!("model {} is not valid JSON", path.display()))?;
                Value::from(json)
            }
            None => Value::from(serde_json::json!({})),
        };

        let template = std::fs::read_to_string(&self.template)
            .with_context(|| format!("could not read template {}", self.template.display()))?;
        let css = self
            .style
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("could not read style sheet {}", path.display()))
            })
            .transpose()?;

        let renderer = HtmlRenderer::with_config(config);
        let name = self.template.display().to_string();
        let rendered = renderer.render_named(&name, &template, css.as_deref(), model)?;

        for warning in &rendered.warnings {
            eprintln!(
                "{} line {}: {}",
                "warning:".yellow().bold(),
                warning.line,
                warning.message
            );
        }

        match &self.out {
            Some(path) => {
                std::fs::write(path, &rendered.text)
                    .with_context(|| format!("could not write {}", path.display()))?;
                tracing::info!(out = %path.display(), "wrote document");
            }
            None => print!("{}", rendered.text),
        }
        Ok(())
    }
}
