//! [`HtmlRenderer`]: loads a template and its style sheet, renders the
//! template against a model, and injects the wrapped styles.

use std::path::Path;

use serde::Serialize;

use htmlmail_core::{Rendered, Value};

use crate::cache::ProgramCache;
use crate::config::RenderConfig;
use crate::error::{io_err, template_err, RenderError};
use crate::style::{inject_style, wrap_style};

// ---------------------------------------------------------------------------
// Loading helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, RenderError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "loaded");
    Ok(contents)
}

// ---------------------------------------------------------------------------
// HtmlRenderer
// ---------------------------------------------------------------------------

/// Renders HTML documents. Compiled templates are cached by content hash, so
/// one renderer can be shared across threads and reused for many models.
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    config: RenderConfig,
    cache: ProgramCache,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self {
            config,
            cache: ProgramCache::new(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    /// Reads the template at `html_path` and the style sheet at `css_path`,
    /// renders the template against `model`, and replaces the placeholder
    /// with the wrapped style sheet.
    ///
    /// Either file failing to load is a [`RenderError::Io`]; nothing is
    /// rendered in that case.
    pub fn generate_html<T: Serialize + ?Sized>(
        &self,
        html_path: &Path,
        css_path: &Path,
        model: &T,
    ) -> Result<String, RenderError> {
        let css = read_file(css_path)?;
        let template = read_file(html_path)?;
        let model = Value::from(serde_json::to_value(model)?);
        let name = html_path.display().to_string();
        Ok(self.render_named(&name, &template, Some(&css), model)?.text)
    }

    /// Renders an in-memory template. With `css`, the placeholder is
    /// replaced by the wrapped style sheet; without, the body is returned
    /// as rendered.
    pub fn render_str(
        &self,
        template: &str,
        css: Option<&str>,
        model: Value,
    ) -> Result<Rendered, RenderError> {
        self.render_named("<inline>", template, css, model)
    }

    /// Renders `template` under `name`, which labels errors and logs.
    pub fn render_named(
        &self,
        name: &str,
        template: &str,
        css: Option<&str>,
        model: Value,
    ) -> Result<Rendered, RenderError> {
        let program = self
            .cache
            .get_or_compile(template)
            .map_err(|e| template_err(name, template, e))?;
        let mut rendered = program
            .render_with(model, &self.config.options())
            .map_err(|e| template_err(name, template, e))?;
        if let Some(css) = css {
            rendered.text = inject_style(&rendered.text, &wrap_style(css), &self.config.placeholder);
        }
        tracing::debug!(template = name, bytes = rendered.text.len(), "rendered");
        Ok(rendered)
    }
}
