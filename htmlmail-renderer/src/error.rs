//! Error types for htmlmail-renderer.

use std::path::PathBuf;

use thiserror::Error;

use htmlmail_core::TemplateError;

/// All errors that can arise while producing a document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Filesystem error while loading a template, style sheet, or config.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template failed to compile or evaluate.
    #[error("template {name}: {source}")]
    Template {
        name: String,
        /// Text of the offending source line, when the error has one.
        line_text: Option<String>,
        #[source]
        source: TemplateError,
    },

    /// YAML parse error on config load.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The model could not be serialized.
    #[error("model serialization error: {0}")]
    Model(#[from] serde_json::Error),
}

/// Convenience constructor for [`RenderError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

/// Wraps a [`TemplateError`] with the template name and offending line.
pub(crate) fn template_err(name: &str, source_text: &str, source: TemplateError) -> RenderError {
    let line_text = source.source_line(source_text).map(str::to_string);
    RenderError::Template {
        name: name.to_string(),
        line_text,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htmlmail_core::compile;

    #[test]
    fn template_err_captures_offending_line() {
        let source = "ok\n@{ 1 + }\nlater";
        let err = compile(source).unwrap_err();
        match template_err("mail.html", source, err) {
            RenderError::Template {
                name, line_text, ..
            } => {
                assert_eq!(name, "mail.html");
                assert_eq!(line_text.as_deref(), Some("@{ 1 + }"));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn unterminated_block_points_at_its_opener() {
        let source = "ok\n@{ if (x) {\ninside\nlast";
        let err = compile(source).unwrap_err();
        match template_err("mail.html", source, err) {
            RenderError::Template { line_text, .. } => {
                assert_eq!(line_text.as_deref(), Some("@{ if (x) {"));
            }
            other => panic!("unexpected {other}"),
        }
    }
}
