//! Render configuration, loaded from YAML.
//!
//! ```yaml
//! strict: true
//! max_iterations: 10000
//! placeholder: "<style></style>"
//! ```
//!
//! Every field is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use htmlmail_core::RenderOptions;

use crate::error::{io_err, RenderError};
use crate::style::DEFAULT_PLACEHOLDER;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Record warnings such as division by zero.
    pub strict: bool,
    /// Total loop iterations allowed per render; unbounded when absent.
    pub max_iterations: Option<u64>,
    /// Token replaced by the wrapped style sheet.
    pub placeholder: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_iterations: None,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl RenderConfig {
    /// Loads a config file. A missing file is an error; use
    /// [`RenderConfig::default`] when no file is configured.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        serde_yaml::from_str(&contents).map_err(|source| RenderError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Evaluator options derived from this config.
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            strict: self.strict,
            max_iterations: self.max_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: RenderConfig = serde_yaml::from_str("{}").expect("parse");
        assert_eq!(config, RenderConfig::default());
        assert_eq!(config.placeholder, "<style></style>");
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config: RenderConfig =
            serde_yaml::from_str("strict: true\nmax_iterations: 50\n").expect("parse");
        assert!(config.strict);
        assert_eq!(
            config.options(),
            RenderOptions {
                strict: true,
                max_iterations: Some(50),
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_yaml::from_str::<RenderConfig>("stritc: true").is_err());
    }
}
