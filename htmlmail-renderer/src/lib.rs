//! # htmlmail-renderer
//!
//! File-level HTML generation on top of `htmlmail-core`: reads a template
//! and a CSS file, renders the template against a model, and injects the
//! style sheet at the `<style></style>` placeholder.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use htmlmail_renderer::HtmlRenderer;
//! use serde_json::json;
//!
//! fn build_receipt() -> Result<String, htmlmail_renderer::RenderError> {
//!     let renderer = HtmlRenderer::new();
//!     renderer.generate_html(
//!         Path::new("mail/receipt.html"),
//!         Path::new("mail/receipt.css"),
//!         &json!({ "customer": "Ada", "total": 12.5 }),
//!     )
//! }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod style;

pub use cache::{template_hash, ProgramCache};
pub use config::RenderConfig;
pub use engine::HtmlRenderer;
pub use error::RenderError;
pub use style::{inject_style, wrap_style, DEFAULT_PLACEHOLDER};
