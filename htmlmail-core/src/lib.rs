//! htmlmail core: template segmentation, compilation, and evaluation.
//!
//! A template mixes literal text, `@name.path` property references,
//! `@{ expr }` inline expressions, and multi-line `@{ … }` code blocks with
//! `var`, `if`/`else`, `for`, `foreach`, and `while` statements. Rendering
//! is two-phase: [`compile`] parses the whole template into a [`Program`],
//! then [`Program::render`] evaluates it against a model.
//!
//! ```rust
//! use htmlmail_core::{compile, Value};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Greeting { name: String }
//!
//! let program = compile("Hello @name!").unwrap();
//! let model = Value::from_serialize(&Greeting { name: "Ada".into() }).unwrap();
//! assert_eq!(program.render(model).unwrap(), "Hello Ada!");
//! ```
//!
//! Modules, leaves first:
//! - [`lexer`]: tokens of the expression/statement language
//! - [`fragment`]: inline markers within a text line
//! - [`segment`]: text lines vs. code-block lines
//! - [`parser`]: statements and expressions
//! - [`ir`]: the executable [`Program`]
//! - [`value`] / [`accessor`]: runtime values and property-path resolution
//! - [`eval`]: the evaluator

pub mod accessor;
pub mod ast;
pub mod error;
pub mod eval;
pub mod fragment;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod segment;
pub mod value;

use serde::Serialize;

pub use accessor::Resolution;
pub use error::{ParseErrorKind, TemplateError};
pub use eval::{Environment, RenderOptions, Rendered, Warning, MODEL_BINDING};
pub use ir::{Instruction, InstructionKind, Program};
pub use value::{Introspect, ModelObject, Value};

/// Parses template source into an executable [`Program`].
///
/// All syntax errors are reported here, before any evaluation.
pub fn compile(source: &str) -> error::Result<Program> {
    let template = segment::segment(source)?;
    ir::build(&template)
}

/// Compiles and renders `source` against a serializable model.
pub fn render<T: Serialize + ?Sized>(source: &str, model: &T) -> error::Result<String> {
    let program = compile(source)?;
    program.render(Value::from_serialize(model)?)
}
