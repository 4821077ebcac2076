//! Error types for htmlmail-core.

use thiserror::Error;

/// All errors that can arise while compiling or evaluating a template.
///
/// Every variant except [`TemplateError::Model`] carries the 1-based source
/// line of the offending construct.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Malformed template syntax, detected before evaluation starts.
    #[error("parse error at line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },

    /// Operands incompatible with an operator.
    #[error("type error at line {line}: {message}")]
    Type { line: usize, message: String },

    /// A required property path does not exist on the model.
    #[error("path not found at line {line}: {path}")]
    PathNotFound { line: usize, path: String },

    /// A statement executed against an invalid state.
    #[error("evaluation error at line {line}: {message}")]
    Evaluation { line: usize, message: String },

    /// The model could not be converted into template values.
    #[error("model serialization error: {0}")]
    Model(#[from] serde_json::Error),
}

impl TemplateError {
    /// Source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            TemplateError::Parse { line, .. }
            | TemplateError::Type { line, .. }
            | TemplateError::PathNotFound { line, .. }
            | TemplateError::Evaluation { line, .. } => Some(*line),
            TemplateError::Model(_) => None,
        }
    }

    /// Text of the offending line within `source`, without its terminator.
    pub fn source_line<'s>(&self, source: &'s str) -> Option<&'s str> {
        let index = self.line()?.checked_sub(1)?;
        let text = source.split('\n').nth(index)?;
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    pub(crate) fn parse(line: usize, kind: ParseErrorKind) -> Self {
        TemplateError::Parse { line, kind }
    }

    pub(crate) fn type_error(line: usize, message: impl Into<String>) -> Self {
        TemplateError::Type {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn evaluation(line: usize, message: impl Into<String>) -> Self {
        TemplateError::Evaluation {
            line,
            message: message.into(),
        }
    }
}

/// The specific reason a template failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("code block opened at line {opened_at} is never closed")]
    UnterminatedBlock { opened_at: usize },

    #[error("inline expression `@{{` has no closing `}}`")]
    UnterminatedExpression,

    #[error("inline expression `@{{}}` is empty")]
    EmptyExpression,

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid number literal `{0}`")]
    InvalidNumber(String),

    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("expected {expected}, found end of block")]
    UnexpectedEnd { expected: String },

    #[error("template text where {expected} was expected")]
    UnexpectedText { expected: String },

    #[error("unexpected content after the closing `}}` of a code block: `{0}`")]
    TrailingContent(String),

    #[error("`{text}` is not a statement ({cause}); mark template text inside a code block with `@:`")]
    TextInCodeBlock {
        text: String,
        cause: Box<ParseErrorKind>,
    },
}

pub type Result<T, E = TemplateError> = std::result::Result<T, E>;
