//! Error types for every compile stage.
//!
//! Each stage owns its error type; [`Error`] wraps them for callers of
//! [`Compiler::compile`](crate::Compiler::compile).

use thiserror::Error;

use crate::ast::Pos;

/// Malformed template source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template:{line}:{column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
            message: message.into(),
        }
    }

    pub fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }
}

/// A valid template that failed while executing against its data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("template:{pos}: map has no entry for key {field:?}")]
    MissingField { pos: Pos, field: String },

    #[error("template:{pos}: nil pointer evaluating {path}")]
    NilPointer { pos: Pos, path: String },

    #[error("template:{pos}: can't evaluate field {field} in type {kind}")]
    NotAMap {
        pos: Pos,
        field: String,
        kind: &'static str,
    },

    #[error("template:{pos}: index out of range: {index} (length {len})")]
    IndexOutOfRange { pos: Pos, index: i64, len: usize },

    #[error("template:{pos}: no such template {name:?}")]
    UndefinedTemplate { pos: Pos, name: String },

    #[error("template:{pos}: undefined variable: {name}")]
    UndefinedVariable { pos: Pos, name: String },

    #[error("template:{pos}: function {name:?} not defined")]
    UndefinedFunction { pos: Pos, name: String },

    #[error("template:{pos}: can't give argument to non-function {operand}")]
    NotAFunction { pos: Pos, operand: String },

    #[error("template:{pos}: error calling {name}: {message}")]
    Call {
        pos: Pos,
        name: String,
        message: String,
    },

    #[error("template:{pos}: range can't iterate over {kind}")]
    CannotRange { pos: Pos, kind: &'static str },

    #[error("template:{pos}: exceeded maximum template depth ({max})")]
    DepthExceeded { pos: Pos, max: usize },

    #[error("template:{pos}: captured value is directly followed by \"?\"")]
    AdjacentPlaceholder { pos: Pos },

    #[error("invalid template data: {0}")]
    InvalidData(String),
}

/// Rejected compiler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid function name, {0} is reserved")]
    ReservedName(String),

    #[error("function name {0:?} is not a valid identifier")]
    InvalidName(String),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// A placeholder dialect refused the generated statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("placeholder {index} rejected: {reason}")]
    Rejected { index: usize, reason: String },

    #[error("statement has {placeholders} placeholders but {args} arguments were captured")]
    CountMismatch { placeholders: usize, args: usize },
}

/// Any failure of a compile call.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError::new(Pos { line: 3, column: 7 }, "unexpected {{end}}");
        assert_eq!(err.to_string(), "template:3:7: unexpected {{end}}");
    }

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::MissingField {
            pos: Pos { line: 1, column: 12 },
            field: "Value".to_string(),
        };
        assert!(err.to_string().contains("1:12"));
        assert!(err.to_string().contains("\"Value\""));
    }

    #[test]
    fn test_error_wraps_stages() {
        let err: Error = FormatError::CountMismatch {
            placeholders: 2,
            args: 1,
        }
        .into();
        assert!(matches!(err, Error::Format(_)));
        assert!(err.to_string().contains("2 placeholders"));
    }
}
