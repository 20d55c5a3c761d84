//! Markup Parser Capability
//!
//! Syntax checking of kv source is delegated to a [`MarkupParser`]. Which
//! parser is used (or whether one is usable at all) is decided once at
//! startup and captured in a [`ParserCapability`].

pub mod kv;
pub mod lines;
pub mod value;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

pub use kv::KvParser;
pub use lines::{SourceLine, has_terminator, logical_lines, split_lines_inclusive, strip_terminator};

/// Failure reported by a markup parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// Structured syntax error; `line` is zero-based within the parsed text
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    /// Any other failure inside the parser
    #[error("{0}")]
    Internal(String),
}

impl ParseFailure {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        ParseFailure::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// A parser able to validate kv source text.
///
/// Implementations must accept empty input and must not rely on global
/// mutable state.
pub trait MarkupParser: fmt::Debug {
    fn name(&self) -> &str;

    fn validate(&self, text: &str) -> Result<(), ParseFailure>;
}

/// Parser availability, selected once when the server starts
#[derive(Debug)]
pub enum ParserCapability {
    Available(Box<dyn MarkupParser>),
    Unavailable { reason: String },
}

impl Default for ParserCapability {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ParserCapability {
    /// The built-in structural kv parser
    pub fn builtin() -> Self {
        ParserCapability::Available(Box::new(KvParser::new()))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ParserCapability::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ParserCapability::Available(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ParserCapability::Available(_) => None,
            ParserCapability::Unavailable { reason } => Some(reason),
        }
    }

    /// Run the parser, if there is one.
    ///
    /// A panic inside the parser is reported as [`ParseFailure::Internal`]
    /// so it can never take the server down.
    pub fn validate(&self, text: &str) -> Option<Result<(), ParseFailure>> {
        let ParserCapability::Available(parser) = self else {
            return None;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| parser.validate(text)));
        Some(outcome.unwrap_or_else(|payload| {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("parser '{}' panicked: {}", parser.name(), detail);
            Err(ParseFailure::Internal(detail))
        }))
    }
}
