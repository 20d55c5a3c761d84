//! Diagnostic payloads
//!
//! Diagnostics are whole-line findings: the range always starts and ends at
//! character 0 of the reported line.

use serde::Serialize;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

/// Params of a `textDocument/publishDiagnostics` notification.
///
/// The uri is kept as the raw string the client sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishDiagnosticsParams {
    pub uri: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl PublishDiagnosticsParams {
    pub fn new(uri: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            uri: uri.into(),
            diagnostics,
        }
    }

    /// An empty list, which removes every marker the client shows for `uri`
    pub fn clear(uri: impl Into<String>) -> Self {
        Self::new(uri, Vec::new())
    }
}

/// Build a diagnostic covering the start of `line`.
pub fn line_diagnostic(
    line: usize,
    severity: DiagnosticSeverity,
    code: &str,
    source: &str,
    message: String,
) -> Diagnostic {
    let line = u32::try_from(line).unwrap_or(u32::MAX);
    let position = Position::new(line, 0);
    Diagnostic::new(
        Range::new(position, position),
        Some(severity),
        Some(NumberOrString::String(code.to_string())),
        Some(source.to_string()),
        message,
        None,
        None,
    )
}
