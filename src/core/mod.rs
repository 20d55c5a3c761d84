//! Core Business Logic
//!
//! Document management and diagnostic payloads.

pub mod diagnostics;
pub mod document;

pub use diagnostics::{PublishDiagnosticsParams, line_diagnostic};
pub use document::{DocumentError, LanguageId, TextDocumentItem, TextDocumentStore};
