//! Document Management
//!
//! Tracks the documents the client has opened. Python documents may embed
//! one kv block between `#<KvLang>` and `#</KvLang>` markers; only that block
//! is linted, and its diagnostics are shifted to host-file lines.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tower_lsp::lsp_types::Diagnostic;

use crate::core::diagnostics::PublishDiagnosticsParams;
use crate::parser::split_lines_inclusive;
use crate::validation::LintEngine;

/// Marker opening an embedded kv block
pub const EMBED_OPEN_TAG: &str = "#<KvLang>";
/// Marker closing an embedded kv block
pub const EMBED_CLOSE_TAG: &str = "#</KvLang>";

static EMBEDDED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)#<KvLang>.*?#</KvLang>(?:\r\n|\n|\r)?").expect("embedded block pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("document not found: {0}")]
    NotFound(String),
}

/// Language of a document, as reported by the client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LanguageId {
    /// Python host files that may embed a kv block
    Python,
    /// Plain kv files
    Kv,
    /// Anything else; never linted
    Other(String),
}

impl LanguageId {
    pub fn as_str(&self) -> &str {
        match self {
            LanguageId::Python => "python",
            LanguageId::Kv => "kv",
            LanguageId::Other(other) => other,
        }
    }
}

impl From<&str> for LanguageId {
    fn from(value: &str) -> Self {
        match value {
            "python" => LanguageId::Python,
            "kv" => LanguageId::Kv,
            other => LanguageId::Other(other.to_string()),
        }
    }
}

/// An open document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocumentItem {
    pub uri: String,
    pub language_id: LanguageId,
    text: String,
}

impl TextDocumentItem {
    pub fn new(uri: impl Into<String>, language_id: LanguageId, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            language_id,
            text: text.into(),
        }
    }

    /// The full text as last sent by the client
    pub fn raw_text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// The part of the document that is kv source.
    ///
    /// For Python this is the first complete embedded block, markers
    /// included, plus the line terminator right after the closing marker.
    pub fn effective_text(&self) -> &str {
        match self.language_id {
            LanguageId::Kv => &self.text,
            LanguageId::Python => EMBEDDED_BLOCK
                .find(&self.text)
                .map_or("", |block| block.as_str()),
            LanguageId::Other(_) => "",
        }
    }

    /// Host-file line of the first line of [`Self::effective_text`].
    pub fn line_offset(&self) -> usize {
        match self.language_id {
            LanguageId::Python => split_lines_inclusive(&self.text)
                .position(|line| line.contains(EMBED_OPEN_TAG))
                .unwrap_or(0),
            _ => 0,
        }
    }
}

/// Open documents keyed by uri
#[derive(Debug, Default)]
pub struct TextDocumentStore {
    documents: HashMap<String, TextDocumentItem>,
}

impl TextDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened document and lint it.
    ///
    /// Opening a uri that is already tracked replaces it.
    pub fn open(
        &mut self,
        uri: &str,
        language_id: LanguageId,
        text: impl Into<String>,
        engine: &LintEngine,
    ) -> Vec<Diagnostic> {
        let document = TextDocumentItem::new(uri, language_id, text);
        let diagnostics = engine.lint(&document);
        if self.documents.insert(uri.to_string(), document).is_some() {
            log::debug!("reopened {uri}");
        }
        diagnostics
    }

    /// Store the saved text (when the client sent it) and re-lint.
    pub fn save(
        &mut self,
        uri: &str,
        text: Option<String>,
        engine: &LintEngine,
    ) -> Result<Vec<Diagnostic>, DocumentError> {
        let document = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::NotFound(uri.to_string()))?;
        if let Some(text) = text {
            document.set_text(text);
        }
        Ok(engine.lint(document))
    }

    /// Stop tracking a document; the result clears its diagnostics.
    pub fn close(&mut self, uri: &str) -> PublishDiagnosticsParams {
        if self.documents.remove(uri).is_none() {
            log::debug!("closed untracked document {uri}");
        }
        PublishDiagnosticsParams::clear(uri)
    }

    pub fn get(&self, uri: &str) -> Result<&TextDocumentItem, DocumentError> {
        self.documents
            .get(uri)
            .ok_or_else(|| DocumentError::NotFound(uri.to_string()))
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
