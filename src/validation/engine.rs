//! Validation Engine
//!
//! Runs an ordered set of lint rules over the kv part of a document. Line
//! rules run once per physical line; document rules run once per document.
//! Every finding is reported in host-file coordinates.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity};

use crate::config::Config;
use crate::core::diagnostics::line_diagnostic;
use crate::core::document::TextDocumentItem;
use crate::parser::{ParserCapability, split_lines_inclusive, strip_terminator};
use crate::validation::rules;

/// Source label attached to every diagnostic
pub const SOURCE: &str = "kvlint";

/// Lines at or above this many characters are reported
pub const DEFAULT_MAX_LINE_LENGTH: usize = 110;

/// Tunable rule parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSettings {
    pub max_line_length: usize,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Everything a rule may consult besides the text itself
pub struct LintContext<'a> {
    pub settings: &'a LintSettings,
    pub parser: &'a ParserCapability,
}

/// A document-level finding; `line` is relative to the linted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub line: usize,
    pub message: String,
}

impl Finding {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Check applied to one line, terminator stripped
pub type LineCheck = fn(&str, &LintContext<'_>) -> Option<String>;
/// Check applied to the whole kv text
pub type DocumentCheck = fn(&str, &LintContext<'_>) -> Option<Finding>;

#[derive(Clone, Copy)]
pub enum RuleCheck {
    Line(LineCheck),
    Document(DocumentCheck),
}

/// A registered rule and the metadata stamped on its diagnostics
#[derive(Clone, Copy)]
pub struct Rule {
    pub code: &'static str,
    pub severity: DiagnosticSeverity,
    pub source: &'static str,
    pub check: RuleCheck,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope = match self.check {
            RuleCheck::Line(_) => "line",
            RuleCheck::Document(_) => "document",
        };
        f.debug_struct("Rule")
            .field("code", &self.code)
            .field("severity", &self.severity)
            .field("scope", &scope)
            .finish()
    }
}

impl Rule {
    pub const fn line(code: &'static str, severity: DiagnosticSeverity, check: LineCheck) -> Self {
        Self {
            code,
            severity,
            source: SOURCE,
            check: RuleCheck::Line(check),
        }
    }

    pub const fn document(
        code: &'static str,
        severity: DiagnosticSeverity,
        check: DocumentCheck,
    ) -> Self {
        Self {
            code,
            severity,
            source: SOURCE,
            check: RuleCheck::Document(check),
        }
    }
}

/// Line rules and document rules, each kept in registration order
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    line_rules: Vec<Rule>,
    document_rules: Vec<Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in rule
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for rule in rules::BUILTIN_RULES {
            registry.register(rule);
        }
        registry
    }

    pub fn register(&mut self, rule: Rule) {
        match rule.check {
            RuleCheck::Line(_) => self.line_rules.push(rule),
            RuleCheck::Document(_) => self.document_rules.push(rule),
        }
    }

    /// Drop the rules whose code is listed.
    pub fn without<S: AsRef<str>>(mut self, codes: &[S]) -> Self {
        let disabled = |rule: &Rule| codes.iter().any(|code| code.as_ref() == rule.code);
        self.line_rules.retain(|rule| !disabled(rule));
        self.document_rules.retain(|rule| !disabled(rule));
        self
    }

    pub fn line_rules(&self) -> &[Rule] {
        &self.line_rules
    }

    pub fn document_rules(&self) -> &[Rule] {
        &self.document_rules
    }

    pub fn len(&self) -> usize {
        self.line_rules.len() + self.document_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lints documents with a fixed rule set and parser
#[derive(Debug)]
pub struct LintEngine {
    registry: RuleRegistry,
    settings: LintSettings,
    parser: ParserCapability,
}

impl Default for LintEngine {
    fn default() -> Self {
        Self::new(
            RuleRegistry::builtin(),
            LintSettings::default(),
            ParserCapability::builtin(),
        )
    }
}

impl LintEngine {
    pub fn new(registry: RuleRegistry, settings: LintSettings, parser: ParserCapability) -> Self {
        Self {
            registry,
            settings,
            parser,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let parser = if config.syntax_check {
            ParserCapability::builtin()
        } else {
            ParserCapability::unavailable("kv syntax checking is disabled by configuration")
        };
        let settings = LintSettings {
            max_line_length: config.max_line_length,
        };
        let registry = RuleRegistry::builtin().without(&config.disabled_rules);
        Self::new(registry, settings, parser)
    }

    pub fn parser(&self) -> &ParserCapability {
        &self.parser
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Lint the kv part of a document.
    pub fn lint(&self, document: &TextDocumentItem) -> Vec<Diagnostic> {
        self.lint_text(document.effective_text(), document.line_offset())
    }

    /// Lint kv text whose first line sits at `line_offset` in its file.
    pub fn lint_text(&self, text: &str, line_offset: usize) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        if text.is_empty() {
            return diagnostics;
        }

        let context = LintContext {
            settings: &self.settings,
            parser: &self.parser,
        };

        for (index, line) in split_lines_inclusive(text).enumerate() {
            let line = strip_terminator(line);
            for rule in &self.registry.line_rules {
                if let RuleCheck::Line(check) = rule.check
                    && let Some(message) = check(line, &context)
                {
                    diagnostics.push(build(rule, line_offset + index, message));
                }
            }
        }

        for rule in &self.registry.document_rules {
            if let RuleCheck::Document(check) = rule.check
                && let Some(finding) = check(text, &context)
            {
                diagnostics.push(build(rule, line_offset + finding.line, finding.message));
            }
        }

        log::debug!(
            "linted {} bytes at offset {}: {} diagnostic(s)",
            text.len(),
            line_offset,
            diagnostics.len()
        );
        diagnostics
    }
}

fn build(rule: &Rule, line: usize, message: String) -> Diagnostic {
    line_diagnostic(line, rule.severity, rule.code, rule.source, message)
}
