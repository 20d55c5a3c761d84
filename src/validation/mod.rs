//! Validation Engine
//!
//! Lint rules and the engine that applies them to open documents.

pub mod engine;
pub mod rules;

pub use engine::{
    DEFAULT_MAX_LINE_LENGTH, Finding, LintContext, LintEngine, LintSettings, Rule, RuleCheck,
    RuleRegistry, SOURCE,
};
