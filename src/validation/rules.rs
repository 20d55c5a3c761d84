//! Built-in lint rules
//!
//! Line rules receive one physical line without its terminator. Document
//! rules receive the whole kv text and report a line local to it.

use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::DiagnosticSeverity;

use super::engine::{Finding, LintContext, Rule};
use crate::parser::{ParseFailure, has_terminator, split_lines_inclusive};

pub const SYNTAX_ERROR: &str = "KvLang100";
pub const LINE_TOO_LONG: &str = "KvLang101";
pub const TRAILING_WHITESPACE: &str = "KvLang102";
pub const RULE_NAME_DASH: &str = "KvLang103";
pub const RULE_NAME_WHITESPACE: &str = "KvLang104";
pub const FINAL_NEWLINE_MISSING: &str = "KvLang105";
pub const TRAILING_NEWLINES: &str = "KvLang106";

/// Every built-in rule, in the order its diagnostics are emitted
pub const BUILTIN_RULES: [Rule; 7] = [
    Rule::line(LINE_TOO_LONG, DiagnosticSeverity::INFORMATION, line_too_long),
    Rule::line(
        TRAILING_WHITESPACE,
        DiagnosticSeverity::INFORMATION,
        trailing_whitespace,
    ),
    Rule::line(RULE_NAME_DASH, DiagnosticSeverity::WARNING, rule_name_dash),
    Rule::line(
        RULE_NAME_WHITESPACE,
        DiagnosticSeverity::INFORMATION,
        rule_name_whitespace,
    ),
    Rule::document(
        FINAL_NEWLINE_MISSING,
        DiagnosticSeverity::INFORMATION,
        final_newline_missing,
    ),
    Rule::document(
        TRAILING_NEWLINES,
        DiagnosticSeverity::INFORMATION,
        trailing_newlines,
    ),
    Rule::document(SYNTAX_ERROR, DiagnosticSeverity::ERROR, syntax_error),
];

/// `<Name>:` rule header; the capture is everything between the brackets
static RULE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([-\w\s]+)>:").expect("rule header pattern"));

fn rule_name(line: &str) -> Option<&str> {
    RULE_HEADER
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn line_too_long(line: &str, context: &LintContext<'_>) -> Option<String> {
    let length = line.chars().count();
    let max = context.settings.max_line_length;
    (length >= max).then(|| format!("Line too long ({length},{max})"))
}

pub fn trailing_whitespace(line: &str, _context: &LintContext<'_>) -> Option<String> {
    line.ends_with(char::is_whitespace)
        .then(|| "Trailing whitespace".to_string())
}

/// A single leading dash is kv's "clear previous rules" marker; any other
/// dash is an error.
pub fn rule_name_dash(line: &str, _context: &LintContext<'_>) -> Option<String> {
    let name = rule_name(line)?;
    let dashes = name.matches('-').count();
    let misplaced = dashes > 1 || (dashes == 1 && !name.starts_with('-'));
    misplaced.then(|| "Invalid use of '-' in rule name".to_string())
}

pub fn rule_name_whitespace(line: &str, _context: &LintContext<'_>) -> Option<String> {
    let name = rule_name(line)?;
    name.contains(char::is_whitespace)
        .then(|| "Whitespace in rule name".to_string())
}

pub fn final_newline_missing(text: &str, _context: &LintContext<'_>) -> Option<Finding> {
    let (index, last) = split_lines_inclusive(text).enumerate().last()?;
    (!has_terminator(last)).then(|| Finding::new(index, "Final newline missing"))
}

pub fn trailing_newlines(text: &str, _context: &LintContext<'_>) -> Option<Finding> {
    let (index, last) = split_lines_inclusive(text).enumerate().last()?;
    (has_terminator(last) && last.trim().is_empty())
        .then(|| Finding::new(index, "Trailing newlines"))
}

pub fn syntax_error(text: &str, context: &LintContext<'_>) -> Option<Finding> {
    match context.parser.validate(text)? {
        Ok(()) => None,
        Err(ParseFailure::Syntax { line, message }) => Some(Finding::new(line, message)),
        Err(ParseFailure::Internal(detail)) => Some(Finding::new(
            0,
            format!("Internal parser error: {detail}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserCapability;
    use crate::validation::LintSettings;

    fn check_line(rule: fn(&str, &LintContext<'_>) -> Option<String>, line: &str) -> Option<String> {
        let settings = LintSettings::default();
        let parser = ParserCapability::builtin();
        rule(
            line,
            &LintContext {
                settings: &settings,
                parser: &parser,
            },
        )
    }

    fn check_document(
        rule: fn(&str, &LintContext<'_>) -> Option<Finding>,
        text: &str,
    ) -> Option<Finding> {
        let settings = LintSettings::default();
        let parser = ParserCapability::builtin();
        rule(
            text,
            &LintContext {
                settings: &settings,
                parser: &parser,
            },
        )
    }

    #[test]
    fn line_length_boundary() {
        assert_eq!(
            check_line(line_too_long, &"a".repeat(110)),
            Some("Line too long (110,110)".to_string())
        );
        assert_eq!(check_line(line_too_long, &"a".repeat(109)), None);
    }

    #[test]
    fn line_length_counts_characters() {
        assert_eq!(check_line(line_too_long, &"é".repeat(109)), None);
    }

    #[test]
    fn trailing_whitespace_needs_content() {
        assert!(check_line(trailing_whitespace, "x = 1 ").is_some());
        assert!(check_line(trailing_whitespace, "x\t").is_some());
        assert!(check_line(trailing_whitespace, "x").is_none());
        assert!(check_line(trailing_whitespace, "").is_none());
    }

    #[test]
    fn clear_marker_dash_is_allowed() {
        assert!(check_line(rule_name_dash, "<-Label>:").is_none());
        assert!(check_line(rule_name_dash, "<My-Label>:").is_some());
        assert!(check_line(rule_name_dash, "<--Label>:").is_some());
        assert!(check_line(rule_name_dash, "<Label->:").is_some());
    }

    #[test]
    fn header_rules_ignore_non_headers() {
        assert!(check_line(rule_name_dash, "<-La@bel>:").is_none());
        assert!(check_line(rule_name_whitespace, "<-La@bel>:").is_none());
        assert!(check_line(rule_name_whitespace, "    text: 'a b'").is_none());
        assert!(check_line(rule_name_dash, "<A-B>").is_none());
    }

    #[test]
    fn whitespace_in_rule_name() {
        assert_eq!(
            check_line(rule_name_whitespace, "<Label >:"),
            Some("Whitespace in rule name".to_string())
        );
        assert!(check_line(rule_name_whitespace, "<Label>:").is_none());
    }

    #[test]
    fn final_newline() {
        assert_eq!(
            check_document(final_newline_missing, "<A>:\n    x: 1"),
            Some(Finding::new(1, "Final newline missing"))
        );
        assert_eq!(check_document(final_newline_missing, "<A>:\n"), None);
    }

    #[test]
    fn trailing_blank_line() {
        assert_eq!(
            check_document(trailing_newlines, "<A>:\n\n"),
            Some(Finding::new(1, "Trailing newlines"))
        );
        assert_eq!(
            check_document(trailing_newlines, "<A>:\n  \r\n"),
            Some(Finding::new(1, "Trailing newlines"))
        );
        assert_eq!(check_document(trailing_newlines, "<A>:\n"), None);
        assert_eq!(check_document(trailing_newlines, "<A>:\n  "), None);
    }

    #[test]
    fn syntax_failure_is_reported_at_its_line() {
        assert_eq!(
            check_document(syntax_error, "<A>:\n    x: 1\n<B\n"),
            Some(Finding::new(2, "Invalid rule (must be inside <>)"))
        );
        assert_eq!(check_document(syntax_error, "<A>:\n    x: 1\n"), None);
    }

    #[test]
    fn syntax_rule_is_silent_without_parser() {
        let settings = LintSettings::default();
        let parser = ParserCapability::unavailable("disabled");
        let context = LintContext {
            settings: &settings,
            parser: &parser,
        };
        assert_eq!(syntax_error("<B\n", &context), None);
    }
}
