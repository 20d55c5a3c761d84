//! Structural kv parser
//!
//! Walks the indentation levels of a kv document the same way the kv language
//! builds its rule tree, stopping at the first structural error. Nothing is
//! built; only validity is reported.

use super::lines::{SourceLine, logical_lines};
use super::value::check_value;
use super::{MarkupParser, ParseFailure};

/// Property names allowed despite containing a dot
const DOTTED_PROPERTIES: [&str; 2] = ["canvas.before", "canvas.after"];
/// Properties whose nested block is a canvas instruction tree
const CANVAS_PROPERTIES: [&str; 3] = ["canvas", "canvas.before", "canvas.after"];

fn is_property_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_class_start(c: char) -> bool {
    c.is_ascii_uppercase()
}

/// Built-in kv syntax validator
#[derive(Debug, Default, Clone, Copy)]
pub struct KvParser;

impl KvParser {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupParser for KvParser {
    fn name(&self) -> &str {
        "kv"
    }

    fn validate(&self, text: &str) -> Result<(), ParseFailure> {
        let lines = logical_lines(text);
        let mut walker = LevelWalker {
            lines: &lines,
            pos: 0,
            spaces: 0,
            has_root: false,
            values: Vec::new(),
        };
        walker.parse_level(0)?;
        walker.check_values()
    }
}

/// A property value waiting for its lexical check
struct PendingValue {
    line: usize,
    value: String,
}

struct LevelWalker<'a> {
    lines: &'a [SourceLine<'a>],
    pos: usize,
    /// Indentation unit, fixed by the first indented line
    spaces: usize,
    has_root: bool,
    values: Vec<PendingValue>,
}

impl<'a> LevelWalker<'a> {
    /// Parse the lines at `level` and their children.
    ///
    /// Returns with `pos` on the first line that belongs to an outer level.
    fn parse_level(&mut self, level: usize) -> Result<(), ParseFailure> {
        let lines: &'a [SourceLine<'a>] = self.lines;
        let indent = self.spaces * level;
        let mut has_object = false;
        let mut current_property: Option<&'a str> = None;
        let mut open_value: Option<usize> = None;

        while let Some(line) = lines.get(self.pos) {
            let count = line.indent;
            if self.spaces == 0 {
                self.spaces = count;
            }
            let spaces = self.spaces;
            if spaces > 0 && count % spaces != 0 {
                return Err(ParseFailure::syntax(
                    line.number,
                    format!("Invalid indentation, must be a multiple of {spaces} spaces"),
                ));
            }

            if count < indent {
                return Ok(());
            }

            if count == indent {
                let (name, rest) = split_declaration(line.content);
                if name.is_empty() {
                    return Err(ParseFailure::syntax(line.number, "Identifier missing"));
                }
                if let Some(rest) = rest
                    && !rest.is_empty()
                    && !rest.trim_start().starts_with('#')
                {
                    return Err(ParseFailure::syntax(
                        line.number,
                        "Invalid data after declaration",
                    ));
                }
                let name = name.trim_end();
                if count == 0 {
                    self.check_root_rule(line.number, name)?;
                } else if !name.chars().all(is_property_char) {
                    return Err(ParseFailure::syntax(line.number, "Invalid class name"));
                }
                has_object = true;
                current_property = None;
                open_value = None;
                self.pos += 1;
            } else if count == indent + spaces {
                let (name, rest) = split_declaration(line.content);
                let name = name.trim_end();
                current_property = None;
                open_value = None;

                let (clear_previous, name) = match name.strip_prefix('-') {
                    Some(stripped) => (true, stripped),
                    None => (false, name),
                };
                let Some(first) = name.chars().next() else {
                    return Err(ParseFailure::syntax(line.number, "Identifier missing"));
                };

                if is_class_start(first) {
                    if clear_previous {
                        return Err(ParseFailure::syntax(
                            line.number,
                            "clear previous, `-`, not allowed here",
                        ));
                    }
                    let number = line.number;
                    self.parse_level(level + 1)?;
                    if !has_object {
                        return Err(ParseFailure::syntax(number, "Invalid indentation"));
                    }
                    continue;
                }

                if !has_object {
                    return Err(ParseFailure::syntax(line.number, "Invalid indentation"));
                }
                if !DOTTED_PROPERTIES.contains(&name) && !name.chars().all(is_property_char) {
                    return Err(ParseFailure::syntax(line.number, "Invalid property name"));
                }
                let Some(value) = rest.map(str::trim) else {
                    return Err(ParseFailure::syntax(line.number, "Syntax error"));
                };

                if name == "id" {
                    if value.is_empty() {
                        return Err(ParseFailure::syntax(line.number, "Empty id"));
                    }
                    if value == "self" || value == "root" {
                        return Err(ParseFailure::syntax(
                            line.number,
                            "Invalid id, cannot be \"self\" or \"root\"",
                        ));
                    }
                } else if !value.is_empty() {
                    self.values.push(PendingValue {
                        line: line.number,
                        value: value.to_string(),
                    });
                } else {
                    current_property = Some(name);
                    self.values.push(PendingValue {
                        line: line.number,
                        value: String::new(),
                    });
                    open_value = Some(self.values.len() - 1);
                }
                self.pos += 1;
            } else if count == indent + 2 * spaces {
                if current_property.is_some_and(|p| CANVAS_PROPERTIES.contains(&p)) {
                    self.parse_level(level + 2)?;
                    current_property = None;
                    open_value = None;
                    continue;
                }
                let Some(index) = open_value else {
                    return Err(ParseFailure::syntax(line.number, "Invalid indentation"));
                };
                let pending = &mut self.values[index];
                if pending.value.is_empty() {
                    // The value starts on the line after its property name.
                    pending.line = line.number;
                } else {
                    pending.value.push('\n');
                }
                pending.value.push_str(line.content);
                self.pos += 1;
            } else {
                return Err(ParseFailure::syntax(
                    line.number,
                    "Invalid indentation (too many levels)",
                ));
            }
        }

        Ok(())
    }

    /// Validate a top level declaration: a `<rule>`, a `[template]` or the
    /// single root widget.
    fn check_root_rule(&mut self, line: usize, name: &str) -> Result<(), ParseFailure> {
        if name.starts_with('<') {
            return check_rule_selector(line, name);
        }
        if name.starts_with('[') {
            return check_template(line, name);
        }
        if self.has_root {
            return Err(ParseFailure::syntax(
                line,
                "Only one root object is allowed by .kv",
            ));
        }
        self.has_root = true;
        Ok(())
    }

    fn check_values(&self) -> Result<(), ParseFailure> {
        for pending in &self.values {
            check_value(&pending.value)
                .map_err(|e| ParseFailure::syntax(pending.line + e.line, e.message))?;
        }
        Ok(())
    }
}

/// Split `name: rest` at the first colon.
fn split_declaration(content: &str) -> (&str, Option<&str>) {
    match content.split_once(':') {
        Some((name, rest)) => (name, Some(rest)),
        None => (content, None),
    }
}

fn check_rule_selector(line: usize, name: &str) -> Result<(), ParseFailure> {
    let Some(inner) = name
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
    else {
        return Err(ParseFailure::syntax(line, "Invalid rule (must be inside <>)"));
    };
    let inner = inner.strip_prefix('-').unwrap_or(inner);

    for selector in inner.split(',') {
        let selector = selector.trim_start_matches(' ');
        if selector.is_empty() {
            return Err(ParseFailure::syntax(line, "Empty rule detected"));
        }
        if let Some((class_name, _bases)) = selector.split_once('@') {
            let valid = class_name
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
            if !valid {
                return Err(ParseFailure::syntax(line, "Invalid dynamic class name"));
            }
        }
    }
    Ok(())
}

fn check_template(line: usize, name: &str) -> Result<(), ParseFailure> {
    let Some(inner) = name
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return Err(ParseFailure::syntax(
            line,
            "Invalid template (must be inside [])",
        ));
    };
    if !inner.contains('@') {
        return Err(ParseFailure::syntax(line, "Invalid template name (missing @)"));
    }
    Ok(())
}
