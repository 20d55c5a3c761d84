//! Well-formedness check for property values.
//!
//! kv property values are Python expressions (or statements, for `on_`
//! handlers). Full expression parsing is out of reach here; this checks the
//! lexical structure that breaks every expression: string literals and
//! bracket nesting.

/// Lexical problem found in a value; `line` is relative to the value's first line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError {
    pub line: usize,
    pub message: String,
}

impl ValueError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

struct OpenString {
    quote: char,
    triple: bool,
    line: usize,
}

/// Check string literals and brackets of a (possibly multi-line) value.
pub fn check_value(value: &str) -> Result<(), ValueError> {
    let chars: Vec<char> = value.chars().collect();
    let mut brackets: Vec<(char, usize)> = Vec::new();
    let mut string: Option<OpenString> = None;
    let mut line = 0;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if let Some(open) = &string {
            match ch {
                '\\' => {
                    if chars.get(i + 1) == Some(&'\n') {
                        line += 1;
                    }
                    i += 2;
                    continue;
                }
                '\n' if !open.triple => {
                    return Err(ValueError::new(line, "EOL while scanning string literal"));
                }
                '\n' => line += 1,
                c if c == open.quote => {
                    if !open.triple {
                        string = None;
                    } else if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                        string = None;
                        i += 2;
                    }
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match ch {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '\'' | '"' => {
                let triple = chars.get(i + 1) == Some(&ch) && chars.get(i + 2) == Some(&ch);
                string = Some(OpenString {
                    quote: ch,
                    triple,
                    line,
                });
                if triple {
                    i += 2;
                }
            }
            '(' | '[' | '{' => brackets.push((ch, line)),
            ')' | ']' | '}' => {
                let expected = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, _)) => {
                        return Err(ValueError::new(
                            line,
                            format!(
                                "closing parenthesis '{ch}' does not match opening parenthesis '{open}'"
                            ),
                        ));
                    }
                    None => return Err(ValueError::new(line, format!("unmatched '{ch}'"))),
                }
            }
            '\n' => line += 1,
            _ => {}
        }
        i += 1;
    }

    if let Some(open) = string {
        return Err(if open.triple {
            ValueError::new(open.line, "EOF while scanning triple-quoted string literal")
        } else {
            ValueError::new(line, "EOL while scanning string literal")
        });
    }
    if let Some((_, open_line)) = brackets.last() {
        return Err(ValueError::new(*open_line, "unexpected EOF while parsing"));
    }
    Ok(())
}
