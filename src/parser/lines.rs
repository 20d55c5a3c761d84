//! Line splitting shared by the kv parser and the lint rules.
//!
//! A line terminator is `\n`, `\r\n` or a lone `\r`.

/// Split text into physical lines, keeping each line's terminator.
///
/// Empty text yields no lines; text ending in a terminator does not yield a
/// trailing empty line.
pub fn split_lines_inclusive(text: &str) -> SplitInclusive<'_> {
    SplitInclusive { rest: text }
}

pub struct SplitInclusive<'a> {
    rest: &'a str,
}

impl<'a> Iterator for SplitInclusive<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let bytes = self.rest.as_bytes();
        let end = match bytes.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(idx) if bytes[idx] == b'\r' && bytes.get(idx + 1) == Some(&b'\n') => idx + 2,
            Some(idx) => idx + 1,
            None => self.rest.len(),
        };
        let (line, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(line)
    }
}

/// Remove a single trailing terminator, if any.
pub fn strip_terminator(line: &str) -> &str {
    line.strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .or_else(|| line.strip_suffix('\r'))
        .unwrap_or(line)
}

/// Whether the line ends with a terminator.
pub fn has_terminator(line: &str) -> bool {
    line.ends_with(['\n', '\r'])
}

/// Width of one tab when measuring indentation
pub const TAB_WIDTH: usize = 4;

/// A kv line that carries content, after comments and blank lines are gone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// Zero-based line number in the parsed text
    pub number: usize,
    /// Indentation width with tabs expanded
    pub indent: usize,
    /// Line content without surrounding whitespace
    pub content: &'a str,
}

/// Collect the lines the kv parser cares about.
///
/// Comment lines (first non-blank character `#`, which includes `#:`
/// directives) and blank lines are dropped. Comments at the end of a line are
/// kept, as kv does.
pub fn logical_lines(text: &str) -> Vec<SourceLine<'_>> {
    split_lines_inclusive(text)
        .map(strip_terminator)
        .enumerate()
        .filter_map(|(number, line)| {
            let content = line.trim();
            if content.is_empty() || content.starts_with('#') {
                return None;
            }
            let leading = &line[..line.len() - line.trim_start_matches([' ', '\t']).len()];
            let indent = leading
                .chars()
                .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
                .sum();
            Some(SourceLine {
                number,
                indent,
                content,
            })
        })
        .collect()
}
