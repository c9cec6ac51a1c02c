/// `LineStream` - Physical lines of an authoring script
///
/// This module handles:
/// - Line numbering (1-based)
/// - Stripping `\n` / `\r\n` terminators and a leading byte-order mark
/// - Expanding tabs in leading indentation to tab stops
use std::io::BufRead;

/// Tab stops are expanded to this many spaces
const TAB_WIDTH: usize = 8;

/// One physical script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-based line number within its file
    pub number: usize,
    /// Line text without its terminator
    pub text: String,
}

impl ScriptLine {
    /// Width of the leading whitespace
    #[must_use]
    pub fn leading_whitespace(&self) -> usize {
        self.text.len() - self.text.trim_start().len()
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// `LineStream` reads [`ScriptLine`]s from a reader
pub struct LineStream<R: BufRead> {
    reader: R,
    line_number: usize,
}

impl<R: BufRead> LineStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }

    /// Read the next line, `None` at EOF
    pub fn next_line(&mut self) -> std::io::Result<Option<ScriptLine>> {
        let mut raw_line = String::new();
        if self.reader.read_line(&mut raw_line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        if raw_line.ends_with('\n') {
            raw_line.pop();
            if raw_line.ends_with('\r') {
                raw_line.pop();
            }
        }
        if self.line_number == 1 {
            if let Some(stripped) = raw_line.strip_prefix('\u{feff}') {
                raw_line = stripped.to_string();
            }
        }
        let indent_len = raw_line.len() - raw_line.trim_start().len();
        if raw_line[..indent_len].contains('\t') {
            raw_line = expand_indent(&raw_line, indent_len);
        }

        Ok(Some(ScriptLine {
            number: self.line_number,
            text: raw_line,
        }))
    }
}

/// Expand tabs in the first `indent_len` bytes to the next tab stop,
/// leaving the content after the indentation untouched
fn expand_indent(line: &str, indent_len: usize) -> String {
    let (indent, content) = line.split_at(indent_len);
    let mut expanded = String::with_capacity(line.len() + TAB_WIDTH);
    let mut column = 0;
    for c in indent.chars() {
        if c == '\t' {
            let width = TAB_WIDTH - column % TAB_WIDTH;
            expanded.extend(std::iter::repeat(' ').take(width));
            column += width;
        } else {
            expanded.push(c);
            column += 1;
        }
    }
    expanded.push_str(content);
    expanded
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_line_numbers_and_terminators() {
        let mut stream = LineStream::new(Cursor::new("a\r\n  b\n\nc"));
        let a = stream.next_line().unwrap().unwrap();
        assert_eq!((a.number, a.text.as_str()), (1, "a"));
        let b = stream.next_line().unwrap().unwrap();
        assert_eq!((b.number, b.text.as_str()), (2, "  b"));
        assert_eq!(b.leading_whitespace(), 2);
        assert!(stream.next_line().unwrap().unwrap().is_blank());
        assert_eq!(stream.next_line().unwrap().unwrap().text, "c");
        assert!(stream.next_line().unwrap().is_none());
    }

    #[test]
    fn test_bom_and_tabs() {
        let mut stream = LineStream::new(Cursor::new("\u{feff}:: start\n\tHello\n"));
        assert_eq!(stream.next_line().unwrap().unwrap().text, ":: start");
        let tabbed = stream.next_line().unwrap().unwrap();
        assert_eq!(tabbed.leading_whitespace(), 8);
    }

    #[test]
    fn test_tabs_expand_to_stops_in_indent_only() {
        let mut stream = LineStream::new(Cursor::new("  \ta\tb\n"));
        let line = stream.next_line().unwrap().unwrap();
        assert_eq!(line.leading_whitespace(), 8);
        assert_eq!(line.text, "        a\tb");
    }
}
