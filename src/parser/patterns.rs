/// Regex patterns for line classification
///
/// All patterns are compiled once on first use with `LazyLock`.
use std::sync::LazyLock;

use regex::Regex;

/// Build a regex from a compile-time constant pattern.
///
/// # Panics
///
/// Panics if the pattern is invalid. All patterns in this module are
/// constants covered by tests.
fn build_re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| panic!("Invalid regex pattern: {pattern}"))
}

/// `# comment`, capturing leading whitespace and the text after `#`
pub static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^(\s*)#(.*)$"));

/// `$ statement` raw passthrough
pub static RAW_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^(\$.*)$"));

/// Any directive-shaped line
pub static DIRECTIVE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^:(.*)$"));

/// Root of a dotted label name: `chapter1` in `chapter1.intro`
pub static PARENT_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| build_re(r"^(\w*)\.?.*$"));

/// Statements that end a label body on their own
pub static TERMINAL_STATEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| build_re(r"^(return|jump)\b"));
