//! Glob pattern compiler
//!
//! Author patterns are a small glob language:
//!
//! | pattern       | meaning                                  |
//! |---------------|------------------------------------------|
//! | `*`           | any run of characters (lazy)             |
//! | `+`           | one or more characters (lazy)            |
//! | `?`           | at most one character                    |
//! | `{...}`       | capture group around the enclosed glob   |
//! | `{name}`, `{}`| capture group matching any text          |
//! | `\{ \} \* \+ \? \\` | the literal character              |
//!
//! Everything else matches itself. Compilation runs in two passes so that
//! escaped literals never collide with the metacharacters translated in the
//! second pass: pass 1 parks them on private-use code points, pass 2
//! translates the glob and restores the parked characters as regex escapes.

use log::{trace, warn};
use regex::Regex;

use crate::error::BuildError;

/// First code point of the placeholder block. Authored text is assumed
/// never to contain private-use characters.
const PLACEHOLDER_BASE: u32 = 0xE000;

/// Escaped literals handled by pass 1, in placeholder order
const ESCAPED_LITERALS: [char; 6] = ['{', '}', '*', '+', '?', '\\'];

/// How a compiled pattern is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `^pattern$`
    FullLine,
    /// `^pattern\s(.*)`, the last group being the trailing argument
    LeadingToken,
}

fn placeholder(index: usize) -> char {
    // index < ESCAPED_LITERALS.len(), always a valid scalar value
    char::from_u32(PLACEHOLDER_BASE + index as u32).unwrap_or('\u{E000}')
}

fn placeholder_index(c: char) -> Option<usize> {
    let code = c as u32;
    if (PLACEHOLDER_BASE..PLACEHOLDER_BASE + ESCAPED_LITERALS.len() as u32).contains(&code) {
        Some((code - PLACEHOLDER_BASE) as usize)
    } else {
        None
    }
}

fn is_private_use(c: char) -> bool {
    ('\u{E000}'..='\u{F8FF}').contains(&c)
}

/// Pass 1: park escaped literals on placeholders and escape literal
/// regex characters that have no glob meaning.
fn protect_literals(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let parked = chars
                    .peek()
                    .and_then(|next| ESCAPED_LITERALS.iter().position(|l| l == next));
                if let Some(index) = parked {
                    chars.next();
                    out.push(placeholder(index));
                } else {
                    out.push('\\');
                }
            }
            '.' | '(' | ')' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            c if is_private_use(c) => {
                warn!("Failed to match {c:?} in pattern {pattern:?}, passing it through");
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Pass 2: translate glob metacharacters into regex syntax.
fn translate_glob(protected: &str) -> String {
    let mut out = String::with_capacity(protected.len() * 2);
    let mut rest = protected;

    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '{' => {
                let named = rest
                    .find('}')
                    .map(|end| (end, &rest[..end]))
                    .filter(|(_, inner)| inner.is_empty() || is_identifier(inner));
                if let Some((end, inner)) = named {
                    out.push_str(if inner.is_empty() { "(.*?)" } else { "(.+?)" });
                    rest = &rest[end + 1..];
                } else {
                    out.push('(');
                }
            }
            '}' => out.push(')'),
            '*' => out.push_str(".*?"),
            '+' => out.push_str(".+?"),
            '?' => out.push_str(".?"),
            '^' | '$' | '|' => {
                out.push('\\');
                out.push(c);
            }
            '\\' => {
                // Escapes produced by pass 1 or written by the author
                out.push('\\');
                if let Some(next) = rest.chars().next() {
                    out.push(next);
                    rest = &rest[next.len_utf8()..];
                }
            }
            c => match placeholder_index(c) {
                Some(index) => {
                    out.push('\\');
                    out.push(ESCAPED_LITERALS[index]);
                }
                None => out.push(c),
            },
        }
    }
    out
}

/// Translate an author glob into an unanchored regex body.
#[must_use]
pub fn glob_to_regex(pattern: &str) -> String {
    let body = translate_glob(&protect_literals(pattern.trim()));
    trace!("Preparing pattern for regex: {pattern} -> {body}");
    body
}

/// Compile an author glob into an anchored matcher.
pub fn compile_pattern(pattern: &str, anchor: Anchor) -> Result<Regex, BuildError> {
    let body = glob_to_regex(pattern);
    let source = match anchor {
        Anchor::FullLine => format!("^{body}$"),
        Anchor::LeadingToken => format!(r"^{body}\s(.*)"),
    };
    Regex::new(&source).map_err(|e| BuildError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
