//! Pattern-substitution rules.
//!
//! Authors declare rules with `:l` (whole line) and `:p` (leading token).
//! This module turns their glob patterns into anchored regexes and keeps
//! the compiled rules in registration order:
//! - [`compiler`]: two-pass glob to regex translation
//! - [`template`]: positional template rendering with literal braces
//! - [`table`]: the ordered [`RuleSet`] consulted for every content line

pub mod compiler;
pub mod table;
pub mod template;

pub use compiler::{compile_pattern, glob_to_regex, Anchor};
pub use table::{NvlAffix, RuleSet, SubstitutionRule};
pub use template::{escape_quotes, render};
