//! Authoring script reading utilities.
//!
//! This module provides the infrastructure for reading script files:
//! - [`LineStream`]: Numbered physical lines with terminators stripped and tabs expanded
//! - [`patterns`]: Precompiled regex patterns for comments, raw lines and label names

pub mod patterns;
pub mod stream;

pub use stream::{LineStream, ScriptLine};
