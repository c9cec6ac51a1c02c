//! Output structure derived from the input's indentation.
//!
//! - [`indenter`]: tracks indentation levels for one input file and checks each
//!   line against what the previous line allowed

pub mod indenter;

pub use indenter::{IndentChange, IndentExpectation, IndentTracker};
