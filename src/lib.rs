//! renbuild - Ren'Py script builder
//!
//! Builds Ren'Py `.rpy` files from compact, indentation-based story scripts,
//! plus an optional `control.rpy` that calls every label with content.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::struct_excessive_bools)]

pub mod cli;
pub mod config;
pub mod directive;
pub mod error;
pub mod format;
pub mod output;
pub mod parser;
pub mod process;
pub mod rules;

// Re-export commonly used types
pub use cli::{build_cli, parse_args, parse_args_from, CliArgs};
pub use config::Config;
pub use directive::{parse_directive, Directive};
pub use error::{BuildError, ErrorCategory, LocatedError, Result};
pub use process::{Engine, Stats};
