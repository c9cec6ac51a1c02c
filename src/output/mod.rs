//! Generated output.
//!
//! - [`router`]: the single writer for every output file, handling indentation,
//!   redirection and the open-handle table
//! - [`control`]: the derived `control.rpy` flow-control file

pub mod control;
pub mod router;

pub use control::{FlowControl, CONTROL_FILE, CONTROL_LABEL};
pub use router::{Backend, OutputRouter, INDENT_WIDTH};
