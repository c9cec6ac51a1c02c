//! Script building.
//!
//! - [`engine`]: the [`Engine`] run state, the file chain that reads the master
//!   input and its imports depth-first, and the indentation bookkeeping shared
//!   by every line
//! - `dispatch`: line classification, directive execution and content formatting
//! - [`context`]: per-file [`ParseContext`]
//! - [`stats`]: counters logged at the end of a run
//!
//! The main entry points are [`Engine::run`] for files on disk and
//! [`Engine::run_reader`] for any buffered reader.

pub mod context;
mod dispatch;
pub mod engine;
pub mod stats;

pub use context::ParseContext;
pub use engine::Engine;
pub use stats::Stats;
