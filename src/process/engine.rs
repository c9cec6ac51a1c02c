//! Build engine and file chain
//!
//! [`Engine`] holds everything that outlives a single input file: the output
//! router, the rule tables, the flow-control file, configuration and NVL
//! state. Input files are read depth-first; an `:import` recurses into
//! [`Engine::read_file`] with a fresh [`ParseContext`] and returns to the
//! importer once the imported file is drained.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, error, info, trace};
use regex::Regex;

use super::context::{ParseContext, PendingCall};
use super::stats::Stats;
use crate::config::Config;
use crate::error::{BuildError, LocatedError, Result};
use crate::format::IndentChange;
use crate::output::{Backend, FlowControl, OutputRouter};
use crate::parser::patterns::TERMINAL_STATEMENT_RE;
use crate::parser::{LineStream, ScriptLine};
use crate::rules::{compile_pattern, Anchor, RuleSet};

/// What the reader does after a line has been handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    /// Stop the whole run successfully
    Break,
    /// Read another input before continuing with this one
    Import(String),
}

pub(crate) fn compile_ignore_list(patterns: &[String]) -> std::result::Result<Vec<Regex>, BuildError> {
    patterns
        .iter()
        .map(|pattern| compile_pattern(pattern, Anchor::FullLine))
        .collect()
}

/// Canonical form of an input path, or its lexical absolute form when the
/// file does not exist on disk
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

pub struct Engine {
    pub(super) config: Config,
    /// Paths of the inputs currently being read, master first
    pub(super) open_files: Vec<PathBuf>,
    pub(super) router: OutputRouter,
    pub(super) flow: FlowControl,
    pub(super) rules: RuleSet,
    /// Compiled `flow_control_ignore` globs
    pub(super) ignore: Vec<Regex>,
    /// Label roots that already received a parent file
    pub(super) routed_roots: HashSet<String>,
    /// `None` outside NVL mode, otherwise the number of levels entered
    /// since `:nvl:`
    pub(super) nvl: Option<usize>,
    pub(super) stats: Stats,
}

impl Engine {
    /// Engine writing real files
    pub fn new(config: Config) -> std::result::Result<Self, BuildError> {
        Self::with_backend(config, Backend::Disk)
    }

    /// Engine keeping every output in memory, read back with [`Engine::output`]
    pub fn in_memory(config: Config) -> std::result::Result<Self, BuildError> {
        Self::with_backend(config, Backend::Memory)
    }

    fn with_backend(config: Config, backend: Backend) -> std::result::Result<Self, BuildError> {
        let ignore = compile_ignore_list(&config.flow_control_ignore)?;
        let mut router = OutputRouter::new(backend);
        router.set_output_dir(&config.output_path);
        Ok(Self {
            config,
            open_files: Vec::new(),
            router,
            flow: FlowControl::new(),
            rules: RuleSet::new(),
            ignore,
            routed_roots: HashSet::new(),
            nvl: None,
            stats: Stats::default(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Contents of an in-memory output, by the name it was written under
    #[must_use]
    pub fn output(&self, name: &str) -> Option<String> {
        self.router.contents(name)
    }

    /// Every output path opened during the run, in opening order
    #[must_use]
    pub fn outputs(&self) -> &[PathBuf] {
        self.router.opened()
    }

    /// Labels called from the flow-control file, in order
    #[must_use]
    pub fn control_calls(&self) -> &[String] {
        self.flow.calls()
    }

    #[must_use]
    pub fn nvl_depth(&self) -> Option<usize> {
        self.nvl
    }

    // =========================================================================
    // File chain
    // =========================================================================

    /// Build the master input at `path`.
    ///
    /// Outputs are flushed and the flow-control file closed whether or not
    /// the run succeeds.
    pub fn run(&mut self, path: &Path) -> Result<Stats> {
        let started = Instant::now();
        let outcome = self.read_master(path);
        let finished = self.finish();
        outcome?;
        finished?;
        Ok(self.summarize(started))
    }

    /// Build a master input supplied by a reader. `path` names the input
    /// for output naming, import resolution and log locations.
    pub fn run_reader<R: BufRead>(&mut self, path: &Path, reader: R) -> Result<Stats> {
        let started = Instant::now();
        let path = canonical(path);
        self.begin_master(&path);
        let outcome = self.read_file(path, reader);
        let finished = self.finish();
        outcome?;
        finished?;
        Ok(self.summarize(started))
    }

    /// Close the flow-control file and flush every output
    pub fn finish(&mut self) -> Result<()> {
        let closed = self.flow.finish(&mut self.router);
        let flushed = self.router.flush_all();
        closed.and(flushed).map_err(|error| LocatedError {
            location: String::new(),
            error,
        })
    }

    fn read_master(&mut self, path: &Path) -> Result<Flow> {
        let located = |error| LocatedError {
            location: String::new(),
            error,
        };
        if !path.is_file() {
            return Err(located(BuildError::InputNotFound(path.to_path_buf())));
        }
        let file = File::open(path).map_err(|e| located(BuildError::io(path, e)))?;
        let path = canonical(path);
        self.begin_master(&path);
        self.read_file(path, BufReader::new(file))
    }

    /// The master input picks the base directory and default output name
    fn begin_master(&mut self, path: &Path) {
        if let Some(dir) = path.parent() {
            self.router.set_base_dir(dir);
        }
        if self.router.target().is_none() {
            let stem = path
                .file_stem()
                .map_or_else(|| "script".to_string(), |s| s.to_string_lossy().into_owned());
            self.router.set_target(&format!("{stem}.rpy"));
        }
        info!("Building {}", path.display());
    }

    fn summarize(&mut self, started: Instant) -> Stats {
        self.stats.output_files = self.router.opened().len();
        self.stats.output_lines = self.router.lines_written();
        self.stats.control_calls = self.flow.calls().len();
        self.stats.elapsed = started.elapsed();
        self.stats.log_summary();
        self.stats.clone()
    }

    /// Read one input to the end with its own parse context
    fn read_file<R: BufRead>(&mut self, path: PathBuf, reader: R) -> Result<Flow> {
        debug!("Opening {} for reading", path.display());
        let mut ctx = ParseContext::new(path.clone(), self.nvl.take());
        self.open_files.push(path);
        self.stats.input_files += 1;

        let outcome = match self.drain(&mut ctx, LineStream::new(reader)) {
            Ok(Flow::Continue) => self.end_of_file(&mut ctx),
            other => other,
        };

        self.open_files.pop();
        self.nvl = ctx.saved_nvl;
        debug!("Closing {}", ctx.path.display());
        outcome
    }

    fn drain<R: BufRead>(&mut self, ctx: &mut ParseContext, mut lines: LineStream<R>) -> Result<Flow> {
        loop {
            let line = match lines.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(Flow::Continue),
                Err(e) => {
                    let error = BuildError::io(&ctx.path, e);
                    return Err(LocatedError {
                        location: ctx.location(),
                        error,
                    });
                }
            };
            ctx.line_number = line.number;
            self.stats.input_lines += 1;
            trace!("{}{}", ctx.location(), line.text);

            match self.process_line(ctx, &line)? {
                Flow::Continue => {}
                flow => return Ok(flow),
            }
        }
    }

    fn end_of_file(&mut self, ctx: &mut ParseContext) -> Result<Flow> {
        if let Some(call) = ctx.pending_call.take() {
            debug!("{}Label {} has no content", ctx.location(), call.label);
        }
        match self.close_labels(ctx, 0) {
            Ok(()) => Ok(Flow::Continue),
            Err(e) => self.recover(ctx, e),
        }
    }

    fn process_line(&mut self, ctx: &mut ParseContext, line: &ScriptLine) -> Result<Flow> {
        match self.dispatch_line(ctx, line) {
            Ok(Flow::Import(name)) => self.import(ctx, &name),
            Ok(flow) => Ok(flow),
            Err(e) => self.recover(ctx, e),
        }
    }

    /// Read `name`, relative to the importing file, before continuing
    fn import(&mut self, ctx: &mut ParseContext, name: &str) -> Result<Flow> {
        let path = ctx.directory().join(name);
        if !path.is_file() {
            return self.recover(ctx, BuildError::InputNotFound(path));
        }
        let path = canonical(&path);
        if self.open_files.contains(&path) {
            return self.recover(ctx, BuildError::ImportCycle(path));
        }
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => return self.recover(ctx, BuildError::io(&path, e)),
        };
        info!("{}Importing {}", ctx.location(), path.display());
        self.read_file(path, BufReader::new(file))
    }

    /// Fail with the error's location, or log it and carry on when
    /// `abort_on_error` is off
    fn recover(&mut self, ctx: &ParseContext, error: BuildError) -> Result<Flow> {
        let located = LocatedError {
            location: ctx.location(),
            error,
        };
        if self.config.abort_on_error {
            return Err(located);
        }
        self.stats.errors += 1;
        error!("{located}");
        Ok(Flow::Continue)
    }

    // =========================================================================
    // Indentation and NVL depth
    // =========================================================================

    /// NVL mode has been entered and not yet left
    pub(super) fn nvl_active(&self) -> bool {
        self.nvl.is_some_and(|depth| depth > 0)
    }

    /// Output indentation level for a line at `depth`
    pub(super) fn level(&self, depth: usize) -> usize {
        if self.nvl_active() {
            depth.saturating_sub(1)
        } else {
            depth
        }
    }

    fn pop_nvl(&mut self) {
        self.nvl = match self.nvl {
            Some(depth) if depth > 1 => Some(depth - 1),
            Some(_) => {
                debug!("Leaving NVL mode");
                None
            }
            None => None,
        };
    }

    /// Update the context's indent stack for a line and apply what closing
    /// or opening levels implies
    pub(super) fn track_indent(
        &mut self,
        ctx: &mut ParseContext,
        leading: usize,
    ) -> std::result::Result<(), BuildError> {
        let nearest = ctx.indent.nearest_level(leading);
        let before = ctx.indent.depth();
        let change = ctx.indent.update(leading);
        let after = ctx.indent.depth();

        if after > before {
            if let Some(depth) = self.nvl {
                self.nvl = Some(depth + 1);
            }
        }
        for _ in after..before {
            self.pop_nvl();
        }

        if matches!(change, IndentChange::Decrease { .. }) {
            if let Some(block) = ctx.block.take() {
                debug!("{}End of {block:?} block", ctx.location());
            }
        }
        if let Some(call) = ctx.pending_call.take() {
            if after > call.depth {
                ctx.pending_call = Some(call);
            } else {
                debug!("{}Label {} has no content", ctx.location(), call.label);
            }
        }
        self.close_labels(ctx, after)?;

        let validated = ctx.indent.validate();
        if let IndentChange::Decrease { aligned: false, .. } = change {
            return Err(BuildError::InconsistentIndent {
                found: leading,
                nearest,
            });
        }
        validated
    }

    /// Close every open label at `depth` or deeper, adding `return` to
    /// bodies that need one when `auto_return` is on
    pub(super) fn close_labels(
        &mut self,
        ctx: &mut ParseContext,
        depth: usize,
    ) -> std::result::Result<(), BuildError> {
        while ctx.open_labels.last().is_some_and(|label| label.depth >= depth) {
            let Some(label) = ctx.open_labels.pop() else {
                break;
            };
            if self.config.auto_return && label.has_body && !label.terminated {
                debug!("{}Adding return to label body", ctx.location());
                self.write_at(ctx, "return", label.depth + 1)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Write a content line at `depth`, resolving the context's pending
    /// flow-control call first
    pub(super) fn write_at(
        &mut self,
        ctx: &mut ParseContext,
        text: &str,
        depth: usize,
    ) -> std::result::Result<(), BuildError> {
        if let Some(PendingCall { label, .. }) = ctx.pending_call.take() {
            self.flow.record_call(&mut self.router, &label)?;
        }
        let level = self.level(depth);
        self.router.write_line(text, Some(level))?;
        ctx.blank_line = false;

        let terminal = TERMINAL_STATEMENT_RE.is_match(text);
        for label in &mut ctx.open_labels {
            label.has_body = true;
            label.terminated = terminal && depth == label.depth + 1;
        }
        Ok(())
    }

    /// Write a content line at the current line's depth
    pub(super) fn write_content(
        &mut self,
        ctx: &mut ParseContext,
        text: &str,
    ) -> std::result::Result<(), BuildError> {
        let depth = ctx.indent.depth();
        self.write_at(ctx, text, depth)
    }

    /// Write one blank line, collapsing runs of blank lines
    pub(super) fn write_blank(&mut self, ctx: &mut ParseContext) -> std::result::Result<(), BuildError> {
        if ctx.blank_line {
            return Ok(());
        }
        ctx.blank_line = true;
        self.router.write_line("", None)
    }

    /// Write a line exactly as given
    pub(super) fn write_verbatim(
        &mut self,
        ctx: &mut ParseContext,
        text: &str,
    ) -> std::result::Result<(), BuildError> {
        ctx.blank_line = false;
        self.router.write_line(text, None)
    }
}
