//! Output routing
//!
//! Every generated line goes through [`OutputRouter`]. It owns the table of
//! open output handles keyed by resolved path, so redirecting to a file that
//! was written earlier appends to the same handle instead of truncating it.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::BuildError;

/// Spaces emitted per logical indentation level
pub const INDENT_WIDTH: usize = 4;

/// Where output handles live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Real files, parent directories created on demand
    Disk,
    /// In-memory buffers, read back with [`OutputRouter::contents`]
    Memory,
}

#[derive(Debug)]
enum Sink {
    Disk(BufWriter<File>),
    Memory(Vec<u8>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Disk(w) => w.write(buf),
            Sink::Memory(v) => v.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Disk(w) => w.flush(),
            Sink::Memory(_) => Ok(()),
        }
    }
}

/// Lexically absolute form of `path`; never touches the filesystem
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug)]
pub struct OutputRouter {
    backend: Backend,
    /// Directory relative output paths are resolved against
    base_dir: PathBuf,
    /// Directory bare output file names land in
    output_dir: PathBuf,
    handles: HashMap<PathBuf, Sink>,
    /// Paths in the order they were opened
    opened: Vec<PathBuf>,
    /// Name of the current output target
    target: Option<String>,
    /// Resolved handle key for the current target, once opened
    current: Option<PathBuf>,
    lines_written: usize,
}

impl OutputRouter {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            base_dir: PathBuf::new(),
            output_dir: PathBuf::from("."),
            handles: HashMap::new(),
            opened: Vec::new(),
            target: None,
            current: None,
            lines_written: 0,
        }
    }

    /// Set the directory relative paths resolve against (the master input's)
    pub fn set_base_dir(&mut self, dir: &Path) {
        self.base_dir = dir.to_path_buf();
    }

    /// Set the output directory used for files opened from now on
    pub fn set_output_dir(&mut self, dir: &Path) {
        self.output_dir = dir.to_path_buf();
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        absolute(&self.base_dir.join(&self.output_dir))
    }

    /// Name of the current output target, if one was selected
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Redirect subsequent writes to `name`. The previous target stays open.
    pub fn set_target(&mut self, name: &str) {
        debug!("Setting next output file to {name}");
        self.target = Some(name.to_string());
        self.current = None;
    }

    /// Resolve an output name to the path used as its handle key.
    ///
    /// Bare file names land in the output directory; other relative paths
    /// resolve against the base directory.
    #[must_use]
    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        let is_bare = path
            .parent()
            .map_or(true, |parent| parent.as_os_str().is_empty());
        if path.is_absolute() {
            absolute(path)
        } else if is_bare {
            absolute(&self.base_dir.join(&self.output_dir).join(path))
        } else {
            absolute(&self.base_dir.join(path))
        }
    }

    /// Open (or reuse) the handle for `name`, returning its key
    pub fn open(&mut self, name: &str) -> Result<PathBuf, BuildError> {
        let path = self.resolve(name);
        if self.handles.contains_key(&path) {
            return Ok(path);
        }

        let sink = match self.backend {
            Backend::Memory => Sink::Memory(Vec::new()),
            Backend::Disk => {
                if let Some(parent) = path.parent() {
                    if !parent.is_dir() {
                        debug!("Creating directory {}", parent.display());
                        std::fs::create_dir_all(parent).map_err(|source| {
                            BuildError::OutputDirectory {
                                path: parent.to_path_buf(),
                                source,
                            }
                        })?;
                    }
                }
                let file = File::create(&path).map_err(|e| BuildError::io(&path, e))?;
                Sink::Disk(BufWriter::new(file))
            }
        };

        info!("Opening new file {} in WRITE mode", path.display());
        self.handles.insert(path.clone(), sink);
        self.opened.push(path.clone());
        Ok(path)
    }

    /// Key of the current target's handle, opening it on first use
    fn current_handle(&mut self) -> Result<PathBuf, BuildError> {
        if let Some(path) = &self.current {
            return Ok(path.clone());
        }
        let name = self
            .target
            .clone()
            .unwrap_or_else(|| "script.rpy".to_string());
        let path = self.open(&name)?;
        self.current = Some(path.clone());
        Ok(path)
    }

    /// Write one line to the current target.
    ///
    /// With `level`, each physical line is stripped and indented by that many
    /// levels, and literal `\n` sequences in lines not ending with a quote
    /// become line breaks. Without it the line is written verbatim.
    pub fn write_line(&mut self, line: &str, level: Option<usize>) -> Result<(), BuildError> {
        let path = self.current_handle()?;
        self.write_line_to(&path, line, level)
    }

    /// Write one line to an already opened handle
    pub fn write_line_to(
        &mut self,
        path: &Path,
        line: &str,
        level: Option<usize>,
    ) -> Result<(), BuildError> {
        let text = match level {
            None => format!("{line}\n"),
            Some(level) => {
                let expanded = if !line.is_empty() && !line.ends_with('"') {
                    line.replace("\\n", "\n")
                } else {
                    line.to_string()
                };
                let indent = " ".repeat(level * INDENT_WIDTH);
                let mut text = String::with_capacity(expanded.len() + indent.len() + 1);
                for part in expanded.split('\n') {
                    let part = part.trim();
                    if !part.is_empty() {
                        text.push_str(&indent);
                        text.push_str(part);
                    }
                    text.push('\n');
                }
                text
            }
        };

        let sink = self.handles.get_mut(path).ok_or_else(|| {
            BuildError::io(path, io::Error::new(io::ErrorKind::NotFound, "output not open"))
        })?;
        sink.write_all(text.as_bytes())
            .map_err(|e| BuildError::io(path, e))?;
        self.lines_written += text.matches('\n').count();
        Ok(())
    }

    /// Paths of every opened output, in opening order
    #[must_use]
    pub fn opened(&self) -> &[PathBuf] {
        &self.opened
    }

    #[must_use]
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Contents written so far to an in-memory output
    #[must_use]
    pub fn contents(&self, name: &str) -> Option<String> {
        match self.handles.get(&self.resolve(name))? {
            Sink::Memory(buf) => Some(String::from_utf8_lossy(buf).into_owned()),
            Sink::Disk(_) => None,
        }
    }

    /// Flush every open handle. Handles stay registered so a finished
    /// in-memory run can still be inspected.
    pub fn flush_all(&mut self) -> Result<(), BuildError> {
        let mut first_error = None;
        for path in &self.opened {
            if let Some(sink) = self.handles.get_mut(path) {
                if let Err(e) = sink.flush() {
                    first_error.get_or_insert(BuildError::io(path, e));
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
