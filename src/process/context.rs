/// Per-file parse state
///
/// One [`ParseContext`] exists for every input file currently being read.
/// Contexts form a stack: an import pushes one and drains it before the
/// importer continues.
use std::path::{Path, PathBuf};

use crate::directive::BlockKind;
use crate::format::IndentTracker;

/// Control-file call waiting for the first content line of a label body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    /// Label name as it appears in the control file
    pub label: String,
    /// Depth of the label line
    pub depth: usize,
}

/// A label whose body is still open, for auto-return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenLabel {
    pub depth: usize,
    /// At least one line was written inside the body
    pub has_body: bool,
    /// The last body-level statement was `return` or `jump`
    pub terminated: bool,
}

#[derive(Debug)]
pub struct ParseContext {
    /// Canonical path, used for cycle detection
    pub path: PathBuf,
    /// Short name used in log locations
    pub name: String,
    pub line_number: usize,
    pub indent: IndentTracker,
    /// Active multi-line directive
    pub block: Option<BlockKind>,
    /// Non-local labels declared in this file, in order
    pub label_roots: Vec<String>,
    /// Last line written from this file was blank
    pub blank_line: bool,
    pub pending_call: Option<PendingCall>,
    pub open_labels: Vec<OpenLabel>,
    /// NVL depth of the importer, restored when this file is done
    pub saved_nvl: Option<usize>,
}

impl ParseContext {
    #[must_use]
    pub fn new(path: PathBuf, saved_nvl: Option<usize>) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self {
            path,
            name,
            line_number: 0,
            indent: IndentTracker::new(),
            block: None,
            label_roots: Vec::new(),
            // Leading blank lines of a file are never written
            blank_line: true,
            pending_call: None,
            open_labels: Vec::new(),
            saved_nvl,
        }
    }

    /// Directory imports from this file resolve against
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// `file|line ` prefix for log messages and errors
    #[must_use]
    pub fn location(&self) -> String {
        format!("{}|{} ", self.name, self.line_number)
    }

    /// Qualify a local label (`.name`) with the most recent label root
    #[must_use]
    pub fn qualify(&self, label: &str) -> Option<String> {
        if !label.starts_with('.') {
            return Some(label.to_string());
        }
        self.label_roots.last().map(|root| format!("{root}{label}"))
    }
}
