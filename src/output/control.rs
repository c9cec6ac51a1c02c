/// Flow-control file emitter
///
/// Builds `control.rpy`: a single `_control_` label calling every label
/// that produced content, in the order their first content line was
/// written. The file is only created once the first call is recorded.
use std::path::PathBuf;

use log::debug;

use super::router::OutputRouter;
use crate::error::BuildError;

/// File name of the generated control file
pub const CONTROL_FILE: &str = "control.rpy";

/// Entry label of the control file
pub const CONTROL_LABEL: &str = "_control_";

#[derive(Debug, Default)]
pub struct FlowControl {
    /// Handle key of the control file once created
    path: Option<PathBuf>,
    /// Labels called so far
    calls: Vec<String>,
    closed: bool,
}

impl FlowControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `call <label>` to the control file, creating it on first use
    pub fn record_call(&mut self, router: &mut OutputRouter, label: &str) -> Result<(), BuildError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => {
                let path = router.open(CONTROL_FILE)?;
                router.write_line_to(&path, &format!("label {CONTROL_LABEL}:"), None)?;
                self.path = Some(path.clone());
                path
            }
        };
        debug!("Adding label call to control file: {label}");
        router.write_line_to(&path, &format!("    call {label}"), None)?;
        self.calls.push(label.to_string());
        Ok(())
    }

    /// Close the control label with `return`. Does nothing if no call was
    /// ever recorded or the file was already closed.
    pub fn finish(&mut self, router: &mut OutputRouter) -> Result<(), BuildError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match &self.path {
            Some(path) => router.write_line_to(path, "    return", None),
            None => Ok(()),
        }
    }

    /// Labels called, in emission order
    #[must_use]
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    #[cfg(test)]
    fn is_created(&self) -> bool {
        self.path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::router::Backend;

    #[test]
    fn test_control_file_layout() {
        let mut router = OutputRouter::new(Backend::Memory);
        let mut control = FlowControl::new();
        control.record_call(&mut router, "start").unwrap();
        control.record_call(&mut router, "chapter1.intro").unwrap();
        control.finish(&mut router).unwrap();
        control.finish(&mut router).unwrap();

        assert_eq!(
            router.contents(CONTROL_FILE).unwrap(),
            "label _control_:\n    call start\n    call chapter1.intro\n    return\n"
        );
        assert_eq!(control.calls(), ["start", "chapter1.intro"]);
    }

    #[test]
    fn test_control_file_is_lazy() {
        let mut router = OutputRouter::new(Backend::Memory);
        let mut control = FlowControl::new();
        control.finish(&mut router).unwrap();
        assert!(!control.is_created());
        assert!(router.contents(CONTROL_FILE).is_none());
    }
}
