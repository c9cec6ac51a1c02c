/// Run statistics, logged when a run completes
use std::time::Duration;

use log::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub input_files: usize,
    pub input_lines: usize,
    pub output_files: usize,
    pub output_lines: usize,
    pub directives: usize,
    pub rules_registered: usize,
    pub line_replacements: usize,
    pub prefix_replacements: usize,
    pub narration_lines: usize,
    pub labels: usize,
    pub control_calls: usize,
    /// Errors logged and skipped with `abort_on_error = false`
    pub errors: usize,
    pub elapsed: Duration,
}

impl Stats {
    pub fn log_summary(&self) {
        info!(
            "Read {} lines from {} file(s), wrote {} lines to {} file(s) in {:.3}s",
            self.input_lines,
            self.input_files,
            self.output_lines,
            self.output_files,
            self.elapsed.as_secs_f64()
        );
        info!(
            "{} directives, {} rules, {} line replacements, {} dialogue lines, {} narration lines",
            self.directives,
            self.rules_registered,
            self.line_replacements,
            self.prefix_replacements,
            self.narration_lines
        );
        info!(
            "{} labels, {} flow control calls",
            self.labels, self.control_calls
        );
        if self.errors > 0 {
            info!("{} errors were skipped", self.errors);
        }
    }
}
