//! Terminal output for command status and errors.

use crate::app::host::Reporter;

/// Prints status lines to stdout and errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalReporter {
    quiet: bool,
}

impl TerminalReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Reporter for TerminalReporter {
    fn status(&self, message: &str) {
        tracing::info!(text = message, "status reported");
        if !self.quiet {
            println!("{message}");
        }
    }

    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}
