//! Terminal output
//!
//! Renders pipeline progress as one line per stage.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use cosmic_core::{Reporter, Stage};
use crossterm::style::Stylize;

/// Console implementation of [`Reporter`].
///
/// Stage and info lines go to stdout and are dropped in quiet mode. Failures
/// always go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
    lock: Mutex<()>,
}

impl ConsoleReporter {
    /// Create a reporter, optionally suppressing progress lines.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            lock: Mutex::new(()),
        }
    }

    fn line(&self, text: &str) {
        if self.quiet {
            return;
        }
        let _guard = self.lock.lock();
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{text}");
    }
}

/// Right-align a status label to the width of the widest stage name.
pub fn label(text: &str) -> String {
    format!("{text:>12}")
}

impl Reporter for ConsoleReporter {
    fn stage(&self, name: &str, stage: Stage) {
        self.line(&format!("{} {name}", label(&stage.to_string()).cyan().bold()));
    }

    fn info(&self, msg: &str) {
        self.line(&format!("{} {}", label(""), msg.dark_grey()));
    }

    fn done(&self, name: &str, version: &str, entry_points: &[PathBuf]) {
        self.line(&format!(
            "{} {} {}",
            label("Installed").green().bold(),
            name.bold(),
            version.dark_grey()
        ));
        for path in entry_points {
            self.line(&format!("{} {}", label(""), path.display()));
        }
    }

    fn failed(&self, name: &str, reason: &str) {
        let _guard = self.lock.lock();
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{} {name}: {reason}", label("Failed").red().bold());
    }
}
