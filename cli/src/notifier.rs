//! Notices for the human behind the editor.
//!
//! Editors show a language server's stderr in an output pane, so that is
//! where status lines, warnings and prompts go. Each notice is also logged.

use std::io::{self, Write};
use std::path::PathBuf;

use ers_runtime::{Notifier, Remediation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weight {
    Status,
    Warning,
    Prompt,
}

#[derive(Debug, Clone, Default)]
pub struct StderrNotifier {
    /// Config file named by the "open settings" remediation.
    settings: Option<PathBuf>,
}

impl StderrNotifier {
    pub fn new(settings: Option<PathBuf>) -> Self {
        Self { settings }
    }

    fn render(&self, weight: Weight, message: &str, remediation: Option<Remediation>) -> String {
        let mut line = match weight {
            Weight::Status => format!("ers: {message}"),
            Weight::Warning => format!("ers: warning: {message}"),
            Weight::Prompt => format!("ers: error: {message}"),
        };
        if let Some(remediation) = remediation {
            line.push_str(&format!(" [{}", remediation.label()));
            if let Some(path) = &self.settings {
                line.push_str(&format!(": {}", path.display()));
            }
            line.push(']');
        }
        line
    }

    fn emit(&self, weight: Weight, message: &str, remediation: Option<Remediation>) {
        let line = self.render(weight, message, remediation);
        // Nowhere left to report a broken stderr.
        let _ = writeln!(io::stderr().lock(), "{line}");
    }
}

impl Notifier for StderrNotifier {
    fn status(&self, message: &str) {
        tracing::info!("{message}");
        self.emit(Weight::Status, message, None);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
        self.emit(Weight::Warning, message, None);
    }

    fn prompt(&self, message: &str, remediation: Remediation) {
        tracing::error!(remediation = remediation.label(), "{message}");
        self.emit(Weight::Prompt, message, Some(remediation));
    }
}
