//! Terminal rendering for calsync results.

use calsync_core::SyncSummary;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for SyncSummary {
    fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "{} items imported, {} items removed locally.",
                self.local_added, self.local_deleted
            ),
            format!(
                "{} items exported, {} items removed from the server.",
                self.remote_added, self.remote_deleted
            ),
        ];

        if !self.warnings.is_empty() {
            let label = format!(
                "{} {} (see above)",
                self.warnings.len(),
                pluralize("warning", self.warnings.len())
            );
            lines.push(label.dimmed().to_string());
        }

        if self.dry_run {
            lines.push("(dry run, nothing was changed)".dimmed().to_string());
        }

        lines.join("\n")
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
