//! Progress reporting for scans and loads
//!
//! Spinners are drawn with `indicatif` on stderr. Library callers and tests use
//! the hidden variants, which keep the same API but draw nothing.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::ingest::ScanStatistics;

fn spinner(template: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Progress reporter for a corpus scan
pub struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    /// A visible spinner
    pub fn new() -> Self {
        Self {
            bar: spinner("{spinner:.green} [{elapsed_precise}] {msg}"),
        }
    }

    /// A reporter that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Report the file about to be read
    pub fn file(&self, path: &Path, records: usize) {
        self.bar.set_message(format!(
            "Scanning file: {:<50} | Records processed: {}",
            file_name(path),
            format_number(records as u64)
        ));
    }

    /// Finish with the scan totals
    pub fn finish(&self, statistics: &ScanStatistics) {
        self.bar.finish_with_message(format!(
            "✓ Scan complete. JSON files scanned: {}",
            format_number(statistics.files as u64)
        ));
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress reporter for a staging load
pub struct LoadProgress {
    bar: ProgressBar,
}

impl LoadProgress {
    /// A visible bar; its length is set by [`LoadProgress::start`]
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} files {msg}",
        ) {
            bar.set_style(style.progress_chars("█▓▒░  "));
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// A reporter that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Set the number of documents to process
    pub fn start(&self, total_files: u64) {
        self.bar.set_length(total_files);
    }

    /// Mark a document as done
    pub fn file_done(&self, path: &Path) {
        self.bar.set_message(file_name(path));
        self.bar.inc(1);
    }

    /// Report a warning without disturbing the bar
    pub fn warn(&self, msg: &str) {
        self.bar.println(format!("  ⚠ Warning: {}", msg));
    }

    /// Finish with success message
    pub fn finish_success(&self, msg: &str) {
        self.bar.finish_with_message(format!("✓ {}", msg));
    }

    /// Finish with error message
    pub fn finish_error(&self, msg: &str) {
        self.bar.abandon_with_message(format!("✗ {}", msg));
    }
}

impl Default for LoadProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
