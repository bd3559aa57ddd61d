//! Recording progress on the terminal.

use crate::recorder::Progress;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::Cell;
use std::time::Duration;
use tracing::debug;

/// Line shown for a progress event, if any.
pub fn describe(event: &Progress, total_runs: usize) -> Option<String> {
    match event {
        Progress::RecordStart { scenarios, runs } => Some(format!(
            "Recording {} scenario(s) with {} run(s) each...",
            scenarios, runs
        )),
        Progress::Warmup { scenario } => Some(format!("{}: warming up", scenario)),
        Progress::RecordRun { scenario, run } => {
            Some(format!("{}: run {}/{}", scenario, run + 1, total_runs))
        }
        Progress::Navigate { .. } => None,
        Progress::RecordEnd { label } => Some(format!("Saved recording \"{}\"", label)),
    }
}

/// Shows recording progress as a spinner.
pub struct ProgressPrinter {
    bar: ProgressBar,
    runs: Cell<usize>,
}

impl ProgressPrinter {
    /// A printer; hidden ones only log.
    pub fn new(show: bool) -> Self {
        let bar = if show {
            let bar = ProgressBar::new_spinner();
            let style =
                ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}");
            if let Ok(style) = style {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            runs: Cell::new(0),
        }
    }

    pub fn handle(&self, event: &Progress) {
        match event {
            Progress::RecordStart { runs, .. } => {
                self.runs.set(*runs);
                if let Some(line) = describe(event, *runs) {
                    self.bar.println(line);
                }
                self.bar.enable_steady_tick(Duration::from_millis(120));
            }
            Progress::Navigate { url } => debug!("Navigating to {}", url),
            Progress::RecordEnd { .. } => {
                self.bar.finish_and_clear();
                if let Some(line) = describe(event, self.runs.get()) {
                    println!("✅ {}", line);
                }
            }
            _ => {
                if let Some(line) = describe(event, self.runs.get()) {
                    self.bar.set_message(line);
                }
            }
        }
    }

    /// Stop the spinner, e.g. when recording failed.
    pub fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
