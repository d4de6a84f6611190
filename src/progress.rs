// src/progress.rs

//! Progress tracking for provisioning stages
//!
//! Installation and patching report through the [`ProgressTracker`] trait so
//! the library stays independent of how progress is shown:
//! - `CliProgress`: an indicatif bar for interactive terminals
//! - `LogProgress`: tracing output, for CI logs and redirected output
//! - `SilentProgress`: no-op, for tests and `--json` runs
//!
//! # Example
//!
//! ```
//! use patchbay::progress::{LogProgress, ProgressTracker};
//!
//! let progress = LogProgress::new("patches", 2);
//! progress.set_message("requests/models.py");
//! progress.increment(1);
//! progress.set_message("libx/mod.py");
//! progress.increment(1);
//! progress.finish_with_message("2 applied");
//! assert!(progress.is_finished());
//! ```

use indicatif::ProgressBar;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{info, warn};

/// How a run shows progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// No output
    Silent,
    /// Log lines through tracing
    #[default]
    Log,
    /// Terminal progress bars
    Bar,
}

impl ProgressMode {
    /// Create a tracker for one stage
    pub fn tracker(self, name: &str, length: u64) -> Box<dyn ProgressTracker> {
        match self {
            Self::Silent => Box::new(SilentProgress::with_length(length)),
            Self::Log => Box::new(LogProgress::new(name, length)),
            Self::Bar => Box::new(CliProgress::new(name, length)),
        }
    }
}

/// Core trait for progress tracking
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Increment progress by the given amount
    fn increment(&self, amount: u64);

    /// Set the total (length) of the progress
    fn set_length(&self, length: u64);

    /// Get current position
    fn position(&self) -> u64;

    /// Get total length
    fn length(&self) -> u64;

    /// Finish progress successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Finish progress with an error message
    fn finish_with_error(&self, message: &str);

    /// Check if progress is finished
    fn is_finished(&self) -> bool;
}

/// Silent progress tracker (no-op)
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a known length
    pub fn with_length(length: u64) -> Self {
        Self {
            length: AtomicU64::new(length),
            ..Default::default()
        }
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Logging progress tracker
///
/// Every message and step is logged at info level; stages are short, so
/// there is no interval throttling.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl LogProgress {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length: AtomicU64::new(length),
            finished: AtomicBool::new(false),
        }
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        let position = self.position.load(Ordering::Relaxed);
        let length = self.length.load(Ordering::Relaxed);
        if length > 0 {
            info!("{} [{}/{}]: {}", self.name, position + 1, length, message);
        } else {
            info!("{}: {}", self.name, message);
        }
    }

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        warn!("{}: ERROR - {}", self.name, message);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Terminal progress bar
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new(name: &str, length: u64) -> Self {
        let bar = ProgressBar::new(length);
        bar.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("{prefix:>12.cyan.bold} [{bar:30.green/dim}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("##-"),
        );
        bar.set_prefix(name.to_string());
        Self { bar }
    }
}

impl ProgressTracker for CliProgress {
    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    fn set_length(&self, length: u64) {
        self.bar.set_length(length);
    }

    fn position(&self) -> u64 {
        self.bar.position()
    }

    fn length(&self) -> u64 {
        self.bar.length().unwrap_or(0)
    }

    fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn finish_with_error(&self, message: &str) {
        self.bar.abandon_with_message(format!("failed: {}", message));
    }

    fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_progress() {
        let progress = SilentProgress::with_length(3);

        progress.set_message("common");
        progress.increment(1);
        assert_eq!(progress.position(), 1);
        assert_eq!(progress.length(), 3);

        assert!(!progress.is_finished());
        progress.finish_with_error("server failed");
        assert!(progress.is_finished());
    }

    #[test]
    fn test_log_progress() {
        let progress = LogProgress::new("packages", 2);

        progress.increment(1);
        progress.set_length(4);
        progress.increment(1);
        assert_eq!(progress.position(), 2);
        assert_eq!(progress.length(), 4);

        progress.finish_with_message("complete");
        assert!(progress.is_finished());
    }

    #[test]
    fn test_cli_progress_hidden_bar() {
        let progress = CliProgress {
            bar: ProgressBar::hidden(),
        };
        progress.set_length(2);
        progress.increment(2);
        assert_eq!(progress.position(), 2);
        progress.finish_with_message("done");
        assert!(progress.is_finished());
    }
}
