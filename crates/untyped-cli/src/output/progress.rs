//! Progress line for a scan run.
//!
//! Renders a single self-overwriting status line on stderr as references
//! complete.

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use untyped_core::types::PackageRef;
use untyped_engine::{Outcome, ProgressObserver, RunStats};

struct ProgressState {
    total: u64,
    current: u64,
    untyped: u64,
    last_update: Option<Instant>,
}

/// Progress bar drawn on stderr
pub struct ProgressBar {
    state: Mutex<ProgressState>,
    start_time: Instant,
    message: String,
}

impl ProgressBar {
    /// Create a new progress bar
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(ProgressState {
                total: 0,
                current: 0,
                untyped: 0,
                last_update: None,
            }),
            start_time: Instant::now(),
            message: message.into(),
        }
    }

    fn draw(&self, state: &ProgressState) {
        let line = render_line(
            &self.message,
            state.current,
            state.total,
            state.untyped,
            self.start_time.elapsed(),
        );
        let mut stderr = io::stderr().lock();
        // A closed stderr only loses the progress line
        let _ = write!(stderr, "\r{}", line);
        let _ = stderr.flush();
    }
}

impl ProgressObserver for ProgressBar {
    fn on_start(&self, total: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.total = total as u64;
        }
    }

    fn on_complete(&self, _package: &PackageRef, outcome: Outcome) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.current += 1;
        if outcome.is_untyped() {
            state.untyped += 1;
        }

        // Only update display every 100ms to avoid flickering
        let now = Instant::now();
        let due = state
            .last_update
            .map_or(true, |last| now.duration_since(last) > Duration::from_millis(100));
        if due || state.current == state.total {
            self.draw(&state);
            state.last_update = Some(now);
        }
    }

    fn on_finish(&self, _stats: &RunStats) {
        if let Ok(state) = self.state.lock() {
            self.draw(&state);
        }
        eprintln!();
    }
}

/// Render one progress line
pub fn render_line(message: &str, current: u64, total: u64, untyped: u64, elapsed: Duration) -> String {
    let percentage = if total > 0 { (current * 100) / total } else { 0 };

    let secs = elapsed.as_secs();
    let rate = if secs > 0 { current / secs } else { 0 };

    format!(
        "{} [{}/{}] {}% ({}/s, {} untyped)",
        message, current, total, percentage, rate, untyped
    )
}
