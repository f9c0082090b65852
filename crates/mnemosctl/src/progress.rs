//! Busy indicator shown while a request is in flight
//!
//! Spinner on stderr only when stderr is a terminal and `NO_COLOR` is unset,
//! so piped output and tests see nothing. Timing works either way.

use indicatif::{ProgressBar, ProgressStyle};
use mnemos_common::render::color_enabled;
use std::future::Future;
use std::time::{Duration, Instant};

const TICK_MS: u64 = 80;

pub struct BusyIndicator {
    spinner: Option<ProgressBar>,
    started: Instant,
}

impl BusyIndicator {
    pub fn start(message: &str) -> Self {
        let enabled = color_enabled(&std::io::stderr());

        let spinner = enabled.then(|| {
            let pb = ProgressBar::new_spinner();
            let style = ProgressStyle::default_spinner()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
                .template("{spinner} {msg} {elapsed:.dim}");
            if let Ok(style) = style {
                pb.set_style(style);
            }
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(TICK_MS));
            pb
        });

        Self {
            spinner,
            started: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.spinner.is_some()
    }

    /// Clear the spinner line and return the elapsed time
    pub fn finish(mut self) -> Duration {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        self.started.elapsed()
    }
}

impl Drop for BusyIndicator {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Run `fut` with a spinner showing `message`
pub async fn with_busy<F: Future>(message: &str, fut: F) -> F::Output {
    let busy = BusyIndicator::start(message);
    let output = fut.await;
    let elapsed = busy.finish();
    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "{} done", message);
    output
}
