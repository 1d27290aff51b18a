//! Terminal spinner shown while chapters download
//!
//! The spinner ticks on indicatif's own thread; nothing else shares its
//! state. A hidden spinner is used for quiet runs and tests.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Start/stop wrapper around an indicatif spinner
pub struct Progress {
    visible: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl Progress {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            bar: Mutex::new(None),
        }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Starts the spinner with a message, replacing any running one
    pub fn start(&self, message: impl Into<String>) {
        let bar = if self.visible {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(TICK_INTERVAL);
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(message.into());

        if let Some(previous) = self.lock().replace(bar) {
            previous.finish_and_clear();
        }
    }

    /// Stops and clears the spinner; does nothing when it is not running
    pub fn stop(&self) {
        if let Some(bar) = self.lock().take() {
            bar.finish_and_clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        // a poisoned spinner is still safe to clear
        self.bar.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.stop();
    }
}
