//! Application UI. For now, this is a spinner while we wait on the backend.
//!
//! This is adapted from `substudy` by Eric Kidd, which is licensed under
//! Apache-2.0 OR MIT. Used with permission.

use std::{io, sync::Arc, time::Duration};

#[cfg(test)]
use indicatif::ProgressDrawTarget;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Application UI state.
#[derive(Clone)]
pub struct Ui {
    /// Our spinners. Log output suspends these while it writes.
    multi_progress: Arc<MultiProgress>,
}

impl Ui {
    /// Create a new UI.
    pub fn init() -> Ui {
        let multi_progress = Arc::new(MultiProgress::new());
        Ui { multi_progress }
    }

    /// Create a new UI for unit tests.
    #[cfg(test)]
    pub fn init_for_tests() -> Ui {
        let multi_progress =
            Arc::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()));
        Ui { multi_progress }
    }

    /// Get a writer than can be used to write to stderr, for use with `tracing`
    /// and other output code.
    pub fn get_stderr_writer(&self) -> SafeStderrWriter {
        SafeStderrWriter { ui: self.clone() }
    }

    /// Get a reference to our progress bars.
    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi_progress
    }

    /// Create a new spinner with default settings. The spinner is cleared
    /// when the returned [`Spinner`] is dropped, so early returns and errors
    /// can't leave it running.
    pub fn new_spinner(&self, config: &ProgressConfig<'_>) -> Spinner {
        let sp = ProgressBar::new_spinner().with_style(default_spinner_style());
        let sp = self.multi_progress.add(sp);
        #[cfg(test)]
        sp.set_draw_target(ProgressDrawTarget::hidden());
        sp.set_prefix(config.emoji.to_owned());
        sp.set_message(config.msg.to_owned());
        sp.enable_steady_tick(Duration::from_millis(120));
        Spinner {
            bar: sp,
            done_msg: config.done_msg.to_owned(),
        }
    }
}

/// Configuration for a spinner.
pub struct ProgressConfig<'a> {
    /// Emoji to display in the spinner.
    pub emoji: &'a str,
    /// Message to display while we wait.
    pub msg: &'a str,
    /// Message to display when we're done.
    pub done_msg: &'a str,
}

fn default_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner} {prefix:3}{msg}")
        .expect("bad progress bar template")
}

/// A running spinner, for a request that is in flight.
pub struct Spinner {
    bar: ProgressBar,
    done_msg: String,
}

impl Spinner {
    /// Mark our work as successfully done.
    pub fn finish(self) {
        self.bar.finish_with_message(self.done_msg.clone());
    }

    /// Is the spinner still running?
    #[cfg(test)]
    fn is_running(&self) -> bool {
        !self.bar.is_finished()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

/// A writer which can used to write to `stderr`. It will hide and show progress
/// bars as needed, so that they don't interfere with the output.
#[derive(Clone)]
pub struct SafeStderrWriter {
    ui: Ui,
}

// The `tracing-indicatif` crate suggests that we should implement the following
// methods.
impl io::Write for SafeStderrWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ui.multi_progress().suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ui.multi_progress().suspend(|| io::stderr().flush())
    }

    fn write_vectored(&mut self, bufs: &[io::IoSlice<'_>]) -> io::Result<usize> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_vectored(bufs))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_all(buf))
    }

    fn write_fmt(&mut self, fmt: std::fmt::Arguments<'_>) -> io::Result<()> {
        self.ui
            .multi_progress()
            .suspend(|| io::stderr().write_fmt(fmt))
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SafeStderrWriter {
    type Writer = SafeStderrWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: ProgressConfig<'static> = ProgressConfig {
        emoji: "🔍",
        msg: "Reading formula",
        done_msg: "Read formula",
    };

    #[test]
    fn spinner_stops_when_dropped() {
        let ui = Ui::init_for_tests();
        let spinner = ui.new_spinner(&CONFIG);
        let bar = spinner.bar.clone();
        assert!(spinner.is_running());
        drop(spinner);
        assert!(bar.is_finished());
    }

    #[test]
    fn spinner_finishes_with_done_message() {
        let ui = Ui::init_for_tests();
        let spinner = ui.new_spinner(&CONFIG);
        let bar = spinner.bar.clone();
        spinner.finish();
        assert!(bar.is_finished());
        assert_eq!(bar.message(), "Read formula");
    }
}
