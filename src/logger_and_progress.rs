use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A log::Log implementation which forwards to an inner Log, but hides the transfer progress bar
/// while each message is printed, so that log lines from the stage threads don't leave broken
/// copies of the bar behind them on the terminal.
///
/// The bar itself is owned here and handed out to the pipeline (for the sink stage to advance),
/// so there is only ever the one bar and it is always the one being suspended.
pub struct LoggerAndProgress<InnerLog: log::Log> {
    progress_bar: ProgressBar,
    inner_log: InnerLog,
}

impl<InnerLog: log::Log> LoggerAndProgress<InnerLog> {
    pub fn new(inner_log: InnerLog, progress_bar_visible: bool) -> Self {
        Self {
            inner_log,
            // An invisible bar still accepts updates, so the pipeline code doesn't need to care
            // whether it is shown (e.g. --quiet).
            progress_bar: ProgressBar::with_draw_target(None,
                if progress_bar_visible { ProgressDrawTarget::stderr() } else { ProgressDrawTarget::hidden() }),
        }
    }

    pub fn get_progress_bar(&self) -> &ProgressBar {
        &self.progress_bar
    }

    /// Sets the bar up to show bytes written out of `total_bytes`. If the total isn't known
    /// (e.g. the source is a pipe) then just the count and rate are shown.
    pub fn start_transfer(&self, total_bytes: Option<u64>) {
        let template = match total_bytes {
            Some(t) => {
                self.progress_bar.set_length(t);
                "{bytes}/{total_bytes} {bar:40.green/black} {binary_bytes_per_sec}"
            }
            None => "{spinner} {bytes} {binary_bytes_per_sec}",
        };
        self.progress_bar.set_style(ProgressStyle::with_template(template).expect("Invalid progress template"));
    }

    // Can't be done in Drop, as the logger is leaked so that it lives for the whole program
    pub fn shutdown(&self) {
        self.progress_bar.finish_and_clear()
    }
}

impl<InnerLog: log::Log> log::Log for LoggerAndProgress<InnerLog> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner_log.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        self.progress_bar.suspend(|| self.inner_log.log(record))
    }

    fn flush(&self) {
        self.inner_log.flush()
    }
}
