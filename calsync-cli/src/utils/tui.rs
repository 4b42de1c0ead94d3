use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// The spinner currently on screen, if any. Log output hides it while a
/// line is written.
static ACTIVE_SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

pub fn create_spinner(message: String) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["-", "\\", "|", "/", "-"])
        .template("{msg} {spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(style);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));

    if let Ok(mut active) = ACTIVE_SPINNER.lock() {
        *active = Some(spinner.clone());
    }
    spinner
}

pub fn finish_spinner(spinner: ProgressBar) {
    spinner.finish_and_clear();
    if let Ok(mut active) = ACTIVE_SPINNER.lock() {
        *active = None;
    }
}

fn active_spinner() -> Option<ProgressBar> {
    ACTIVE_SPINNER.lock().ok().and_then(|active| active.clone())
}

/// Stderr for the log subscriber. Each write clears the spinner line first
/// and redraws the spinner below the written text.
pub struct SpinnerAwareStderr;

impl Write for SpinnerAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let write_all = || io::stderr().write_all(buf).map(|()| buf.len());
        match active_spinner() {
            Some(spinner) => spinner.suspend(write_all),
            None => write_all(),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
