use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::session::Readouts;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty && self.mode != UiMode::Plain
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = spinner();
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Live count/FPS display for a stream.
    pub fn readouts(&self) -> ReadoutDisplay {
        let spinner = self.use_pretty().then(spinner);
        ReadoutDisplay {
            spinner,
            last_plain: None,
            plain_interval: Duration::from_secs(1),
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

/// Readout text shown to the operator.
pub fn readout_line(count: usize, fps: f64) -> String {
    format!("Objects Detected: {count} | FPS: {fps:.1}")
}

pub struct ReadoutDisplay {
    spinner: Option<ProgressBar>,
    last_plain: Option<Instant>,
    plain_interval: Duration,
}

impl ReadoutDisplay {
    /// Refresh from the session readouts. Plain output is rate limited.
    pub fn update(&mut self, readouts: &Readouts) {
        let line = readout_line(readouts.count(), readouts.fps());
        match &self.spinner {
            Some(spinner) => spinner.set_message(line),
            None => {
                let due = self
                    .last_plain
                    .map_or(true, |at| at.elapsed() >= self.plain_interval);
                if due {
                    eprintln!("{line}");
                    self.last_plain = Some(Instant::now());
                }
            }
        }
    }

    pub fn finish(self, readouts: &Readouts) {
        let line = readout_line(readouts.count(), readouts.fps());
        match self.spinner {
            Some(spinner) => spinner.finish_with_message(line),
            None => eprintln!("{line}"),
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
