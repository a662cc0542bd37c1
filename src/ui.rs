//! Stage progress on stderr for the command-line tools.
//!
//! On a terminal each stage gets a spinner; otherwise a plain `==> stage`
//! line is printed when it starts and a check line when it ends.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::pipeline::{RunReport, RunState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl FromStr for UiMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "auto" => Ok(UiMode::Auto),
            "plain" => Ok(UiMode::Plain),
            "pretty" => Ok(UiMode::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown ui mode '{}' (expected auto|plain|pretty)",
                other
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    /// Unknown flag values fall back to `Auto`.
    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = ui_flag
            .and_then(|flag| flag.parse().ok())
            .unwrap_or(UiMode::Auto);
        Self::new(mode, is_tty, disable_pretty)
    }

    fn pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// One-line summary of a finished run.
    pub fn report(&self, report: &RunReport) {
        eprintln!("{}", report_line(report));
    }
}

fn report_line(report: &RunReport) -> String {
    let outcome = match report.final_state {
        RunState::Drained => "completed",
        RunState::Interrupted => "interrupted",
    };
    format!(
        "run {}: {} frames, {} processed, {} dropped",
        outcome, report.frames_seen, report.frames_processed, report.frames_dropped
    )
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
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_requires_a_terminal() {
        assert!(!Ui::new(UiMode::Pretty, false, false).pretty());
        assert!(Ui::new(UiMode::Pretty, true, true).pretty());
        assert!(!Ui::new(UiMode::Auto, true, true).pretty());
        assert!(!Ui::new(UiMode::Plain, true, false).pretty());
    }

    #[test]
    fn unknown_flag_falls_back_to_auto() {
        assert_eq!(Ui::from_args(Some("fancy"), true, false).mode, UiMode::Auto);
        assert_eq!(Ui::from_args(Some("plain"), true, false).mode, UiMode::Plain);
        assert!("fancy".parse::<UiMode>().is_err());
    }

    #[test]
    fn durations_switch_units_at_one_second() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn report_line_names_outcome() {
        let report = RunReport {
            final_state: RunState::Interrupted,
            frames_seen: 4,
            frames_processed: 3,
            frames_dropped: 1,
        };
        assert_eq!(
            report_line(&report),
            "run interrupted: 4 frames, 3 processed, 1 dropped"
        );
    }
}
