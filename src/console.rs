//! Operator console.
//!
//! Line-oriented control surface over a [`Session`]: one command per line,
//! a notice for every failure, and the session stays usable afterwards.

use std::io::{BufRead, Write};
use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::Result;

use crate::detect::{DetectionParameters, BLUR_SIZE_RANGE, MIN_AREA_RANGE, THRESHOLD_RANGE};
use crate::ingest::CaptureConfig;
use crate::session::{Mode, Session};
use crate::ui::readout_line;
use crate::OperatorNotice;

pub const HELP: &str = "\
commands:
  load <path>           count objects in an image file
  start | stop | toggle control the live camera
  save <path>           save the last annotated frame (.png, .jpg)
  set min-area <n>      minimum object area, 100-2000
  set threshold <n>     threshold value, 0-255
  set blur <n>          blur kernel size, 1-15 (odd)
  status                show mode, settings and readouts
  help                  show this text
  quit                  stop and exit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setting {
    MinArea,
    Threshold,
    BlurSize,
}

impl Setting {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "min-area" | "min_area" | "area" => Ok(Setting::MinArea),
            "threshold" => Ok(Setting::Threshold),
            "blur" | "blur-size" | "blur_size" => Ok(Setting::BlurSize),
            other => Err(OperatorNotice::invalid_command(format!(
                "unknown setting '{other}' (min-area, threshold, blur)"
            ))
            .into()),
        }
    }

    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            Setting::MinArea => MIN_AREA_RANGE,
            Setting::Threshold => THRESHOLD_RANGE,
            Setting::BlurSize => BLUR_SIZE_RANGE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Setting::MinArea => "min area",
            Setting::Threshold => "threshold",
            Setting::BlurSize => "blur size",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Load(PathBuf),
    Start,
    Stop,
    Toggle,
    Save(PathBuf),
    Set(Setting, i64),
    Status,
    Help,
    Quit,
}

/// Parse one console line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "load" | "open" => Command::Load(path_argument(verb, rest)?),
        "save" => Command::Save(path_argument(verb, rest)?),
        "start" => no_argument(verb, rest, Command::Start)?,
        "stop" => no_argument(verb, rest, Command::Stop)?,
        "toggle" => no_argument(verb, rest, Command::Toggle)?,
        "status" => no_argument(verb, rest, Command::Status)?,
        "help" | "?" => Command::Help,
        "quit" | "exit" => no_argument(verb, rest, Command::Quit)?,
        "set" => {
            let mut parts = rest.split_whitespace();
            let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(
                    OperatorNotice::invalid_command("usage: set <setting> <value>").into(),
                );
            };
            let setting = Setting::parse(&name.to_ascii_lowercase())?;
            let value: i64 = value.parse().map_err(|_| {
                OperatorNotice::invalid_command(format!("'{value}' is not a whole number"))
            })?;
            Command::Set(setting, value)
        }
        other => {
            return Err(OperatorNotice::invalid_command(format!(
                "unknown command '{other}' (try 'help')"
            ))
            .into())
        }
    };
    Ok(Some(command))
}

fn path_argument(verb: &str, rest: &str) -> Result<PathBuf> {
    if rest.is_empty() {
        return Err(OperatorNotice::invalid_command(format!("usage: {verb} <path>")).into());
    }
    Ok(PathBuf::from(rest))
}

fn no_argument(verb: &str, rest: &str, command: Command) -> Result<Command> {
    if !rest.is_empty() {
        return Err(OperatorNotice::invalid_command(format!("'{verb}' takes no arguments")).into());
    }
    Ok(command)
}

/// Clamp `value` into the setting's range and store it. Returns the value that
/// took effect, which for blur size is the odd-coerced one.
pub fn apply_setting(params: &DetectionParameters, setting: Setting, value: i64) -> u32 {
    let range = setting.range();
    let clamped = value.clamp(*range.start() as i64, *range.end() as i64) as u32;
    match setting {
        Setting::MinArea => {
            params.set_min_area(clamped);
            clamped
        }
        Setting::Threshold => {
            let threshold = u8::try_from(clamped).unwrap_or(u8::MAX);
            params.set_threshold(threshold);
            threshold as u32
        }
        Setting::BlurSize => params.set_blur_size(clamped),
    }
}

pub enum Outcome {
    Continue(String),
    Quit,
}

pub struct Console {
    session: Session,
    capture: CaptureConfig,
}

impl Console {
    pub fn new(session: Session, capture: CaptureConfig) -> Self {
        Self { session, capture }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn execute(&mut self, command: Command) -> Result<Outcome> {
        let message = match command {
            Command::Load(path) => {
                let result = self.session.load_image(&path)?;
                format!(
                    "{}: {}",
                    path.display(),
                    readout_line(result.count(), result.fps())
                )
            }
            Command::Start => {
                self.session.start_streaming(&self.capture)?;
                format!("streaming from {}", self.capture.device)
            }
            Command::Stop => {
                self.session.stop_streaming()?;
                "idle".to_string()
            }
            Command::Toggle => match self.session.toggle(&self.capture)? {
                Mode::Streaming => format!("streaming from {}", self.capture.device),
                Mode::Idle => "idle".to_string(),
            },
            Command::Save(path) => {
                let written = self.session.save_last_result(&path)?;
                format!("saved {}", written.display())
            }
            Command::Set(setting, value) => {
                let applied = apply_setting(self.session.params(), setting, value);
                if applied as i64 != value {
                    format!("{} set to {} (requested {})", setting.label(), applied, value)
                } else {
                    format!("{} set to {}", setting.label(), applied)
                }
            }
            Command::Status => self.status(),
            Command::Help => HELP.to_string(),
            Command::Quit => {
                self.session.stop_streaming()?;
                return Ok(Outcome::Quit);
            }
        };
        Ok(Outcome::Continue(message))
    }

    fn status(&self) -> String {
        let params = self.session.params().snapshot();
        let readouts = self.session.readouts();
        let mode = match self.session.mode() {
            Mode::Idle => "idle",
            Mode::Streaming => "streaming",
        };
        format!(
            "mode: {mode}\nmin area: {} | threshold: {} | blur size: {}\n{}",
            params.min_area,
            params.threshold,
            params.blur_size,
            readout_line(readouts.count(), readouts.fps())
        )
    }

    /// Read commands until `quit` or end of input. Failures are written as
    /// `error: ...` lines and do not end the loop.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            let outcome = parse_command(&line).and_then(|command| match command {
                Some(command) => self.execute(command).map(Some),
                None => Ok(None),
            });
            match outcome {
                Ok(Some(Outcome::Continue(message))) => writeln!(output, "{message}")?,
                Ok(Some(Outcome::Quit)) => return Ok(()),
                Ok(None) => {}
                Err(err) => {
                    log::debug!("console command failed: {:#}", err);
                    writeln!(output, "error: {err:#}")?;
                }
            }
            output.flush()?;
        }
        self.session.stop_streaming()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{notice_kind, NoticeKind};

    #[test]
    fn parses_commands() -> Result<()> {
        assert_eq!(
            parse_command("load  photos/coins.jpg ")?,
            Some(Command::Load(PathBuf::from("photos/coins.jpg")))
        );
        assert_eq!(parse_command("TOGGLE")?, Some(Command::Toggle));
        assert_eq!(
            parse_command("set blur 4")?,
            Some(Command::Set(Setting::BlurSize, 4))
        );
        assert_eq!(
            parse_command("set min-area -5")?,
            Some(Command::Set(Setting::MinArea, -5))
        );
        assert_eq!(parse_command("   ")?, None);
        assert_eq!(parse_command("# comment")?, None);
        Ok(())
    }

    #[test]
    fn rejects_bad_input() {
        for line in [
            "explode",
            "load",
            "save",
            "start now",
            "set blur",
            "set blur x",
            "set speed 3",
            "set blur 3 4",
        ] {
            let err = parse_command(line).unwrap_err();
            assert_eq!(notice_kind(&err), Some(NoticeKind::InvalidCommand), "{line}");
        }
    }

    #[test]
    fn settings_are_clamped() {
        let params = DetectionParameters::default();
        assert_eq!(apply_setting(&params, Setting::MinArea, 5), 100);
        assert_eq!(apply_setting(&params, Setting::MinArea, 5000), 2000);
        assert_eq!(apply_setting(&params, Setting::Threshold, 300), 255);
        assert_eq!(apply_setting(&params, Setting::Threshold, -1), 0);
        assert_eq!(apply_setting(&params, Setting::BlurSize, 4), 5);
        assert_eq!(apply_setting(&params, Setting::BlurSize, 16), 15);
        assert_eq!(apply_setting(&params, Setting::BlurSize, 0), 1);
        assert_eq!(params.snapshot().min_area, 2000);
        assert_eq!(params.snapshot().blur_size, 1);
    }

    #[test]
    fn run_reports_errors_and_continues() -> Result<()> {
        let session = Session::headless(DetectionParameters::default());
        let mut console = Console::new(session, CaptureConfig::default());
        let script = "bogus\nsave out.png\nset min-area 700\nstatus\nquit\nstatus\n";
        let mut output = Vec::new();
        console.run(script.as_bytes(), &mut output)?;

        let output = String::from_utf8(output)?;
        assert!(output.contains("error: INVALID_COMMAND"));
        assert!(output.contains("error: SAVE_FAILED"));
        assert!(output.contains("min area set to 700"));
        assert!(output.contains("mode: idle"));
        // Nothing runs after quit.
        assert_eq!(output.matches("mode: idle").count(), 1);
        Ok(())
    }
}
