//! objcount - count objects in images and live camera feeds
//!
//! Subcommands:
//! - `count`: one still image, print the count, optionally save the overlay
//! - `stream`: live camera with running readouts until Ctrl-C
//! - `console`: interactive operator console on stdin

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use object_counter::console::{apply_setting, Console, Setting};
use object_counter::ui::{readout_line, Ui};
use object_counter::{
    CounterConfig, DetectionParameters, Mode, NullSurface, PreviewFileSurface, RenderSurface,
    Session,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// UI mode for stderr readouts (auto|plain|pretty)
    #[arg(long, global = true, default_value = "auto", value_name = "MODE")]
    ui: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count objects in a still image.
    Count {
        /// Image file (PNG, JPEG, BMP).
        image: PathBuf,
        /// Save the annotated frame here (.png, .jpg).
        #[arg(long)]
        save: Option<PathBuf>,
        #[command(flatten)]
        detection: DetectionArgs,
    },
    /// Count objects on a live camera until Ctrl-C.
    Stream {
        /// Device index, device path, or stub://<name>.
        #[arg(long)]
        device: Option<String>,
        /// Stop after this many frames.
        #[arg(long)]
        frames: Option<u64>,
        /// Keep this image file updated with the annotated stream.
        #[arg(long)]
        preview: Option<PathBuf>,
        /// Save the last annotated frame here on exit.
        #[arg(long)]
        save: Option<PathBuf>,
        #[command(flatten)]
        detection: DetectionArgs,
    },
    /// Interactive console reading commands from stdin.
    Console {
        /// Device index, device path, or stub://<name>.
        #[arg(long)]
        device: Option<String>,
        /// Keep this image file updated with every annotated frame.
        #[arg(long)]
        preview: Option<PathBuf>,
        #[command(flatten)]
        detection: DetectionArgs,
    },
}

#[derive(Args, Debug)]
struct DetectionArgs {
    /// Minimum object area in pixels (100-2000).
    #[arg(long)]
    min_area: Option<i64>,
    /// Threshold value (0-255).
    #[arg(long)]
    threshold: Option<i64>,
    /// Blur kernel size, odd (1-15).
    #[arg(long)]
    blur: Option<i64>,
}

impl DetectionArgs {
    fn apply(&self, params: &DetectionParameters) {
        let overrides = [
            (Setting::MinArea, self.min_area),
            (Setting::Threshold, self.threshold),
            (Setting::BlurSize, self.blur),
        ];
        for (setting, value) in overrides {
            if let Some(value) = value {
                let applied = apply_setting(params, setting, value);
                if applied as i64 != value {
                    log::warn!("{} {} adjusted to {}", setting.label(), value, applied);
                }
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let ui = Ui::from_args(Some(&cli.ui), std::io::stderr().is_terminal());
    let mut config = CounterConfig::load()?;

    match cli.command {
        Command::Count {
            image,
            save,
            detection,
        } => {
            let params = config.parameters();
            detection.apply(&params);
            let mut session = Session::headless(params);
            let result = {
                let _stage = ui.stage("Detect objects");
                session.load_image(&image)?
            };
            println!("{}", readout_line(result.count(), result.fps()));
            if let Some(path) = save {
                let written = session.save_last_result(&path)?;
                log::info!("annotated frame written to {}", written.display());
            }
        }
        Command::Stream {
            device,
            frames,
            preview,
            save,
            detection,
        } => {
            if let Some(device) = device {
                config.capture.device = device;
            }
            config.capture.frame_limit = frames;
            let params = config.parameters();
            detection.apply(&params);
            let surface = make_surface(preview.or(config.render.preview_path.clone()), &config);
            let mut session = Session::new(params, surface);

            let (tx, rx) = mpsc::channel();
            ctrlc::set_handler(move || {
                let _ = tx.send(());
            })
            .map_err(|e| anyhow!("error setting Ctrl-C handler: {e}"))?;

            session.start_streaming(&config.capture)?;
            log::info!("objcount streaming. press Ctrl-C to stop");
            let mut display = ui.readouts();
            loop {
                display.update(session.readouts());
                if session.mode() == Mode::Idle {
                    break;
                }
                if frames.is_some_and(|limit| session.readouts().frames_processed() >= limit) {
                    break;
                }
                match rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                        log::info!("shutdown signal received, stopping capture...");
                        break;
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }
            }
            session.stop_streaming()?;
            display.finish(session.readouts());

            if let Some(path) = save {
                let written = session.save_last_result(&path)?;
                log::info!("last annotated frame written to {}", written.display());
            }
        }
        Command::Console {
            device,
            preview,
            detection,
        } => {
            if let Some(device) = device {
                config.capture.device = device;
            }
            let params = config.parameters();
            detection.apply(&params);
            let surface = make_surface(preview.or(config.render.preview_path.clone()), &config);
            let session = Session::new(params, surface);
            let mut console = Console::new(session, config.capture.clone());
            eprintln!("objcount console. type 'help' for commands");
            console.run(std::io::stdin().lock(), std::io::stdout())?;
        }
    }

    Ok(())
}

fn make_surface(preview: Option<PathBuf>, config: &CounterConfig) -> Box<dyn RenderSurface> {
    match preview {
        Some(path) => {
            let surface = PreviewFileSurface::new(path, config.render.viewport);
            log::info!("preview written to {}", surface.path().display());
            Box::new(surface)
        }
        None => Box::new(NullSurface),
    }
}
