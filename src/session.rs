//! Acquisition session.
//!
//! A `Session` owns everything the operator can act on: detection parameters,
//! the count/throughput readouts, the last annotated frame and, while
//! streaming, the worker thread that owns the capture device.
//!
//! States:
//! - `Idle`: no device held. `load_image` runs the pipeline once.
//! - `Streaming`: a worker pulls frames until stopped, the source ends, or a
//!   read fails. The device is released on every exit path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::annotate::annotate;
use crate::detect::{count_objects, DetectionParameters, DetectionResult};
use crate::frame::{to_working_resolution, Frame, LastFrameSlot};
use crate::ingest::{load_frame, CaptureConfig, CaptureSource};
use crate::render::{NullSurface, RenderSurface};
use crate::storage::save_frame;
use crate::OperatorNotice;

/// Pause between live iterations.
const FRAME_YIELD: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Streaming,
}

/// Latest count and throughput, readable from any thread.
#[derive(Debug, Default)]
pub struct Readouts {
    count: AtomicUsize,
    fps_bits: AtomicU64,
    frames_processed: AtomicU64,
}

impl Readouts {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn fps(&self) -> f64 {
        f64::from_bits(self.fps_bits.load(Ordering::SeqCst))
    }

    /// Frames that completed a full cycle since the session was created.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::SeqCst)
    }

    fn record(&self, result: &DetectionResult) {
        self.count.store(result.count(), Ordering::SeqCst);
        self.fps_bits.store(result.fps().to_bits(), Ordering::SeqCst);
        self.frames_processed.fetch_add(1, Ordering::SeqCst);
    }
}

type SharedSurface = Arc<Mutex<Box<dyn RenderSurface>>>;

/// State shared between the interactive thread and the worker.
#[derive(Clone)]
struct Shared {
    params: Arc<DetectionParameters>,
    readouts: Arc<Readouts>,
    last_frame: LastFrameSlot,
    surface: SharedSurface,
}

impl Shared {
    /// One acquisition cycle: resize, detect, annotate, present, publish.
    fn process_frame(&self, frame: Frame) -> Result<DetectionResult> {
        let mut frame = to_working_resolution(frame)?;
        let result = count_objects(&frame, &self.params.snapshot())?;
        annotate(&mut frame, &result);

        {
            let mut surface = match self.surface.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(err) = surface.present(&frame) {
                log::warn!("render surface {} failed: {:#}", surface.name(), err);
            }
        }

        self.readouts.record(&result);
        self.last_frame.publish(frame);
        Ok(result)
    }
}

/// Handle to a running acquisition worker.
#[derive(Debug)]
struct StreamHandle {
    device: String,
    shutdown: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl StreamHandle {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("acquisition worker for {} panicked", self.device))?;
        }
        Ok(())
    }
}

pub struct Session {
    shared: Shared,
    stream: Option<StreamHandle>,
}

impl Session {
    pub fn new(params: DetectionParameters, surface: Box<dyn RenderSurface>) -> Self {
        Self {
            shared: Shared {
                params: Arc::new(params),
                readouts: Arc::new(Readouts::default()),
                last_frame: LastFrameSlot::new(),
                surface: Arc::new(Mutex::new(surface)),
            },
            stream: None,
        }
    }

    /// Session that discards rendered frames.
    pub fn headless(params: DetectionParameters) -> Self {
        Self::new(params, Box::new(NullSurface))
    }

    pub fn params(&self) -> &DetectionParameters {
        &self.shared.params
    }

    pub fn readouts(&self) -> &Readouts {
        &self.shared.readouts
    }

    /// Most recent annotated frame.
    pub fn last_frame(&self) -> Option<Arc<Frame>> {
        self.shared.last_frame.latest()
    }

    pub fn mode(&self) -> Mode {
        match &self.stream {
            Some(stream) if stream.is_running() => Mode::Streaming,
            _ => Mode::Idle,
        }
    }

    /// Run the pipeline once on a still image.
    ///
    /// Refused while streaming. On failure the previous frame and readouts are
    /// left as they were.
    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<DetectionResult> {
        self.reap_finished_stream();
        if self.mode() == Mode::Streaming {
            return Err(OperatorNotice::invalid_command(
                "stop streaming before loading an image",
            )
            .into());
        }
        let path = path.as_ref();
        let frame = load_frame(path)?;
        let result = self.shared.process_frame(frame)?;
        log::info!(
            "{}: {} objects ({:.1} fps)",
            path.display(),
            result.count(),
            result.fps()
        );
        Ok(result)
    }

    /// Open the capture device and start the acquisition worker.
    ///
    /// The device is opened on the worker thread; this call waits for the
    /// outcome, so a failed open returns an error and the session stays Idle.
    /// Starting while already streaming is a no-op.
    pub fn start_streaming(&mut self, config: &CaptureConfig) -> Result<()> {
        self.reap_finished_stream();
        if self.mode() == Mode::Streaming {
            log::info!("already streaming");
            return Ok(());
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel();

        let shared = self.shared.clone();
        let worker_config = config.clone();
        let worker_shutdown = shutdown.clone();
        let worker_running = running.clone();
        let join = std::thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || {
                run_stream(shared, worker_config, worker_shutdown, ready_tx);
                worker_running.store(false, Ordering::SeqCst);
            })?;

        let opened = ready_rx
            .recv()
            .map_err(|_| anyhow!("acquisition worker exited before opening {}", config.device))
            .and_then(|outcome| outcome);
        if let Err(err) = opened {
            running.store(false, Ordering::SeqCst);
            if join.join().is_err() {
                log::error!("acquisition worker panicked during open");
            }
            return Err(err);
        }

        log::info!("streaming from {}", config.device);
        self.stream = Some(StreamHandle {
            device: config.device.clone(),
            shutdown,
            running,
            join: Some(join),
        });
        Ok(())
    }

    /// Stop the worker and wait for it to release the device. No-op when Idle.
    pub fn stop_streaming(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(stream) => {
                let device = stream.device.clone();
                let was_running = stream.is_running();
                stream.stop()?;
                if was_running {
                    log::info!("stopped streaming from {}", device);
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Flip between Idle and Streaming. Returns the new mode.
    pub fn toggle(&mut self, config: &CaptureConfig) -> Result<Mode> {
        self.reap_finished_stream();
        match self.mode() {
            Mode::Idle => self.start_streaming(config)?,
            Mode::Streaming => self.stop_streaming()?,
        }
        Ok(self.mode())
    }

    /// Save the last annotated frame.
    pub fn save_last_result(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let frame = self
            .last_frame()
            .ok_or_else(|| OperatorNotice::save_failed("no result to save yet"))?;
        save_frame(&frame, path)
    }

    /// Join a worker that ended on its own (end of stream or read failure).
    fn reap_finished_stream(&mut self) {
        if self.stream.as_ref().is_some_and(|stream| !stream.is_running()) {
            if let Err(err) = self.stop_streaming() {
                log::error!("{:#}", err);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.stop_streaming() {
            log::error!("{:#}", err);
        }
    }
}

fn run_stream(
    shared: Shared,
    config: CaptureConfig,
    shutdown: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<()>>,
) {
    let mut source = match CaptureSource::open(&config) {
        Ok(source) => source,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    while source.is_open() && !shutdown.load(Ordering::SeqCst) {
        match source.read() {
            Ok(Some(frame)) => {
                if let Err(err) = shared.process_frame(frame) {
                    log::warn!("skipping frame from {}: {:#}", config.device, err);
                }
            }
            Ok(None) => {
                log::info!("{}: end of stream", config.device);
                break;
            }
            Err(err) => {
                log::warn!("{}: read failed, stopping: {:#}", config.device, err);
                break;
            }
        }
        std::thread::sleep(FRAME_YIELD);
    }

    let stats = source.stats();
    source.release();
    log::info!(
        "{}: acquisition ended after {} frames",
        stats.device,
        stats.frames_captured
    );
}
