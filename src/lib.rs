//! Object Counter
//!
//! This crate detects and counts discrete objects in a still image or a live
//! camera feed, overlays bounding boxes, and reports a count and frame rate.
//!
//! # Architecture
//!
//! Two components do the work:
//!
//! 1. **Detection pipeline** (`detect`): grayscale, Gaussian blur, adaptive
//!    threshold, external contours, area filter. Pure per call.
//! 2. **Acquisition loop** (`session`): runs the pipeline once for a still
//!    image or repeatedly on a worker thread for a capture device, annotates
//!    each frame, and hands it to a render surface.
//!
//! # Module Structure
//!
//! - `frame`: Frame type, working resolution, last-frame handoff slot
//! - `detect`: Detection parameters, contour pipeline, results
//! - `annotate`: Bounding box overlay
//! - `ingest`: Still image loading and capture devices (V4L2, synthetic)
//! - `render`: Scale-to-fit presentation surfaces
//! - `storage`: Atomic PNG/JPEG persistence
//! - `session`: Idle/Streaming state machine and shared readouts
//! - `console`: Operator command parsing
//! - `config`: File + environment configuration
//! - `ui`: Terminal readouts

use std::fmt;

pub mod annotate;
pub mod config;
pub mod console;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod render;
pub mod session;
pub mod storage;
pub mod ui;

pub use annotate::{annotate, DETECTION_COLOR};
pub use config::CounterConfig;
pub use detect::{count_objects, DetectionParameters, DetectionResult, ParameterSnapshot, Shape};
pub use frame::{Frame, LastFrameSlot, WORKING_HEIGHT, WORKING_WIDTH};
pub use ingest::{load_frame, CaptureConfig, CaptureSource};
pub use render::{fit_to_viewport, NullSurface, PreviewFileSurface, RenderSurface, Viewport};
pub use session::{Mode, Readouts, Session};
pub use storage::save_frame;

// -------------------- Operator Notices --------------------

/// Category of a failure reported to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    /// File missing, device absent, unsupported codec.
    SourceUnavailable,
    /// Decoded but unusable frame (zero-sized, wrong length).
    MalformedFrame,
    /// Persisting a frame failed.
    SaveFailed,
    /// The operator typed something the console cannot run.
    InvalidCommand,
}

impl NoticeKind {
    pub fn code(self) -> &'static str {
        match self {
            NoticeKind::SourceUnavailable => "SOURCE_UNAVAILABLE",
            NoticeKind::MalformedFrame => "MALFORMED_FRAME",
            NoticeKind::SaveFailed => "SAVE_FAILED",
            NoticeKind::InvalidCommand => "INVALID_COMMAND",
        }
    }
}

/// Operator-visible failure. Every notice is local and user-correctable.
///
/// Notices travel inside `anyhow::Error`; use [`notice_kind`] to recover the
/// category from an error chain.
#[derive(Clone, Debug)]
pub struct OperatorNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl OperatorNotice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::SourceUnavailable, message)
    }

    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::MalformedFrame, message)
    }

    pub fn save_failed(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::SaveFailed, message)
    }

    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::InvalidCommand, message)
    }
}

impl fmt::Display for OperatorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for OperatorNotice {}

/// Find the notice category anywhere in an error chain.
pub fn notice_kind(err: &anyhow::Error) -> Option<NoticeKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<OperatorNotice>())
        .map(|notice| notice.kind)
}
