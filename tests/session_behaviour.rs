use std::path::Path;
use std::time::{Duration, Instant};

use image::Rgb;
use imageproc::drawing::draw_filled_circle_mut;

use object_counter::{
    notice_kind, CaptureConfig, DetectionParameters, Frame, Mode, NoticeKind, PreviewFileSurface,
    Session, Viewport,
};

fn write_three_discs(path: &Path) {
    let mut frame = Frame::from_pixel(640, 480, Rgb([235, 235, 235]));
    for (x, y) in [(120, 120), (320, 300), (520, 160)] {
        draw_filled_circle_mut(&mut frame, (x, y), 30, Rgb([20, 20, 20]));
    }
    frame.save(path).expect("write test image");
}

fn stub(frame_limit: Option<u64>) -> CaptureConfig {
    CaptureConfig {
        device: "stub://integration".to_string(),
        frame_limit,
        ..CaptureConfig::default()
    }
}

fn wait_for_idle(session: &Session) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while session.mode() == Mode::Streaming && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn still_image_is_counted_and_saved() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("discs.png");
    write_three_discs(&input);

    let mut session = Session::headless(DetectionParameters::default());
    let result = session.load_image(&input).expect("load image");
    assert_eq!(result.count(), 3);
    assert_eq!(session.readouts().count(), 3);
    assert!(session.readouts().fps().is_finite());

    let written = session
        .save_last_result(dir.path().join("counted"))
        .expect("save result");
    assert_eq!(written, dir.path().join("counted.png"));
    let saved = image::open(&written).expect("decode saved").to_rgb8();
    assert_eq!(saved.dimensions(), (640, 480));
    // Bounding boxes are drawn in green.
    assert!(saved.pixels().any(|p| *p == Rgb([0, 255, 0])));
}

#[test]
fn failed_load_keeps_previous_result() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = dir.path().join("discs.png");
    write_three_discs(&input);

    let mut session = Session::headless(DetectionParameters::default());
    session.load_image(&input).expect("load image");
    let before = session.last_frame().expect("frame after load");

    let err = session
        .load_image(dir.path().join("missing.png"))
        .expect_err("missing file must fail");
    assert_eq!(notice_kind(&err), Some(NoticeKind::SourceUnavailable));
    assert_eq!(session.readouts().count(), 3);
    let after = session.last_frame().expect("frame still present");
    assert!(std::sync::Arc::ptr_eq(&before, &after));
}

#[test]
fn start_without_device_stays_idle() {
    let mut session = Session::headless(DetectionParameters::default());
    let config = CaptureConfig {
        device: "/dev/video-not-present".to_string(),
        ..CaptureConfig::default()
    };
    let err = session
        .start_streaming(&config)
        .expect_err("start must fail");
    assert_eq!(notice_kind(&err), Some(NoticeKind::SourceUnavailable));
    assert_eq!(session.mode(), Mode::Idle);

    session.stop_streaming().expect("stop while idle");
    assert_eq!(session.mode(), Mode::Idle);
}

#[test]
fn streaming_updates_readouts_and_preview() {
    let dir = tempfile::tempdir().expect("temp dir");
    let preview = dir.path().join("preview.png");
    let surface = PreviewFileSurface::new(&preview, Viewport::new(400, 400));
    let mut session = Session::new(DetectionParameters::default(), Box::new(surface));

    session.start_streaming(&stub(Some(4))).expect("start stub");
    wait_for_idle(&session);

    assert_eq!(session.mode(), Mode::Idle);
    assert_eq!(session.readouts().frames_processed(), 4);
    assert_eq!(session.readouts().count(), 3);

    let shown = image::open(&preview).expect("decode preview").to_rgb8();
    assert_eq!(shown.dimensions(), (400, 400));
    // 640x480 fitted into 400x400 leaves black bars above and below.
    assert_eq!(shown.get_pixel(200, 5), &Rgb([0, 0, 0]));

    let written = session
        .save_last_result(dir.path().join("last.jpg"))
        .expect("save last frame");
    assert!(written.exists());
}

#[test]
fn stream_can_be_restarted_after_stop() {
    let mut session = Session::headless(DetectionParameters::default());
    session.start_streaming(&stub(None)).expect("first start");
    assert_eq!(session.mode(), Mode::Streaming);
    session.stop_streaming().expect("stop");
    assert_eq!(session.mode(), Mode::Idle);

    session.start_streaming(&stub(Some(2))).expect("second start");
    wait_for_idle(&session);
    assert_eq!(session.mode(), Mode::Idle);
    assert!(session.last_frame().is_some());
}

#[test]
fn parameter_changes_apply_to_running_stream() {
    let mut session = Session::headless(DetectionParameters::default());
    // Half-height capture: discs are stretched to ellipses of roughly 1400 px²
    // at the working resolution.
    let config = CaptureConfig {
        height: 240,
        ..stub(None)
    };
    session.start_streaming(&config).expect("start stub");

    let deadline = Instant::now() + Duration::from_secs(10);
    while session.readouts().frames_processed() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(session.readouts().count(), 3);

    session.params().set_min_area(2000);
    let seen = session.readouts().frames_processed();
    let deadline = Instant::now() + Duration::from_secs(10);
    while session.readouts().frames_processed() < seen + 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    session.stop_streaming().expect("stop");
    assert_eq!(session.readouts().count(), 0);
}
