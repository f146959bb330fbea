use std::io::Write;
use std::sync::Mutex;

use tempfile::Builder;

use object_counter::config::CounterConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "OBJCOUNT_CONFIG",
        "OBJCOUNT_DEVICE",
        "OBJCOUNT_CAPTURE_WIDTH",
        "OBJCOUNT_CAPTURE_HEIGHT",
        "OBJCOUNT_TARGET_FPS",
        "OBJCOUNT_MIN_AREA",
        "OBJCOUNT_THRESHOLD",
        "OBJCOUNT_BLUR_SIZE",
        "OBJCOUNT_PREVIEW_PATH",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = CounterConfig::load().expect("load defaults");
    assert_eq!(cfg.capture.device, "0");
    assert_eq!((cfg.capture.width, cfg.capture.height), (640, 480));
    assert_eq!(cfg.detection.min_area, 500);
    assert_eq!(cfg.detection.threshold, 180);
    assert_eq!(cfg.detection.blur_size, 5);
    assert_eq!(cfg.render.viewport.width, 800);
    assert!(cfg.render.preview_path.is_none());
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    let json = r#"{
        "device": "/dev/video2",
        "capture": { "width": 1280, "height": 720, "target_fps": 15 },
        "detection": { "min_area": 800, "threshold": 90, "blur_size": 7 },
        "render": { "viewport_width": 1024, "viewport_height": 768 }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("OBJCOUNT_CONFIG", file.path());
    std::env::set_var("OBJCOUNT_MIN_AREA", "1200");
    std::env::set_var("OBJCOUNT_PREVIEW_PATH", "/tmp/objcount-preview.png");

    let cfg = CounterConfig::load().expect("load config");
    assert_eq!(cfg.capture.device, "/dev/video2");
    assert_eq!((cfg.capture.width, cfg.capture.height), (1280, 720));
    assert_eq!(cfg.capture.target_fps, 15);
    assert_eq!(cfg.detection.min_area, 1200);
    assert_eq!(cfg.detection.threshold, 90);
    assert_eq!(cfg.detection.blur_size, 7);
    assert_eq!(cfg.render.viewport.width, 1024);
    assert_eq!(cfg.render.viewport.height, 768);
    assert_eq!(
        cfg.render.preview_path.as_deref(),
        Some(std::path::Path::new("/tmp/objcount-preview.png"))
    );

    let params = cfg.parameters().snapshot();
    assert_eq!(params.min_area, 1200);

    clear_env();
}

#[test]
fn loads_toml_config_and_coerces_even_blur() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
device = "stub://bench"

[detection]
blur_size = 4
"#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("OBJCOUNT_CONFIG", file.path());

    let cfg = CounterConfig::load().expect("load config");
    assert_eq!(cfg.capture.device, "stub://bench");
    assert_eq!(cfg.detection.blur_size, 5);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("OBJCOUNT_MIN_AREA", "50");
    assert!(CounterConfig::load().is_err());
    clear_env();

    std::env::set_var("OBJCOUNT_THRESHOLD", "300");
    assert!(CounterConfig::load().is_err());
    clear_env();

    std::env::set_var("OBJCOUNT_BLUR_SIZE", "many");
    assert!(CounterConfig::load().is_err());
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    file.write_all(b"{ not json").expect("write config");
    std::env::set_var("OBJCOUNT_CONFIG", file.path());
    assert!(CounterConfig::load().is_err());
    clear_env();
}
