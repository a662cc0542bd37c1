use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use traffyx::PipelineConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "TRAFFYX_DEVICE",
        "TRAFFYX_MODEL_PATH",
        "TRAFFYX_CONF_THRESHOLD",
        "TRAFFYX_METRICS_DIR",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_toml_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".toml",
        r#"
        model_path = "models/custom.onnx"
        conf_threshold = 0.4
        max_age = 12
        iou_threshold = 0.25

        [performance]
        fps_window = 60
        measure_memory = false
        log_every_n_frames = 5

        [metrics]
        dir = "bench-logs"
        "#,
    );

    std::env::set_var("TRAFFYX_DEVICE", "cpu");
    std::env::set_var("TRAFFYX_METRICS_DIR", "/tmp/traffyx-metrics");

    let cfg = PipelineConfig::load(Some(file.path())).expect("load config");

    assert_eq!(cfg.model_path, "models/custom.onnx");
    assert_eq!(cfg.conf_threshold, 0.4);
    assert_eq!(cfg.device, "cpu");
    assert_eq!(cfg.tracker.max_age, 12);
    assert_eq!(cfg.tracker.iou_threshold, 0.25);
    assert_eq!(cfg.performance.fps_window, 60);
    assert!(!cfg.performance.measure_memory);
    assert_eq!(cfg.performance.log_every_n_frames, 5);
    assert_eq!(cfg.metrics.dir, PathBuf::from("/tmp/traffyx-metrics"));

    clear_env();
}

#[test]
fn loads_json_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".json",
        r#"{
            "device": "auto",
            "performance": { "fps_window": 10 },
            "metrics": { "path": "out/run.jsonl" }
        }"#,
    );

    let cfg = PipelineConfig::load(Some(file.path())).expect("load config");
    assert_eq!(cfg.performance.fps_window, 10);
    assert_eq!(cfg.tracker.max_age, 30);
    assert_eq!(cfg.metrics_path(), PathBuf::from("out/run.jsonl"));

    clear_env();
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PipelineConfig::load(Some(Path::new("/nonexistent/params.toml")))
        .expect("defaults");
    assert_eq!(cfg, PipelineConfig::default());

    let cfg = PipelineConfig::load(None).expect("defaults");
    assert_eq!(cfg, PipelineConfig::default());
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(".toml", "[performance]\nfps_window = 0\n");
    assert!(PipelineConfig::load(Some(file.path())).is_err());

    let file = config_file(".toml", "conf_threshold = 1.2\n");
    assert!(PipelineConfig::load(Some(file.path())).is_err());

    let file = config_file(".toml", "unknown_key = true\n");
    assert!(PipelineConfig::load(Some(file.path())).is_err());

    std::env::set_var("TRAFFYX_CONF_THRESHOLD", "high");
    assert!(PipelineConfig::load(None).is_err());

    clear_env();
}

#[test]
fn default_metrics_path_is_timestamped_under_dir() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PipelineConfig::load(None).expect("defaults");
    let path = cfg.metrics_path();
    assert_eq!(path.parent(), Some(Path::new("logs")));
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("run_") && name.ends_with(".jsonl"));
}
