use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::DetectorSettings;
use crate::tracker::{TrackerConfig, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_AGE};

pub const DEFAULT_MODEL_PATH: &str = "models/yolov8n.onnx";
pub const DEFAULT_CONF_THRESHOLD: f32 = 0.5;
const DEFAULT_DEVICE: &str = "auto";
const DEFAULT_FPS_WINDOW: usize = 30;
const DEFAULT_MEASURE_MEMORY: bool = true;
const DEFAULT_LOG_EVERY_N_FRAMES: u64 = 10;
const DEFAULT_METRICS_DIR: &str = "logs";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PipelineConfigFile {
    model_path: Option<String>,
    conf_threshold: Option<f32>,
    device: Option<String>,
    max_age: Option<u32>,
    iou_threshold: Option<f32>,
    performance: Option<PerformanceConfigFile>,
    metrics: Option<MetricsConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PerformanceConfigFile {
    fps_window: Option<usize>,
    measure_memory: Option<bool>,
    log_every_n_frames: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MetricsConfigFile {
    dir: Option<PathBuf>,
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub model_path: String,
    pub conf_threshold: f32,
    pub device: String,
    pub tracker: TrackerConfig,
    pub performance: PerformanceSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSettings {
    pub fps_window: usize,
    pub measure_memory: bool,
    pub log_every_n_frames: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSettings {
    pub dir: PathBuf,
    /// Explicit log path; a timestamped file under `dir` when unset.
    pub path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_file(PipelineConfigFile::default())
    }
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            fps_window: DEFAULT_FPS_WINDOW,
            measure_memory: DEFAULT_MEASURE_MEMORY,
            log_every_n_frames: DEFAULT_LOG_EVERY_N_FRAMES,
        }
    }
}

impl PipelineConfig {
    /// Load from an optional file, then apply `TRAFFYX_*` environment overrides.
    ///
    /// A path that does not exist falls back to defaults with a warning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) if path.exists() => read_config_file(path)?,
            Some(path) => {
                log::warn!("config file {} not found; using defaults", path.display());
                PipelineConfigFile::default()
            }
            None => PipelineConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipelineConfigFile) -> Self {
        let performance = file.performance.unwrap_or_default();
        let metrics = file.metrics.unwrap_or_default();
        Self {
            model_path: file
                .model_path
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
            conf_threshold: file.conf_threshold.unwrap_or(DEFAULT_CONF_THRESHOLD),
            device: file.device.unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            tracker: TrackerConfig {
                max_age: file.max_age.unwrap_or(DEFAULT_MAX_AGE),
                iou_threshold: file.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
            },
            performance: PerformanceSettings {
                fps_window: performance.fps_window.unwrap_or(DEFAULT_FPS_WINDOW),
                measure_memory: performance
                    .measure_memory
                    .unwrap_or(DEFAULT_MEASURE_MEMORY),
                log_every_n_frames: performance
                    .log_every_n_frames
                    .unwrap_or(DEFAULT_LOG_EVERY_N_FRAMES),
            },
            metrics: MetricsSettings {
                dir: metrics
                    .dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_METRICS_DIR)),
                path: metrics.path,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("TRAFFYX_DEVICE") {
            if !device.trim().is_empty() {
                self.device = device.trim().to_string();
            }
        }
        if let Ok(model_path) = std::env::var("TRAFFYX_MODEL_PATH") {
            if !model_path.trim().is_empty() {
                self.model_path = model_path;
            }
        }
        if let Ok(conf) = std::env::var("TRAFFYX_CONF_THRESHOLD") {
            self.conf_threshold = conf
                .trim()
                .parse()
                .map_err(|_| anyhow!("TRAFFYX_CONF_THRESHOLD must be a number"))?;
        }
        if let Ok(dir) = std::env::var("TRAFFYX_METRICS_DIR") {
            if !dir.trim().is_empty() {
                self.metrics.dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.conf_threshold) {
            return Err(anyhow!("conf_threshold must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.tracker.iou_threshold) {
            return Err(anyhow!("iou_threshold must be within [0, 1]"));
        }
        if self.performance.fps_window == 0 {
            return Err(anyhow!("performance.fps_window must be at least 1"));
        }
        if self.performance.log_every_n_frames == 0 {
            return Err(anyhow!("performance.log_every_n_frames must be at least 1"));
        }
        Ok(())
    }

    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            model_path: self.model_path.clone(),
            conf_threshold: self.conf_threshold,
            device: self.device.clone(),
        }
    }

    /// Where this run's metrics log goes.
    pub fn metrics_path(&self) -> PathBuf {
        self.metrics
            .path
            .clone()
            .unwrap_or_else(|| crate::metrics::default_log_path(&self.metrics.dir))
    }
}

fn read_config_file(path: &Path) -> Result<PipelineConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let cfg = if is_json {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
