use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::{MotionBackend, ReplayBackend};

/// Inference device selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Auto,
    Cpu,
    Cuda,
}

impl FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => Err(anyhow!("unknown device selector '{}'", other)),
        }
    }
}

/// Detector construction inputs, taken from the pipeline config.
#[derive(Clone, Debug)]
pub struct DetectorSettings {
    pub model_path: String,
    pub conf_threshold: f32,
    pub device: String,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: crate::config::DEFAULT_MODEL_PATH.to_string(),
            conf_threshold: crate::config::DEFAULT_CONF_THRESHOLD,
            device: "auto".to_string(),
        }
    }
}

fn is_replay_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"))
}

/// Build and warm up the detector backend the settings ask for.
///
/// `.jsonl` model paths replay recorded detections on any device. Otherwise
/// `auto` prefers the ONNX backend when it is compiled in and the model file
/// exists, and falls back to CPU motion detection.
pub fn select_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let device: Device = settings.device.parse()?;

    let mut backend: Box<dyn DetectorBackend> = if is_replay_path(&settings.model_path) {
        Box::new(ReplayBackend::open(
            &settings.model_path,
            settings.conf_threshold,
        )?)
    } else {
        match device {
            Device::Cuda => {
                return Err(anyhow!(
                    "device 'cuda' is not available in this build; use 'cpu' or 'auto'"
                ))
            }
            Device::Cpu => Box::new(MotionBackend::new(settings.conf_threshold)),
            Device::Auto => auto_backend(settings)?,
        }
    };

    backend.warm_up()?;
    log::info!(
        "detector backend '{}' ready; running on device: {}",
        backend.name(),
        backend.device()
    );
    Ok(backend)
}

#[cfg(feature = "backend-tract")]
fn auto_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    if Path::new(&settings.model_path).is_file() {
        return Ok(Box::new(super::backends::TractBackend::new(
            &settings.model_path,
            settings.conf_threshold,
        )?));
    }
    log::warn!(
        "model {} not found; falling back to motion detection",
        settings.model_path
    );
    Ok(Box::new(MotionBackend::new(settings.conf_threshold)))
}

#[cfg(not(feature = "backend-tract"))]
fn auto_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    log::debug!(
        "backend-tract feature disabled; ignoring model {}",
        settings.model_path
    );
    Ok(Box::new(MotionBackend::new(settings.conf_threshold)))
}
