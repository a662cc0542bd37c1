use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::error::ContractViolation;
use crate::frame::Frame;

/// Replays recorded detector output.
///
/// The file holds one JSON array of detections per line, one line per
/// processed frame. A blank line is a frame without detections. Once the file
/// is exhausted every further frame yields an empty list.
///
/// A recorded box without exactly four coordinates fails `detect` with a
/// `ContractViolation::MalformedBBox`, which the runner reports as a contract
/// breach rather than a read failure.
pub struct ReplayBackend {
    path: String,
    lines: Lines<BufReader<File>>,
    replayed: u64,
    conf_threshold: f32,
}

impl ReplayBackend {
    pub fn open<P: AsRef<Path>>(path: P, conf_threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open detection replay {}", path.display()))?;
        Ok(Self {
            path: path.display().to_string(),
            lines: BufReader::new(file).lines(),
            replayed: 0,
            conf_threshold,
        })
    }

    /// Lines consumed so far.
    pub fn replayed(&self) -> u64 {
        self.replayed
    }
}

/// Recorded detection; box arity is checked after parsing.
#[derive(Deserialize)]
struct RecordedDetection {
    bbox: Vec<f32>,
    confidence: f32,
    class_id: i32,
    #[serde(default)]
    class_name: String,
}

impl RecordedDetection {
    fn into_detection(self, index: usize) -> Result<Detection, ContractViolation> {
        let bbox: [f32; 4] = self
            .bbox
            .as_slice()
            .try_into()
            .map_err(|_| ContractViolation::MalformedBBox {
                index,
                bbox: self.bbox.clone(),
            })?;
        Ok(Detection::new(
            bbox,
            self.confidence,
            self.class_id,
            self.class_name,
        ))
    }
}

impl DetectorBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn device(&self) -> &str {
        "replay"
    }

    fn detect(&mut self, frame: Option<&Frame>) -> Result<Vec<Detection>> {
        if frame.is_none() {
            return Ok(Vec::new());
        }
        let Some(line) = self.lines.next() else {
            return Ok(Vec::new());
        };
        self.replayed += 1;
        let line = line.with_context(|| format!("failed to read {}", self.path))?;
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }
        let recorded: Vec<RecordedDetection> = serde_json::from_str(&line)
            .with_context(|| format!("invalid detections at {} line {}", self.path, self.replayed))?;

        let mut detections = Vec::with_capacity(recorded.len());
        for (index, record) in recorded.into_iter().enumerate() {
            let d = record.into_detection(index)?;
            // Confidences outside [0, 1] skip the threshold so the validator sees them.
            if !(0.0..=1.0).contains(&d.confidence) || d.confidence >= self.conf_threshold {
                detections.push(d);
            }
        }
        Ok(detections)
    }
}
