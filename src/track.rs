use serde::Serialize;

use crate::detect::Detection;
use crate::geometry::BBox;

/// Live identity owned by the tracker. Never handed out by reference.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Track {
    pub track_id: u64,
    pub bbox: BBox,
    pub class_id: i32,
    pub confidence: f32,
    /// Consecutive frames without a matched detection.
    pub misses: u32,
    /// Frames since creation.
    pub age: u32,
}

impl Track {
    pub(crate) fn spawn(track_id: u64, det: &Detection) -> Self {
        Self {
            track_id,
            bbox: det.bbox,
            class_id: det.class_id,
            confidence: det.confidence,
            misses: 0,
            age: 0,
        }
    }

    pub(crate) fn apply(&mut self, det: &Detection) {
        self.bbox = det.bbox;
        self.confidence = det.confidence;
        self.misses = 0;
        self.age += 1;
    }

    pub(crate) fn mark_missed(&mut self) {
        self.misses += 1;
        self.age += 1;
    }

    pub(crate) fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            track_id: self.track_id,
            class_id: self.class_id,
            bbox: self.bbox,
            confidence: self.confidence,
            misses: self.misses,
            age: self.age,
        }
    }
}

/// Read-only copy of a track as of the end of one `Tracker::update` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub track_id: u64,
    pub class_id: i32,
    pub bbox: BBox,
    pub confidence: f32,
    pub misses: u32,
    pub age: u32,
}
