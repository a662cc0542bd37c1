//! Frame-to-frame multi-object tracker.
//!
//! Association is a global greedy pass over every (track, detection) pair
//! ordered by descending IoU. It is not an optimal assignment. Ties break on
//! ascending track index, then ascending detection index, so two trackers fed
//! the same detections always agree.
//!
//! `update` mutates the live track set in place and must be called from a
//! single thread of control, once per frame, in frame order.

use crate::detect::Detection;
use crate::geometry::iou;
use crate::track::{Track, TrackSnapshot};

pub const DEFAULT_MAX_AGE: u32 = 30;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Frames a track may go unmatched before eviction.
    pub max_age: u32,
    /// Minimum IoU for a pair to be accepted as a match.
    pub iou_threshold: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

pub struct Tracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_track_id: u64,
    frame_count: u64,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_track_id: 1,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    /// Number of `update` calls so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Number of live tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Advance one frame and return the surviving tracks.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackSnapshot> {
        self.frame_count += 1;

        let existing = self.tracks.len();
        let matches = greedy_match(&self.tracks, detections, self.config.iou_threshold);

        let mut track_matched = vec![false; existing];
        let mut det_matched = vec![false; detections.len()];
        for &(ti, di) in &matches {
            self.tracks[ti].apply(&detections[di]);
            track_matched[ti] = true;
            det_matched[di] = true;
        }

        for (track, matched) in self.tracks.iter_mut().zip(&track_matched) {
            if !matched {
                track.mark_missed();
            }
        }

        for (det, _) in detections
            .iter()
            .zip(&det_matched)
            .filter(|(_, matched)| !**matched)
        {
            let id = self.next_track_id;
            self.next_track_id += 1;
            log::trace!("track {} spawned (class {})", id, det.class_id);
            self.tracks.push(Track::spawn(id, det));
        }

        let max_age = self.config.max_age;
        self.tracks.retain(|t| {
            let keep = t.misses <= max_age;
            if !keep {
                log::trace!("track {} evicted after {} misses", t.track_id, t.misses);
            }
            keep
        });

        self.snapshot()
    }

    /// Copies of the live tracks in creation order.
    pub fn snapshot(&self) -> Vec<TrackSnapshot> {
        self.tracks.iter().map(Track::snapshot).collect()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

/// Greedy global matching. Returns accepted `(track_index, detection_index)` pairs.
fn greedy_match(tracks: &[Track], detections: &[Detection], threshold: f32) -> Vec<(usize, usize)> {
    if tracks.is_empty() || detections.is_empty() {
        return Vec::new();
    }

    let mut pairs: Vec<(usize, usize, f32)> = Vec::with_capacity(tracks.len() * detections.len());
    for (ti, track) in tracks.iter().enumerate() {
        for (di, det) in detections.iter().enumerate() {
            pairs.push((ti, di, iou(&track.bbox, &det.bbox)));
        }
    }
    pairs.sort_by(|a, b| {
        b.2.total_cmp(&a.2)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });

    let mut used_tracks = vec![false; tracks.len()];
    let mut used_dets = vec![false; detections.len()];
    let mut matches = Vec::new();

    for (ti, di, score) in pairs {
        if used_tracks[ti] || used_dets[di] || score.is_nan() || score < threshold {
            continue;
        }
        used_tracks[ti] = true;
        used_dets[di] = true;
        matches.push((ti, di));
    }
    matches
}
