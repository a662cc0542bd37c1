use serde::{Deserialize, Serialize};

use crate::geometry::BBox;

/// One object found in one frame. Lives for a single frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[x1, y1, x2, y2]` in frame pixels.
    pub bbox: BBox,
    /// Expected in `[0, 1]`; checked by the pipeline validator, not here.
    pub confidence: f32,
    pub class_id: i32,
    #[serde(default)]
    pub class_name: String,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f32, class_id: i32, class_name: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
            class_name: class_name.into(),
        }
    }
}
