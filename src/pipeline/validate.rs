use crate::detect::Detection;
use crate::error::ContractViolation;
use crate::geometry::is_finite;
use crate::track::TrackSnapshot;

/// Check the detector and tracker outputs of one frame.
///
/// Every detection must carry four finite coordinates and a confidence in
/// `[0, 1]`; every track must carry an assigned (non-zero) id. Box arity is
/// fixed by the `BBox` type, so only the coordinate values are checked here.
pub fn validate_outputs(
    detections: &[Detection],
    tracks: &[TrackSnapshot],
) -> Result<(), ContractViolation> {
    for (index, d) in detections.iter().enumerate() {
        if !is_finite(&d.bbox) {
            return Err(ContractViolation::MalformedBBox {
                index,
                bbox: d.bbox.to_vec(),
            });
        }
        if !(0.0..=1.0).contains(&d.confidence) {
            return Err(ContractViolation::ConfidenceOutOfRange {
                index,
                confidence: d.confidence,
            });
        }
    }

    for (index, t) in tracks.iter().enumerate() {
        if t.track_id == 0 {
            return Err(ContractViolation::InvalidTrackId {
                index,
                track_id: t.track_id,
            });
        }
    }
    Ok(())
}
