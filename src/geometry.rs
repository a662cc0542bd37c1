//! Axis-aligned box geometry.
//!
//! Boxes are `[x1, y1, x2, y2]` in pixel coordinates. No ordering is enforced
//! on inputs: a box with `x2 < x1` or `y2 < y1` simply has no area.

/// Left-top-right-bottom box.
pub type BBox = [f32; 4];

/// Guard added to denominators so degenerate boxes never divide by zero.
pub const EPSILON: f32 = 1e-6;

/// Area of a box, zero for inverted or degenerate boxes.
#[inline]
pub fn area(b: &BBox) -> f32 {
    (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0)
}

/// Intersection-over-Union of two boxes, in `[0, 1]`.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let union = area(a) + area(b) - inter;

    inter / (union + EPSILON)
}

/// True when all four coordinates are finite numbers.
#[inline]
pub fn is_finite(b: &BBox) -> bool {
    b.iter().all(|v| v.is_finite())
}
