use crate::shared::geometry::{BoundingBox, Rect};

/// The fixed danger zone for a frame: the middle half horizontally and the
/// middle third vertically, using integer division.
pub fn compute_zone(frame_width: u32, frame_height: u32) -> Rect {
    let w = frame_width as i32;
    let h = frame_height as i32;
    Rect::new(w / 4, h / 3, w / 2, h / 3)
}

/// Axis-aligned intersection test. Edges that merely touch do not overlap.
pub fn overlaps(bbox: &BoundingBox, zone: &Rect) -> bool {
    bbox.x1 < zone.right() && bbox.x2 > zone.x && bbox.y1 < zone.bottom() && bbox.y2 > zone.y
}
