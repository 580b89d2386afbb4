use crate::detection::domain::detection::Detection;
use crate::shared::constants::PERSON_LABEL;
use crate::shared::geometry::Rect;
use crate::zone::danger_zone::overlaps;

/// Keeps detections labelled `person` scoring strictly above `threshold`.
pub fn filter_persons(detections: &[Detection], threshold: f64) -> Vec<Detection> {
    detections
        .iter()
        .filter(|d| d.label == PERSON_LABEL && d.confidence > threshold)
        .cloned()
        .collect()
}

/// A frame is dangerous iff any filtered person overlaps the zone.
pub fn is_dangerous(persons: &[Detection], zone: &Rect) -> bool {
    persons.iter().any(|p| overlaps(&p.bbox, zone))
}
