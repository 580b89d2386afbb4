use ndarray::{s, ArrayViewMut3};

use crate::display::domain::frame_display::Overlay;
use crate::shared::frame::Frame;

pub const ZONE_COLOR: [u8; 3] = [255, 0, 0];
pub const PERSON_COLOR: [u8; 3] = [0, 255, 0];
pub const WARNING_COLOR: [u8; 3] = [255, 0, 0];

const LINE_THICKNESS: i32 = 2;

/// Paints overlays into `frame` in order. Shapes are clipped to the frame.
pub fn paint(frame: &mut Frame, overlays: &[Overlay]) {
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    let mut pixels = frame.as_ndarray_mut();

    for overlay in overlays {
        match overlay {
            Overlay::Zone(r) => {
                outline(&mut pixels, r.x, r.y, r.right(), r.bottom(), ZONE_COLOR);
            }
            Overlay::Person(b) => {
                outline(&mut pixels, b.x1, b.y1, b.x2, b.y2, PERSON_COLOR);
            }
            Overlay::Warning(_) => {
                fill(&mut pixels, 0, 0, w, banner_height(h), WARNING_COLOR);
            }
        }
    }
}

/// Height of the warning strip across the top of the frame.
pub fn banner_height(frame_height: i32) -> i32 {
    (frame_height / 12).max(4).min(frame_height)
}

fn outline(pixels: &mut ArrayViewMut3<u8>, x1: i32, y1: i32, x2: i32, y2: i32, rgb: [u8; 3]) {
    let t = LINE_THICKNESS;
    fill(pixels, x1, y1, x2, y1 + t, rgb);
    fill(pixels, x1, y2 - t, x2, y2, rgb);
    fill(pixels, x1, y1, x1 + t, y2, rgb);
    fill(pixels, x2 - t, y1, x2, y2, rgb);
}

/// Fills the half-open box `[x1, x2) x [y1, y2)`, clipped to the frame.
fn fill(pixels: &mut ArrayViewMut3<u8>, x1: i32, y1: i32, x2: i32, y2: i32, rgb: [u8; 3]) {
    let (h, w, _) = pixels.dim();
    let clip = |v: i32, max: usize| v.clamp(0, max as i32) as usize;
    let (x1, x2) = (clip(x1, w), clip(x2, w));
    let (y1, y2) = (clip(y1, h), clip(y2, h));
    if x1 >= x2 || y1 >= y2 {
        return;
    }

    let mut region = pixels.slice_mut(s![y1..y2, x1..x2, ..]);
    for mut px in region.rows_mut() {
        px[0] = rgb[0];
        px[1] = rgb[1];
        px[2] = rgb[2];
    }
}
