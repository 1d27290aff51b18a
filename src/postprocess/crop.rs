//! Content-aware cropping
//!
//! Scanned and digital pages often carry wide white margins. The page is
//! thresholded (anything darker than near-white counts as content) and
//! cropped to the bounding box of all content plus a small padding.

use image::GrayImage;

/// Luma value above which a pixel is treated as background
pub const BACKGROUND_THRESHOLD: u8 = 250;

/// Pixels kept around the detected content on every side
pub const CROP_PADDING: u32 = 10;

/// A rectangle inside an image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Finds the padded bounding box of every content pixel
///
/// A pixel is content when its luma is at most `threshold`. The box is grown
/// by `padding` on each side and clamped to the image.
///
/// # Returns
///
/// * `Some(Bounds)` - The region to keep
/// * `None` - The page has no content at all (blank page)
pub fn content_bounds(gray: &GrayImage, threshold: u8, padding: u32) -> Option<Bounds> {
    let (width, height) = gray.dimensions();

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] <= threshold {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return None;
    }

    let x0 = min_x.saturating_sub(padding);
    let y0 = min_y.saturating_sub(padding);
    let x1 = max_x.saturating_add(1).saturating_add(padding).min(width);
    let y1 = max_y.saturating_add(1).saturating_add(padding).min(height);

    Some(Bounds {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}
