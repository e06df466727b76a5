//! Before/after picture of a record: the original frame on the left, the
//! normalized frame with its boxes on the right.

use doorcam_core::{BoxXywh, RgbImage, RoiVertices};

use crate::record::{ImageRecord, RecordError};

pub const ANCHOR_COLOR: [u8; 3] = [0, 0, 255];
pub const DOOR_COLOR: [u8; 3] = [255, 0, 0];
pub const TARGET_COLOR: [u8; 3] = [0, 255, 0];
pub const LINE_THICKNESS: i64 = 2;

/// Paint a rectangle outline `thickness` pixels wide, inside `b`. Parts
/// outside the image are skipped.
pub fn draw_box(img: &mut RgbImage, b: &BoxXywh, color: [u8; 3], thickness: i64) {
    let (x0, y0) = (b.x, b.y);
    let (x1, y1) = (b.x + b.width, b.y + b.height);
    for y in y0.max(0)..y1.min(img.height as i64) {
        for x in x0.max(0)..x1.min(img.width as i64) {
            let on_edge =
                x < x0 + thickness || x >= x1 - thickness || y < y0 + thickness || y >= y1 - thickness;
            if on_edge {
                img.set(x as usize, y as usize, color);
            }
        }
    }
}

fn vertices_box(v: &RoiVertices) -> BoxXywh {
    BoxXywh::new(v.top_left.x, v.top_left.y, v.width(), v.height())
}

/// Place `left` and `right` side by side; the shorter one is padded with black.
pub fn hstack(left: &RgbImage, right: &RgbImage) -> RgbImage {
    let width = left.width + right.width;
    let height = left.height.max(right.height);
    let mut out = RgbImage::filled(width, height, [0, 0, 0]);
    for (img, x_off) in [(left, 0), (right, left.width)] {
        for y in 0..img.height {
            let src = &img.data[3 * y * img.width..3 * (y + 1) * img.width];
            let start = 3 * (y * width + x_off);
            out.data[start..start + src.len()].copy_from_slice(src);
        }
    }
    out
}

/// Markup of `record`, running whatever pipeline stages are still pending.
pub fn annotate(record: &mut ImageRecord) -> Result<RgbImage, RecordError> {
    let anchor = record.anchor()?.anchor;
    let door = record.roi()?;
    let target = record.target_vertices()?;

    let mut after = record.normalized()?.frame.clone();
    draw_box(&mut after, &anchor, ANCHOR_COLOR, LINE_THICKNESS);
    draw_box(&mut after, &vertices_box(&door), DOOR_COLOR, LINE_THICKNESS);
    if let Some(t) = target {
        draw_box(&mut after, &vertices_box(&t), TARGET_COLOR, LINE_THICKNESS);
    }
    let before = &record.frame()?.rgb;
    Ok(hstack(before, &after))
}
