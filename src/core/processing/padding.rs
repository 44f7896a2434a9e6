use image::{Rgba, RgbaImage};

use crate::types::{Background, TargetSize};

/// Offsets that center `content` inside `canvas`. Odd leftover space puts the
/// extra pixel on the right/bottom.
pub fn center_offsets(canvas_w: u32, canvas_h: u32, content_w: u32, content_h: u32) -> (u32, u32) {
    (
        canvas_w.saturating_sub(content_w) / 2,
        canvas_h.saturating_sub(content_h) / 2,
    )
}

/// Canvas filled per the background policy. Solid canvases are fully opaque;
/// transparent canvases are all zero.
pub fn allocate_canvas(target: TargetSize, background: Background) -> RgbaImage {
    let fill = match background {
        Background::Solid([r, g, b]) => Rgba([r, g, b, 255]),
        Background::Transparent => Rgba([0, 0, 0, 0]),
    };
    RgbaImage::from_pixel(target.width, target.height, fill)
}
