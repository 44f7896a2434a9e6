use image::imageops::overlay;
use image::{DynamicImage, RgbaImage};
use tracing::{debug, info};

use crate::core::processing::padding::{allocate_canvas, center_offsets};
use crate::core::processing::resize::{calculate_fit_dimensions, resize_rgba};
use crate::error::{Error, Result};
use crate::types::{Background, TargetSize};

/// Where the fitted content landed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub content_width: u32,
    pub content_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Contain-fit `source` into `target`, centered on a canvas filled per `background`.
///
/// Solid backgrounds yield an RGB image; transparent backgrounds yield RGBA.
pub fn normalize(
    source: &DynamicImage,
    target: TargetSize,
    background: Background,
) -> Result<DynamicImage> {
    normalize_with_margin(source, target, background, 1.0).map(|(image, _)| image)
}

/// Like [`normalize`], but the content is contained within `margin` of the
/// canvas on each axis (e.g. `0.9` leaves at least 5% padding per side).
pub fn normalize_with_margin(
    source: &DynamicImage,
    target: TargetSize,
    background: Background,
    margin: f64,
) -> Result<(DynamicImage, Placement)> {
    target.validate()?;
    if !(margin > 0.0 && margin <= 1.0) {
        return Err(Error::InvalidConfiguration(format!(
            "margin must be in (0, 1], got {margin}"
        )));
    }
    let (src_w, src_h) = (source.width(), source.height());
    if src_w == 0 || src_h == 0 {
        return Err(Error::Processing(format!(
            "source image has no pixels ({}x{})",
            src_w, src_h
        )));
    }

    let box_w = ((target.width as f64 * margin) as u32).max(1);
    let box_h = ((target.height as f64 * margin) as u32).max(1);
    let (new_w, new_h) = calculate_fit_dimensions(src_w, src_h, box_w, box_h);

    info!(
        "Normalizing {}x{} -> {}x{} canvas (content {}x{}, background {})",
        src_w, src_h, target.width, target.height, new_w, new_h, background
    );

    let rgba: RgbaImage = source.to_rgba8();
    let resized = resize_rgba(&rgba, new_w, new_h)?;

    let mut canvas = allocate_canvas(target, background);
    let (offset_x, offset_y) = center_offsets(target.width, target.height, new_w, new_h);
    debug!("Centering offsets: x={}, y={}", offset_x, offset_y);
    overlay(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    let placement = Placement {
        content_width: new_w,
        content_height: new_h,
        offset_x,
        offset_y,
    };
    let composed = match background {
        Background::Solid(_) => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
        Background::Transparent => DynamicImage::ImageRgba8(canvas),
    };
    Ok((composed, placement))
}
