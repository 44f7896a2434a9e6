use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::{DynamicImage, RgbaImage};
use tracing::debug;

use crate::error::{Error, Result};

/// Side of the thumbnail used to pick a background color.
pub const SAMPLE_GRID: u32 = 50;

/// Largest aspect-preserving size of `src` that fits inside `box_w` x `box_h`.
///
/// Dimensions are rounded half-up, never drop below 1, and never exceed the box.
pub fn calculate_fit_dimensions(src_w: u32, src_h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
    let src_w = src_w.max(1);
    let src_h = src_h.max(1);
    let scale = (box_w as f64 / src_w as f64).min(box_h as f64 / src_h as f64);

    let round_half_up = |v: f64| (v + 0.5).floor() as u32;
    let new_w = round_half_up(src_w as f64 * scale).clamp(1, box_w.max(1));
    let new_h = round_half_up(src_h as f64 * scale).clamp(1, box_h.max(1));

    debug!(
        "Fit {}x{} into {}x{}: scale={:.5}, new size {}x{}",
        src_w, src_h, box_w, box_h, scale, new_w, new_h
    );
    (new_w, new_h)
}

/// Resamples an RGBA buffer with the given convolution filter. Alpha is
/// premultiplied during resampling so transparent pixels do not bleed color.
pub fn resize_rgba_with(
    image: &RgbaImage,
    target_w: u32,
    target_h: u32,
    filter: FilterType,
) -> Result<RgbaImage> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(Error::Processing("cannot resample an empty image".to_string()));
    }
    if target_w == 0 || target_h == 0 {
        return Err(Error::InvalidConfiguration(format!(
            "resample target must be positive, got {}x{}",
            target_w, target_h
        )));
    }

    let resize_options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(filter));
    let mut resizer = Resizer::new();

    let src_image = Image::from_vec_u8(src_w, src_h, image.as_raw().clone(), PixelType::U8x4)
        .map_err(Error::external)?;
    let mut dst_image = Image::new(target_w, target_h, PixelType::U8x4);
    resizer
        .resize(&src_image, &mut dst_image, &resize_options)
        .map_err(Error::external)?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| Error::Processing("resampled buffer has unexpected length".to_string()))
}

/// Lanczos3 resample, the filter used for every deliverable image.
pub fn resize_rgba(image: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage> {
    if image.dimensions() == (target_w, target_h) {
        debug!("Source already {}x{}, skipping resample", target_w, target_h);
        return Ok(image.clone());
    }
    resize_rgba_with(image, target_w, target_h, FilterType::Lanczos3)
}

/// Color of the center pixel of a 50x50 bicubic thumbnail. Alpha is ignored.
pub fn sample_center_color(image: &DynamicImage) -> Result<[u8; 3]> {
    let rgba = image.to_rgba8();
    let thumb = resize_rgba_with(&rgba, SAMPLE_GRID, SAMPLE_GRID, FilterType::CatmullRom)?;
    let px = thumb.get_pixel(SAMPLE_GRID / 2, SAMPLE_GRID / 2);
    Ok([px[0], px[1], px[2]])
}
