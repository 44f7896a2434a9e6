use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tracing::trace;

use crate::error::{Error, Result};

fn encode_with(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format)
        .map_err(|e| Error::Encode(e.to_string()))?;
    let bytes = buf.into_inner();
    trace!("Encoded {:?} ({} bytes)", format, bytes.len());
    Ok(bytes)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    encode_with(image, ImageFormat::Png)
}

/// Lossless WebP; RGB and RGBA only.
pub fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>> {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            encode_with(image, ImageFormat::WebP)
        }
        other if other.color().has_alpha() => {
            encode_with(&DynamicImage::ImageRgba8(other.to_rgba8()), ImageFormat::WebP)
        }
        other => encode_with(&DynamicImage::ImageRgb8(other.to_rgb8()), ImageFormat::WebP),
    }
}
