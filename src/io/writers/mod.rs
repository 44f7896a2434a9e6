pub mod jpeg;
pub mod manifest;
pub mod raster;

use image::DynamicImage;

use crate::error::Result;
use crate::types::OutputFormat;

/// Encodes a normalized image to the bytes of `format`.
///
/// `quality` is only consulted for JPEG. Alpha is dropped for JPEG; callers
/// reject a transparent background with JPEG output before reaching here.
pub fn encode_image(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Png => raster::encode_png(image),
        OutputFormat::Webp => raster::encode_webp(image),
        OutputFormat::Jpg => jpeg::encode_rgb_jpeg(&image.to_rgb8(), quality),
    }
}
