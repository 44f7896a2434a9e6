use image::RgbImage;
use jpeg_encoder::{ColorType, Encoder};

use crate::error::{Error, Result};

/// Baseline RGB JPEG into memory. `quality` is clamped to 1..=100.
pub fn encode_rgb_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(Error::Encode(format!(
            "JPEG dimensions {width}x{height} exceed {}",
            u16::MAX
        )));
    }

    let mut out = Vec::new();
    let encoder = Encoder::new(&mut out, quality.clamp(1, 100));
    encoder
        .encode(image.as_raw(), width as u16, height as u16, ColorType::Rgb)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn writes_jfif_marker() {
        let img = RgbImage::from_pixel(16, 8, Rgb([200, 10, 10]));
        let bytes = encode_rgb_jpeg(&img, 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn lower_quality_is_smaller() {
        let img = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8]));
        let hi = encode_rgb_jpeg(&img, 100).unwrap();
        let lo = encode_rgb_jpeg(&img, 10).unwrap();
        assert!(lo.len() < hi.len());
    }
}
