use image::DynamicImage;
use tracing::debug;

use crate::error::{Error, Result};

/// Decodes PNG, JPEG or WebP bytes. Anything else, or a truncated file, is a
/// `Decode` error and nothing is produced.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let format = image::guess_format(bytes).map_err(Error::Decode)?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(Error::Decode)?;
    debug!(
        "Decoded {:?} image {}x{} ({:?})",
        format,
        img.width(),
        img.height(),
        img.color()
    );
    Ok(img)
}
