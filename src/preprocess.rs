use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbImage;

// Images wider than this are downscaled before analysis. Detection quality
// does not improve past this width and encoding cost grows quadratically.
pub const MAX_IMAGE_WIDTH: u32 = 640;

/// Decode a base64 payload into raw encoded-image bytes.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    Ok(BASE64.decode(data)?)
}

/// Decode an encoded image (PNG, JPEG, ...) and normalize it for analysis:
/// downscale to at most `MAX_IMAGE_WIDTH` wide with the aspect ratio
/// preserved, then convert to 8-bit RGB. Client and database images go
/// through this same path so encodings stay comparable.
pub fn prepare_image(bytes: &[u8]) -> Result<RgbImage> {
    let img = image::load_from_memory(bytes)?;

    let (width, height) = (img.width(), img.height());
    let img = if width > MAX_IMAGE_WIDTH {
        let ratio = MAX_IMAGE_WIDTH as f64 / width as f64;
        let new_height = ((height as f64 * ratio) as u32).max(1);
        // thumbnail_exact is an area-averaging downscale
        img.thumbnail_exact(MAX_IMAGE_WIDTH, new_height)
    } else {
        img
    };

    Ok(img.to_rgb8())
}
