use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

pub const MAX_DIMENSION: u32 = 2048;
pub const MAX_ENCODED_BYTES: usize = 3 * 1024 * 1024;
pub const QUALITY_START: u8 = 85;
pub const QUALITY_FLOOR: u8 = 50;
pub const QUALITY_STEP: u8 = 5;

/// Bounded re-encoding of an uploaded image, ready for network transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub data: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub size: usize,
    pub quality: u8,
}

/// Normalizes an arbitrary image blob: alpha flattened onto white, longest
/// side capped at [`MAX_DIMENSION`], JPEG quality stepped down from
/// [`QUALITY_START`] while the encoded size exceeds [`MAX_ENCODED_BYTES`].
/// At [`QUALITY_FLOOR`] the result is returned regardless of size.
pub fn compress_image(bytes: &[u8]) -> Result<CompressedImage> {
    let decoded = image::load_from_memory(bytes).context("input is not a decodable image")?;
    let flattened = flatten_alpha(&decoded);

    let bounded = if flattened.width().max(flattened.height()) > MAX_DIMENSION {
        flattened.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle)
    } else {
        flattened
    };
    let rgb = DynamicImage::ImageRgb8(bounded.to_rgb8());

    let mut quality = QUALITY_START;
    let mut encoded = encode_jpeg(&rgb, quality)?;
    while encoded.len() > MAX_ENCODED_BYTES && quality > QUALITY_FLOOR {
        quality = quality.saturating_sub(QUALITY_STEP).max(QUALITY_FLOOR);
        encoded = encode_jpeg(&rgb, quality)?;
    }

    Ok(CompressedImage {
        data: BASE64.encode(&encoded),
        mime_type: "image/jpeg".to_string(),
        width: rgb.width(),
        height: rgb.height(),
        size: encoded.len(),
        quality,
    })
}

fn flatten_alpha(image: &DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }
    DynamicImage::ImageRgba8(flattened)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(image)
        .context("JPEG encoding failed")?;
    Ok(bytes)
}
