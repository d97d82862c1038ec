//! Uploaded photo normalization.
//!
//! Every upload is re-encoded before leaving the service: decoded with the
//! format sniffer, downscaled to fit the configured bounding square, and
//! written out as baseline JPEG. This strips metadata and gives the
//! inference backend a predictable payload regardless of what the client
//! sent.

use anyhow::Context;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};

const JPEG_QUALITY: u8 = 90;

/// Decode, downscale and re-encode an uploaded photo as JPEG.
///
/// Images already within the bounding square keep their dimensions; larger
/// ones are resized preserving aspect ratio. Fails when the bytes are not a
/// decodable image.
pub fn normalize(bytes: &[u8], max_dimension: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(bytes).context("decode uploaded image")?;

    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .context("encode normalized JPEG")?;

    Ok(out)
}
