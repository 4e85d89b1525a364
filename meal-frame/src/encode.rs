// SPDX-License-Identifier: MIT
//! JPEG encoding and base64 data URLs.

use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageError};

use crate::presets::Size;

/// Encode tightly packed RGBA8 pixels as JPEG. Alpha is discarded.
pub fn encode_jpeg(rgba: &[u8], size: Size, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb: Vec<u8> = rgba
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut out = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        encoder.encode(&rgb, size.w, size.h, ExtendedColorType::Rgb8)?;
    }
    Ok(out)
}

/// `data:{media_type};base64,{payload}`
pub fn data_url(media_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        media_type,
        general_purpose::STANDARD.encode(bytes)
    )
}
