// SPDX-License-Identifier: MIT
//! # meal-frame: Still-Frame Rasterization for Meal Photos
//!
//! Turns a raw RGBA video frame grabbed from a live camera into the two
//! representations the analysis pipeline needs:
//!
//! 1. a JPEG byte payload that is uploaded to object storage, and
//! 2. a base64 `data:` URL used for the on-screen preview and the inference call.
//!
//! ## Key Components
//!
//! - [`presets`]: Output size planning (clamp the longest side, never upscale)
//! - [`cpu`]: SIMD downscaling built on `fast_image_resize`
//! - [`encode`]: JPEG encoding and data URL construction
//!
//! ## Usage Example
//!
//! ```rust
//! use meal_frame::{rasterize, RgbaFrame, StillOptions};
//!
//! let frame = RgbaFrame::packed(vec![200u8; 8 * 6 * 4], 8, 6);
//! let still = rasterize(&frame, &StillOptions::default()).unwrap();
//! assert!(still.data_url.starts_with("data:image/jpeg;base64,"));
//! assert_eq!(still.jpeg[..2], [0xFF, 0xD8]);
//! ```

pub mod cpu;
pub mod encode;
pub mod presets;

use std::fmt;

pub use presets::Size;

/// Media type of every still produced by [`rasterize`].
pub const STILL_MEDIA_TYPE: &str = "image/jpeg";

/// A single decoded video frame in RGBA8 layout.
#[derive(Clone, Debug)]
pub struct RgbaFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row. Equal to `width * 4` for tightly packed frames.
    pub stride: usize,
}

impl RgbaFrame {
    /// Wrap a tightly packed RGBA buffer.
    pub fn packed(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            stride: width as usize * 4,
        }
    }

    pub fn size(&self) -> Size {
        Size {
            w: self.width,
            h: self.height,
        }
    }
}

/// Errors raised while turning a frame into a still image.
#[derive(Debug)]
pub enum FrameError {
    /// The frame has no rendered pixels yet.
    EmptyFrame,
    /// The buffer is shorter than `stride * height`.
    BufferTooSmall { expected: usize, actual: usize },
    /// Stride is narrower than a packed row.
    BadStride { stride: usize, row_bytes: usize },
    Scale(cpu::ScaleError),
    Encode(image::ImageError),
}

impl From<cpu::ScaleError> for FrameError {
    fn from(e: cpu::ScaleError) -> Self {
        Self::Scale(e)
    }
}

impl From<image::ImageError> for FrameError {
    fn from(e: image::ImageError) -> Self {
        Self::Encode(e)
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::EmptyFrame => write!(f, "Frame has zero width or height"),
            FrameError::BufferTooSmall { expected, actual } => write!(
                f,
                "Frame buffer too small: expected {} bytes, got {}",
                expected, actual
            ),
            FrameError::BadStride { stride, row_bytes } => write!(
                f,
                "Frame stride {} is smaller than row size {}",
                stride, row_bytes
            ),
            FrameError::Scale(e) => write!(f, "Scaling failed: {}", e),
            FrameError::Encode(e) => write!(f, "JPEG encoding failed: {}", e),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Scale(e) => Some(e),
            FrameError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

/// How a still should be produced.
#[derive(Clone, Copy, Debug)]
pub struct StillOptions {
    /// JPEG quality, 1..=100.
    pub quality: u8,
    /// Clamp the longest side before encoding. `None` keeps native resolution.
    pub max_long_side: Option<u32>,
}

impl Default for StillOptions {
    fn default() -> Self {
        Self {
            quality: 95,
            max_long_side: None,
        }
    }
}

/// An encoded still frame.
#[derive(Clone, Debug)]
pub struct StillImage {
    pub jpeg: Vec<u8>,
    pub data_url: String,
    pub size: Size,
}

/// Rasterize a frame into a JPEG payload plus a base64 data URL of the same bytes.
pub fn rasterize(frame: &RgbaFrame, opts: &StillOptions) -> Result<StillImage, FrameError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(FrameError::EmptyFrame);
    }
    let row_bytes = frame.width as usize * 4;
    if frame.stride < row_bytes {
        return Err(FrameError::BadStride {
            stride: frame.stride,
            row_bytes,
        });
    }
    let expected = frame.stride * (frame.height as usize - 1) + row_bytes;
    if frame.data.len() < expected {
        return Err(FrameError::BufferTooSmall {
            expected,
            actual: frame.data.len(),
        });
    }

    let plan = presets::plan_for(frame.size(), opts.max_long_side);
    let packed = if plan.is_identity() {
        cpu::compact(&frame.data, frame.stride, row_bytes, frame.height as usize)
    } else {
        let mut resizer = fast_image_resize::Resizer::new();
        cpu::scale_rgba_cpu(&mut resizer, &frame.data, frame.size(), frame.stride, &plan)?
    };

    let jpeg = encode::encode_jpeg(&packed, plan.out, opts.quality)?;
    let data_url = encode::data_url(STILL_MEDIA_TYPE, &jpeg);
    Ok(StillImage {
        jpeg,
        data_url,
        size: plan.out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbaFrame {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[(x * 255 / w) as u8, (y * 255 / h) as u8, 128, 255]);
            }
        }
        RgbaFrame::packed(data, w, h)
    }

    #[test]
    fn test_rasterize_native_size() {
        let still = rasterize(&gradient(32, 24), &StillOptions::default()).unwrap();
        assert_eq!(still.size, Size { w: 32, h: 24 });
        assert_eq!(&still.jpeg[..2], &[0xFF, 0xD8]);
        assert!(still.data_url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_rasterize_downscales_long_side() {
        let opts = StillOptions {
            quality: 90,
            max_long_side: Some(16),
        };
        let still = rasterize(&gradient(64, 32), &opts).unwrap();
        assert_eq!(still.size, Size { w: 16, h: 8 });
    }

    #[test]
    fn test_rasterize_rejects_empty_frame() {
        let frame = RgbaFrame::packed(Vec::new(), 0, 0);
        assert!(matches!(
            rasterize(&frame, &StillOptions::default()),
            Err(FrameError::EmptyFrame)
        ));
    }

    #[test]
    fn test_rasterize_rejects_short_buffer() {
        let frame = RgbaFrame::packed(vec![0u8; 10], 4, 4);
        assert!(matches!(
            rasterize(&frame, &StillOptions::default()),
            Err(FrameError::BufferTooSmall { expected: 64, actual: 10 })
        ));
    }

    #[test]
    fn test_rasterize_strided_frame() {
        // 4x2 frame with 8 bytes of row padding
        let mut data = vec![0u8; 24 * 2];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&[10, 20, 30, 255]);
        }
        let frame = RgbaFrame {
            data,
            width: 4,
            height: 2,
            stride: 24,
        };
        let still = rasterize(&frame, &StillOptions::default()).unwrap();
        assert_eq!(still.size, Size { w: 4, h: 2 });
    }
}
