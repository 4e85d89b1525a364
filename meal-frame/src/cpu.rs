// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGBA8 in → tightly packed RGBA8 out.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeOptions, Resizer};

use crate::presets::{ScalePlan, Size};

#[derive(Debug)]
pub enum ScaleError {
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
        }
    }
}

/// Downscale `src_rgba` to `plan.out`. Strided input is compacted first.
pub fn scale_rgba_cpu(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    src: Size,
    src_stride_bytes: usize,
    plan: &ScalePlan,
) -> Result<Vec<u8>, ScaleError> {
    let tight_row_bytes = (src.w as usize) * 4;
    let staged;
    let src_bytes = if src_stride_bytes == tight_row_bytes {
        &src_rgba[..tight_row_bytes * src.h as usize]
    } else {
        staged = compact(src_rgba, src_stride_bytes, tight_row_bytes, src.h as usize);
        staged.as_slice()
    };
    let src_view = TypedImageRef::<U8x4>::from_buffer(src.w, src.h, src_bytes)?;

    let mut dst = vec![0u8; (plan.out.w as usize) * (plan.out.h as usize) * 4];
    {
        let mut dst_image = TypedImage::<U8x4>::from_buffer(plan.out.w, plan.out.h, &mut dst)?;
        let opts = ResizeOptions::new().use_alpha(false);
        resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;
    }
    Ok(dst)
}

/// Copy `rows` rows of `row_bytes` out of a buffer with `pitch` bytes per row.
pub fn compact(src: &[u8], pitch: usize, row_bytes: usize, rows: usize) -> Vec<u8> {
    if pitch == row_bytes {
        return src[..row_bytes * rows].to_vec();
    }
    let mut dst = Vec::with_capacity(row_bytes * rows);
    for r in 0..rows {
        dst.extend_from_slice(&src[r * pitch..r * pitch + row_bytes]);
    }
    dst
}
