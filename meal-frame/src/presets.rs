// SPDX-License-Identifier: MIT
//! # Output Size Planning
//!
//! Camera stills are clamped on their longest side before encoding so the
//! upload and the inference payload stay a predictable size. Aspect ratio is
//! always preserved and images are never upscaled.

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Computed input/output sizes for one still.
#[derive(Clone, Copy, Debug)]
pub struct ScalePlan {
    pub input: Size,
    pub out: Size,
}

impl ScalePlan {
    /// True when no resampling is needed.
    pub fn is_identity(&self) -> bool {
        self.input == self.out
    }
}

/// Plan the output size for `input`, clamping the longest side to `max_long_side`.
pub fn plan_for(input: Size, max_long_side: Option<u32>) -> ScalePlan {
    let out = match max_long_side {
        Some(max) if max > 0 => {
            let (w, h) = fit_preserve(input, max);
            Size { w, h }
        }
        _ => input,
    };
    ScalePlan { input, out }
}

/// Fit within `max_long` on the longest side. Never upscales, clamps to 1px.
fn fit_preserve(input: Size, max_long: u32) -> (u32, u32) {
    let (w, h) = (input.w as f64, input.h as f64);
    let long = w.max(h);
    if long == 0.0 {
        return (input.w, input.h);
    }
    let s = (max_long as f64 / long).min(1.0);
    (
        ((w * s).round() as u32).max(1),
        ((h * s).round() as u32).max(1),
    )
}
