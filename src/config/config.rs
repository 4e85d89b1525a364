//! # Configuration
//!
//! Configuration for the capture controller and the hosted backend client. It
//! serves as the common interface between the CLI, an embedding UI shell, and the
//! core controller.
//!
//! ## Controller Parameters
//!
//! | Parameter | Type | Default | Description |
//! |-----------|------|---------|-------------|
//! | `device_class` | `DeviceClass` | `Desktop` | Mobile devices use the native picker for "take photo" |
//! | `readiness_timeout` | `Duration` | 3s | Fallback before the camera is treated as ready |
//! | `jpeg_quality` | `u8` | 95 | Quality of captured stills (1-100) |
//! | `max_capture_side` | `Option<u32>` | 1920 | Clamp the longest side of camera stills |
//! | `bucket` | `String` | `meal-images` | Object storage bucket for uploads |
//! | `constraints` | `StreamConstraints` | front, 1280x720 | Camera acquisition preferences |
//!
//! ## Examples
//!
//! ```rust
//! use meal_capture::config::{ControllerConfig, DeviceClass};
//!
//! let mut config = ControllerConfig::default();
//! config.device_class = DeviceClass::from_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)");
//! assert_eq!(config.device_class, DeviceClass::Mobile);
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use crate::capture::camera::StreamConstraints;
use crate::error::{CaptureError, CaptureResult};

/// Default fallback before a live camera feed is considered ready.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const DEFAULT_MAX_CAPTURE_SIDE: u32 = 1920;
pub const DEFAULT_BUCKET: &str = "meal-images";
pub const DEFAULT_IDENTIFY_FUNCTION: &str = "identify-dish";
pub const DEFAULT_MEALS_TABLE: &str = "meals";

const MOBILE_MARKERS: [&str; 8] = [
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Which "take photo" path the controller uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    /// Opens a live camera preview inside the controller.
    #[default]
    Desktop,
    /// Hands off to the platform's native camera picker, which returns a file.
    Mobile,
}

impl DeviceClass {
    /// Classify a browser user agent string.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if MOBILE_MARKERS.iter().any(|marker| ua.contains(marker)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

/// Configuration for [`crate::controller::CaptureController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub device_class: DeviceClass,

    /// How long to wait for the video "playing" event before forcing readiness.
    pub readiness_timeout: Duration,

    /// JPEG quality for camera stills. Must be between 1 and 100.
    pub jpeg_quality: u8,

    /// Longest side of camera stills after downscaling. `None` keeps the native
    /// camera resolution.
    pub max_capture_side: Option<u32>,

    /// Object storage bucket receiving uploaded images.
    pub bucket: String,

    pub constraints: StreamConstraints,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_class: DeviceClass::Desktop,
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_capture_side: Some(DEFAULT_MAX_CAPTURE_SIDE),
            bucket: DEFAULT_BUCKET.to_string(),
            constraints: StreamConstraints::default(),
        }
    }
}

impl ControllerConfig {
    pub fn new(device_class: DeviceClass, bucket: impl Into<String>) -> Self {
        Self {
            device_class,
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> CaptureResult<()> {
        if self.readiness_timeout.is_zero() {
            return Err(CaptureError::config(
                "readiness_timeout",
                "0ms",
                "must be greater than zero",
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(CaptureError::config(
                "jpeg_quality",
                self.jpeg_quality.to_string(),
                "must be between 1 and 100",
            ));
        }
        if self.max_capture_side == Some(0) {
            return Err(CaptureError::config(
                "max_capture_side",
                "0",
                "must be greater than zero when set",
            ));
        }
        if self.bucket.trim().is_empty() || self.bucket.contains('/') {
            return Err(CaptureError::config(
                "bucket",
                self.bucket.clone(),
                "must be a non-empty name without '/'",
            ));
        }
        Ok(())
    }
}

/// Connection settings for [`crate::backend::http::HttpBackend`].
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub base_url: String,
    /// Public API key sent as the `apikey` header.
    pub anon_key: String,
    /// Access token of the signed-in user. Without it identity resolution yields no user.
    pub access_token: Option<String>,
    pub identify_function: String,
    pub meals_table: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            access_token: None,
            identify_function: DEFAULT_IDENTIFY_FUNCTION.to_string(),
            meals_table: DEFAULT_MEALS_TABLE.to_string(),
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn validate(&self) -> CaptureResult<()> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            CaptureError::config("base_url", self.base_url.clone(), e.to_string())
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CaptureError::config(
                "base_url",
                self.base_url.clone(),
                "scheme must be http or https",
            ));
        }
        if self.anon_key.trim().is_empty() {
            return Err(CaptureError::config("anon_key", "", "must not be empty"));
        }
        if self.identify_function.trim().is_empty() {
            return Err(CaptureError::config("identify_function", "", "must not be empty"));
        }
        if self.meals_table.trim().is_empty() {
            return Err(CaptureError::config("meals_table", "", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.device_class, DeviceClass::Desktop);
        assert_eq!(config.readiness_timeout, Duration::from_secs(3));
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.bucket, "meal-images");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ControllerConfig::default();

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.jpeg_quality = 101;
        assert!(config.validate().is_err());
        config.jpeg_quality = 95;

        config.readiness_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.readiness_timeout = DEFAULT_READINESS_TIMEOUT;

        config.bucket = "  ".to_string();
        assert!(config.validate().is_err());
        config.bucket = "a/b".to_string();
        assert!(config.validate().is_err());
        config.bucket = DEFAULT_BUCKET.to_string();

        config.max_capture_side = Some(0);
        assert!(config.validate().is_err());
        config.max_capture_side = None;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_device_class_from_user_agent() {
        let android = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36";
        let desktop = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0";
        assert_eq!(DeviceClass::from_user_agent(android), DeviceClass::Mobile);
        assert_eq!(DeviceClass::from_user_agent(desktop), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_user_agent("Opera Mini/8.0"), DeviceClass::Mobile);
    }

    #[test]
    fn test_backend_config_validation() {
        let config = BackendConfig::new("https://demo.supabase.co", "anon");
        assert!(config.validate().is_ok());
        assert!(BackendConfig::new("not a url", "anon").validate().is_err());
        assert!(BackendConfig::new("ftp://demo", "anon").validate().is_err());
        assert!(BackendConfig::new("https://demo.supabase.co", "").validate().is_err());
    }
}
