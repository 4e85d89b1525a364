// # Image Payloads
//
// `ImageFile` is what a file picker (or the native mobile camera) hands over.
// `EncodedImage` is what the analysis pipeline consumes: the raw bytes for
// object storage plus a base64 data URL for preview and inference.

use std::path::Path;

use image::ImageFormat;
use meal_frame::{StillImage, encode};

use crate::error::{CaptureError, CaptureResult};

/// File name given to stills captured from the live camera.
pub const CAMERA_CAPTURE_NAME: &str = "camera-capture.jpg";

const FALLBACK_EXTENSION: &str = "bin";

/// A user-chosen file with its declared media type.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring the media type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> CaptureResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            CaptureError::io("read image", Some(path.display().to_string()), e)
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = ImageFormat::from_path(path)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        Ok(Self::new(name, media_type, bytes))
    }

    /// True when the declared media type is `image/*`.
    pub fn is_image(&self) -> bool {
        self.media_type
            .split('/')
            .next()
            .is_some_and(|top| top.trim().eq_ignore_ascii_case("image"))
            && self.media_type.contains('/')
    }

    /// Reject anything that does not declare an image media type.
    pub fn validate(&self) -> CaptureResult<()> {
        if !self.is_image() {
            return Err(CaptureError::invalid_input("file", "Please select an image file")
                .with_metadata("media_type", self.media_type.clone())
                .with_metadata("name", self.name.clone()));
        }
        if self.bytes.is_empty() {
            return Err(CaptureError::invalid_input("file", "The selected image is empty")
                .with_metadata("name", self.name.clone()));
        }
        Ok(())
    }
}

/// An image ready for the analysis pipeline.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
    pub data_url: String,
}

impl EncodedImage {
    /// Validate and encode a picked file.
    pub fn from_file(file: ImageFile) -> CaptureResult<Self> {
        file.validate()?;
        let data_url = encode::data_url(&file.media_type, &file.bytes);
        Ok(Self {
            name: file.name,
            media_type: file.media_type,
            bytes: file.bytes,
            data_url,
        })
    }

    pub fn from_still(still: StillImage) -> Self {
        Self {
            name: CAMERA_CAPTURE_NAME.to_string(),
            media_type: meal_frame::STILL_MEDIA_TYPE.to_string(),
            bytes: still.jpeg,
            data_url: still.data_url,
        }
    }

    /// Extension used in the storage key: the file name's, else one derived
    /// from the media type.
    pub fn extension(&self) -> String {
        if let Some((stem, ext)) = self.name.rsplit_once('.') {
            if !stem.is_empty() && !ext.is_empty() {
                return ext.to_ascii_lowercase();
            }
        }
        ImageFormat::from_mime_type(&self.media_type)
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or(FALLBACK_EXTENSION)
            .to_string()
    }
}
