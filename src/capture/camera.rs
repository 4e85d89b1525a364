// # Camera Streams
//
// Abstract camera hardware behind two traits so the controller can drive a
// browser media stream, a native capture backend, or a test double the same way.
// `LiveStream` is the single owner of an open stream and stops every track when
// released or dropped.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use meal_frame::{RgbaFrame, Size};
use tracing::debug;

/// Which camera to prefer when several are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Front-facing ("selfie") camera.
    #[default]
    User,
    /// Rear camera.
    Environment,
}

/// Preferences passed to [`CameraDevice::open`]. Sizes are ideals, not requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Events emitted by the video sink a stream is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    /// Stream metadata (dimensions) is known; playback can start.
    MetadataLoaded,
    /// The first frame has been decoded and playback began.
    Playing,
}

/// An open camera stream attached to a renderable video sink.
pub trait MediaStream: Send {
    /// Number of media tracks still live.
    fn active_tracks(&self) -> usize;

    /// Starts playback on the attached video sink.
    fn play(&mut self) -> Result<()>;

    /// Rendered video dimensions. Zero until the first frame has been decoded.
    fn video_size(&self) -> Size;

    /// Rasterizes the frame currently shown by the video sink.
    ///
    /// # Returns
    ///
    /// The RGBA pixels of the current frame, or an error if no drawing surface
    /// could be created.
    fn grab_frame(&mut self) -> Result<RgbaFrame>;

    /// Stops every track. Must be safe to call more than once.
    fn stop_all_tracks(&mut self);
}

/// Source of camera streams.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Acquires a video stream matching `constraints` as closely as possible.
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn MediaStream>>;
}

/// Camera for hosts without capture hardware; every acquisition fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

#[async_trait]
impl CameraDevice for NoCamera {
    async fn open(&self, _constraints: &StreamConstraints) -> Result<Box<dyn MediaStream>> {
        Err(anyhow!("no camera device available"))
    }
}

/// Exclusive owner of an open [`MediaStream`].
pub struct LiveStream {
    inner: Option<Box<dyn MediaStream>>,
}

impl LiveStream {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            inner: Some(stream),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    pub fn video_size(&self) -> Size {
        self.inner
            .as_ref()
            .map(|s| s.video_size())
            .unwrap_or(Size { w: 0, h: 0 })
    }

    pub fn play(&mut self) -> Result<()> {
        match self.inner.as_mut() {
            Some(stream) => stream.play(),
            None => Err(anyhow!("stream already released")),
        }
    }

    pub fn grab_frame(&mut self) -> Result<RgbaFrame> {
        match self.inner.as_mut() {
            Some(stream) => stream.grab_frame(),
            None => Err(anyhow!("stream already released")),
        }
    }

    /// Stops all tracks and drops the stream. Returns false if already released.
    pub fn release(&mut self) -> bool {
        match self.inner.take() {
            Some(mut stream) => {
                let tracks = stream.active_tracks();
                stream.stop_all_tracks();
                debug!(tracks, "Released camera stream");
                true
            }
            None => false,
        }
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStream")
            .field("active", &self.is_active())
            .finish()
    }
}
