//! # Capture Controller
//!
//! Drives image acquisition (file picker or live camera), the static preview,
//! and exactly one analysis pipeline run per captured image.
//!
//! ## States
//!
//! ```text
//!            take_photo (desktop)            capture (ready)
//!   Idle ─────────────────────────▶ CameraPreview ──────────▶ ImagePreview ─▶ Analyzing
//!    ▲  ◀──────── cancel ───────────────┘                                        │
//!    │                                                                           │
//!    ├── submit_file (upload / mobile picker) ─────────────────────▶ Analyzing   │
//!    └──────────────────────── pipeline resolves (success or failure) ◀──────────┘
//! ```
//!
//! ## Failure Handling
//!
//! Every failure is turned into one transient [`Notice`] and the controller
//! returns to the state named by the transition table. The completion handler
//! only ever sees successful results, exactly once per successful run. Entry
//! points still return [`CaptureResult`] so the host shell can re-enable its
//! controls.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::backend::{Clock, MealBackend, SystemClock};
use crate::capture::camera::{CameraDevice, LiveStream, NoCamera, VideoEvent};
use crate::capture::image::{EncodedImage, ImageFile};
use crate::capture::readiness::ReadinessGate;
use crate::config::{ControllerConfig, DeviceClass};
use crate::error::{CaptureError, CaptureResult, ErrorSeverity, HasSeverity};
use crate::model::AnalysisResult;
use crate::pipeline::AnalysisPipeline;
use crate::session::{CaptureSession, CaptureState};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A transient message for the user (toast, status line, stderr).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn from_error(error: &CaptureError) -> Self {
        let level = if error.severity() <= ErrorSeverity::Warning {
            NoticeLevel::Warning
        } else {
            NoticeLevel::Error
        };
        let title = match error {
            CaptureError::InvalidInput { .. } => "Invalid input",
            CaptureError::DeviceAccess { .. } => "Camera error",
            CaptureError::Rendering { .. } => "Capture failed",
            CaptureError::Busy { .. } => "Please wait",
            _ => "Analysis failed",
        };
        Self {
            level,
            title: title.to_string(),
            message: error.user_message(),
        }
    }
}

/// Sink for user-facing notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Forwards notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(title = %notice.title, "{}", notice.message),
            NoticeLevel::Warning => warn!(title = %notice.title, "{}", notice.message),
            NoticeLevel::Error => error!(title = %notice.title, "{}", notice.message),
        }
    }
}

/// Receives each successful result.
pub type CompletionHandler = Box<dyn FnMut(AnalysisResult) + Send>;

/// Outcome of [`CaptureController::take_photo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoRoute {
    /// A live preview is open; call [`CaptureController::capture`] once ready.
    CameraPreview,
    /// The host should open the platform's native camera picker and pass the
    /// resulting file to [`CaptureController::submit_file`].
    NativePicker,
}

pub struct CaptureController {
    config: ControllerConfig,
    camera: Arc<dyn CameraDevice>,
    pipeline: Arc<AnalysisPipeline>,
    notifier: Arc<dyn Notifier>,
    on_complete: CompletionHandler,
    session: CaptureSession,
}

impl CaptureController {
    pub fn builder() -> CaptureControllerBuilder {
        CaptureControllerBuilder::new()
    }

    pub fn state(&self) -> CaptureState {
        self.session.state()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_video_ready(&self) -> bool {
        self.session.video_ready()
    }

    /// Resolves when the open camera preview becomes ready. False without one.
    pub async fn wait_video_ready(&self) -> bool {
        match self.session.readiness() {
            Some(gate) => gate.wait_ready().await,
            None => false,
        }
    }

    /// "Take photo": open the live camera on desktop, or defer to the native
    /// picker on mobile.
    pub async fn take_photo(&mut self) -> CaptureResult<PhotoRoute> {
        self.ensure_not_analyzing("take a photo")?;
        if self.config.device_class == DeviceClass::Mobile {
            debug!("Mobile device: deferring to native camera picker");
            return Ok(PhotoRoute::NativePicker);
        }

        // A new session starts: release whatever the previous one held.
        self.session.reset();

        match self.camera.open(&self.config.constraints).await {
            Ok(stream) => {
                let gate = ReadinessGate::arm(self.config.readiness_timeout);
                self.session.attach_stream(LiveStream::new(stream), gate);
                info!(facing = ?self.config.constraints.facing, "Camera preview opened");
                Ok(PhotoRoute::CameraPreview)
            }
            Err(e) => {
                error!("Camera acquisition failed: {:#}", e);
                let err = CaptureError::device_access(e.to_string());
                self.notifier.notify(Notice::from_error(&err));
                Err(err)
            }
        }
    }

    /// Feed an event from the video sink the stream is attached to.
    pub fn on_video_event(&mut self, event: VideoEvent) {
        if !self.session.has_live_stream() {
            debug!(?event, "Video event without a live stream; ignoring");
            return;
        }
        match event {
            VideoEvent::MetadataLoaded => {
                if let Some(stream) = self.session.live_stream_mut() {
                    if let Err(e) = stream.play() {
                        warn!("Video playback did not start: {:#}", e);
                    }
                }
            }
            VideoEvent::Playing => {
                if let Some(gate) = self.session.readiness_mut() {
                    gate.signal_playing();
                    debug!("Camera reported playing");
                }
            }
        }
    }

    /// Grab the current camera frame and analyze it.
    ///
    /// Rejected with `InvalidInput` (state unchanged, nothing rasterized) until
    /// the video is ready and has non-zero dimensions. A rendering failure keeps
    /// the stream open for another try.
    pub async fn capture(&mut self) -> CaptureResult<AnalysisResult> {
        if self.state() != CaptureState::CameraPreview {
            return Err(self.report(CaptureError::invalid_input(
                "camera",
                "Open the camera before capturing a photo",
            )));
        }

        let size = self
            .session
            .live_stream_mut()
            .map(|s| s.video_size())
            .unwrap_or(meal_frame::Size { w: 0, h: 0 });
        if !self.session.video_ready() || size.is_empty() {
            return Err(self.report(
                CaptureError::invalid_input(
                    "camera",
                    "Camera is not ready yet. Please wait a moment and try again.",
                )
                .with_metadata("width", size.w.to_string())
                .with_metadata("height", size.h.to_string()),
            ));
        }

        let frame = match self.session.live_stream_mut().map(|s| s.grab_frame()) {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                return Err(self.report(CaptureError::rendering(e.to_string())));
            }
            None => {
                return Err(self.report(CaptureError::rendering("camera stream was released")));
            }
        };

        let opts = meal_frame::StillOptions {
            quality: self.config.jpeg_quality,
            max_long_side: self.config.max_capture_side,
        };
        let still = match meal_frame::rasterize(&frame, &opts) {
            Ok(still) => still,
            Err(e) => return Err(self.report(CaptureError::from(e))),
        };
        debug!(width = still.size.w, height = still.size.h, bytes = still.jpeg.len(), "Captured still");

        let image = EncodedImage::from_still(still);
        self.session.hold_preview(image.data_url.clone());
        self.analyze(image).await
    }

    /// "Upload", or the file returned by the mobile native picker.
    ///
    /// Non-image files are rejected before any network call, leaving the
    /// current state (including an open camera preview) untouched.
    pub async fn submit_file(&mut self, file: ImageFile) -> CaptureResult<AnalysisResult> {
        self.ensure_not_analyzing("upload an image")?;
        let image = match EncodedImage::from_file(file) {
            Ok(image) => image,
            Err(err) => return Err(self.report(err)),
        };
        self.session.hold_preview(image.data_url.clone());
        self.analyze(image).await
    }

    /// Close the camera preview. Idempotent; does nothing while analyzing.
    pub fn cancel(&mut self) {
        if self.session.is_analyzing() {
            debug!("Cancel ignored while analysis is in flight");
            return;
        }
        if self.session.release_stream() {
            info!("Camera preview cancelled");
        }
        self.session.reset();
    }

    async fn analyze(&mut self, image: EncodedImage) -> CaptureResult<AnalysisResult> {
        if self.session.preview_data().is_none() {
            return Err(self.report(CaptureError::invalid_input("image", "No image to analyze")));
        }
        // Dropping this future mid-run still returns the session to Idle.
        let guard = self.session.begin_analysis();
        info!(name = %image.name, size = image.bytes.len(), "Analyzing image");

        let outcome = self.pipeline.run(&image).await;
        drop(guard);

        match outcome {
            Ok(result) => {
                self.notifier.notify(Notice::success(
                    "Meal analyzed",
                    format!("Identified {}", result.dish_name),
                ));
                (self.on_complete)(result.clone());
                Ok(result)
            }
            Err(err) => {
                error!(
                    step = err.pipeline_step().map(|s| s.as_str()).unwrap_or("-"),
                    "Analysis failed: {:#}",
                    err
                );
                self.notifier.notify(Notice::from_error(&err));
                Err(err)
            }
        }
    }

    fn ensure_not_analyzing(&self, attempted: &str) -> CaptureResult<()> {
        if self.session.is_analyzing() || self.pipeline.is_running() {
            let err = CaptureError::busy(
                CaptureState::Analyzing.to_string(),
                attempted,
                "An image is already being analyzed",
            );
            self.notifier.notify(Notice::from_error(&err));
            return Err(err);
        }
        Ok(())
    }

    fn report(&self, err: CaptureError) -> CaptureError {
        warn!(category = err.category(), "{}", err);
        self.notifier.notify(Notice::from_error(&err));
        err
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`CaptureController`].
pub struct CaptureControllerBuilder {
    config: ControllerConfig,
    backend: Option<Arc<dyn MealBackend>>,
    camera: Option<Arc<dyn CameraDevice>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
    on_complete: Option<CompletionHandler>,
}

impl CaptureControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: ControllerConfig::default(),
            backend: None,
            camera: None,
            notifier: None,
            clock: None,
            on_complete: None,
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_backend<B: MealBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    pub fn with_shared_backend(mut self, backend: Arc<dyn MealBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_camera(mut self, camera: Arc<dyn CameraDevice>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn on_complete<F>(mut self, handler: F) -> Self
    where
        F: FnMut(AnalysisResult) + Send + 'static,
    {
        self.on_complete = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> CaptureResult<CaptureController> {
        self.config.validate()?;
        let backend = self
            .backend
            .ok_or_else(|| CaptureError::config("backend", "none", "a backend must be provided"))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let pipeline = AnalysisPipeline::with_clock(backend, clock, self.config.bucket.clone());

        Ok(CaptureController {
            camera: self.camera.unwrap_or_else(|| Arc::new(NoCamera)),
            pipeline: Arc::new(pipeline),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
            on_complete: self.on_complete.unwrap_or_else(|| Box::new(|_| {})),
            session: CaptureSession::new(),
            config: self.config,
        })
    }
}

impl Default for CaptureControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_from_invalid_input_is_warning() {
        let notice = Notice::from_error(&CaptureError::invalid_input("file", "Please select an image file"));
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.message, "Please select an image file");
    }

    #[test]
    fn test_notice_from_pipeline_failure_is_error() {
        let err = CaptureError::unauthenticated();
        let notice = Notice::from_error(&err);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.title, "Analysis failed");
    }

    #[test]
    fn test_builder_requires_backend() {
        let err = CaptureController::builder().build().unwrap_err();
        assert_eq!(err.category(), "config");
    }
}
