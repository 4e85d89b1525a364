//! # Capture Session
//!
//! The ephemeral state held during one capture-to-result cycle. The session
//! owns the live camera stream and its readiness gate, and keeps the camera
//! preview and the static image preview mutually exclusive: holding a preview
//! releases the stream, and attaching a stream clears the preview.
//!
//! The externally visible [`CaptureState`] is derived from the fields rather than
//! stored, so it can never disagree with them.

use std::fmt;

use tracing::debug;

use crate::capture::camera::LiveStream;
use crate::capture::readiness::ReadinessGate;

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No preview, no live stream, not analyzing.
    Idle,
    /// Live stream attached, waiting for or showing video.
    CameraPreview,
    /// A still image is held but not yet being analyzed.
    ImagePreview,
    /// A still image is held and the analysis pipeline is in flight.
    Analyzing,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::CameraPreview => "camera preview",
            CaptureState::ImagePreview => "image preview",
            CaptureState::Analyzing => "analyzing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct CaptureSession {
    preview_data: Option<String>,
    analyzing: bool,
    live_stream: Option<LiveStream>,
    readiness: Option<ReadinessGate>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        match (&self.preview_data, self.analyzing, &self.live_stream) {
            (Some(_), true, _) => CaptureState::Analyzing,
            (Some(_), false, _) => CaptureState::ImagePreview,
            (None, _, Some(_)) => CaptureState::CameraPreview,
            (None, _, None) => CaptureState::Idle,
        }
    }

    /// Encoded image shown on screen, if any.
    pub fn preview_data(&self) -> Option<&str> {
        self.preview_data.as_deref()
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn has_live_stream(&self) -> bool {
        self.live_stream.is_some()
    }

    /// True once the live feed played its first frame or the fallback fired.
    pub fn video_ready(&self) -> bool {
        self.readiness.as_ref().is_some_and(|gate| gate.is_ready())
    }

    pub fn live_stream_mut(&mut self) -> Option<&mut LiveStream> {
        self.live_stream.as_mut()
    }

    pub fn readiness(&self) -> Option<&ReadinessGate> {
        self.readiness.as_ref()
    }

    pub fn readiness_mut(&mut self) -> Option<&mut ReadinessGate> {
        self.readiness.as_mut()
    }

    /// Enter camera preview. Any previous stream is released and any preview cleared.
    pub fn attach_stream(&mut self, stream: LiveStream, gate: ReadinessGate) {
        self.release_stream();
        self.preview_data = None;
        self.live_stream = Some(stream);
        self.readiness = Some(gate);
    }

    /// Stop every track of the live stream and cancel the readiness timer.
    /// Returns false when nothing was held.
    pub fn release_stream(&mut self) -> bool {
        if let Some(mut gate) = self.readiness.take() {
            gate.cancel();
        }
        match self.live_stream.take() {
            Some(mut stream) => stream.release(),
            None => false,
        }
    }

    /// Hold a static preview. Releases the live stream first.
    pub fn hold_preview(&mut self, data_url: String) {
        if self.release_stream() {
            debug!("Camera stream released for still preview");
        }
        self.preview_data = Some(data_url);
    }

    /// Mark the held preview as being analyzed. `None` without a preview.
    ///
    /// The session returns to Idle when the guard drops, including when the
    /// future driving the analysis is dropped mid-flight.
    pub fn begin_analysis(&mut self) -> Option<AnalysisGuard<'_>> {
        if self.preview_data.is_none() {
            return None;
        }
        self.analyzing = true;
        Some(AnalysisGuard { session: self })
    }

    /// Return to Idle, releasing everything.
    pub fn reset(&mut self) {
        self.release_stream();
        self.preview_data = None;
        self.analyzing = false;
    }
}

/// Holds a session in Analyzing; resets it on drop.
#[derive(Debug)]
pub struct AnalysisGuard<'a> {
    session: &'a mut CaptureSession,
}

impl AnalysisGuard<'_> {
    pub fn state(&self) -> CaptureState {
        self.session.state()
    }
}

impl Drop for AnalysisGuard<'_> {
    fn drop(&mut self) {
        self.session.reset();
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::camera::MediaStream;
    use meal_frame::{RgbaFrame, Size};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StubStream(Arc<AtomicUsize>);

    impl MediaStream for StubStream {
        fn active_tracks(&self) -> usize {
            1
        }
        fn play(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
        fn video_size(&self) -> Size {
            Size { w: 2, h: 2 }
        }
        fn grab_frame(&mut self) -> anyhow::Result<RgbaFrame> {
            Ok(RgbaFrame::packed(vec![0; 16], 2, 2))
        }
        fn stop_all_tracks(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stub(stops: &Arc<AtomicUsize>) -> LiveStream {
        LiveStream::new(Box::new(StubStream(stops.clone())))
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = CaptureSession::new();
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!session.video_ready());
        assert!(session.preview_data().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preview_releases_stream() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut session = CaptureSession::new();
        session.attach_stream(stub(&stops), ReadinessGate::arm(Duration::from_secs(3)));
        assert_eq!(session.state(), CaptureState::CameraPreview);

        session.hold_preview("data:image/jpeg;base64,AA==".to_string());
        assert_eq!(session.state(), CaptureState::ImagePreview);
        assert!(!session.has_live_stream());
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        let guard = session.begin_analysis().unwrap();
        assert_eq!(guard.state(), CaptureState::Analyzing);

        drop(guard);
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(session.preview_data().is_none());
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_replaces_previous_stream() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut session = CaptureSession::new();
        session.attach_stream(stub(&first), ReadinessGate::arm(Duration::from_secs(3)));
        session.attach_stream(stub(&second), ReadinessGate::arm(Duration::from_secs(3)));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        drop(session);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_begin_analysis_requires_preview() {
        let mut session = CaptureSession::new();
        assert!(session.begin_analysis().is_none());
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[test]
    fn test_analysis_guard_resets_on_early_exit() {
        let mut session = CaptureSession::new();
        session.hold_preview("data:image/png;base64,AA==".to_string());
        {
            let _guard = session.begin_analysis().unwrap();
        }
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!session.is_analyzing());
    }
}
