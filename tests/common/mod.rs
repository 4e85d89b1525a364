//! Common test doubles for the capture controller tests
//!
//! Recording backend, scriptable camera, collecting notifier and a fixed clock.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use meal_capture::backend::{Clock, MealBackend};
use meal_capture::capture::camera::{CameraDevice, MediaStream, StreamConstraints};
use meal_capture::error::PipelineStep;
use meal_capture::model::{AnalysisResult, DishIdentification, Identity, MealRecord};
use meal_capture::{Notice, Notifier};
use meal_frame::{RgbaFrame, Size};
use tokio::sync::Notify;

pub const FIXED_MILLIS: u128 = 1_700_000_000_000;
pub const CDN: &str = "https://cdn.example.com/storage/v1/object/public";

/// Calls observed by [`MockBackend`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CurrentUser,
    Upload {
        bucket: String,
        key: String,
        size: usize,
        content_type: String,
    },
    PublicUrl {
        key: String,
    },
    Identify {
        image: String,
    },
    Insert(MealRecord),
}

/// Pauses `identify_dish` until released.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

pub struct MockBackend {
    pub identity: Option<Identity>,
    pub dish: DishIdentification,
    pub failing: Mutex<HashSet<PipelineStep>>,
    pub failure_message: String,
    pub calls: Mutex<Vec<Call>>,
    pub gate: Option<Arc<Gate>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            identity: Some(Identity { id: "u1".to_string() }),
            dish: apple(),
            failing: Mutex::new(HashSet::new()),
            failure_message: String::new(),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            identity: None,
            ..Self::new()
        }
    }

    pub fn failing_at(step: PipelineStep, message: &str) -> Self {
        let backend = Self {
            failure_message: message.to_string(),
            ..Self::new()
        };
        backend.failing.lock().unwrap().insert(step);
        backend
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Upload { .. }))
            .collect()
    }

    pub fn inserts(&self) -> Vec<MealRecord> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Insert(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, step: PipelineStep) -> Result<()> {
        if self.failing.lock().unwrap().contains(&step) {
            return Err(anyhow!("{}", self.failure_message));
        }
        Ok(())
    }
}

#[async_trait]
impl MealBackend for MockBackend {
    async fn current_user(&self) -> Result<Option<Identity>> {
        self.record(Call::CurrentUser);
        self.check(PipelineStep::Identity)?;
        Ok(self.identity.clone())
    }

    async fn upload(&self, bucket: &str, key: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        self.record(Call::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: bytes.len(),
            content_type: content_type.to_string(),
        });
        self.check(PipelineStep::Upload)
    }

    async fn public_url(&self, bucket: &str, key: &str) -> Result<String> {
        self.record(Call::PublicUrl { key: key.to_string() });
        self.check(PipelineStep::PublicUrl)?;
        Ok(format!("{}/{}/{}", CDN, bucket, key))
    }

    async fn identify_dish(&self, image: &str) -> Result<DishIdentification> {
        self.record(Call::Identify {
            image: image.to_string(),
        });
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.check(PipelineStep::Inference)?;
        Ok(self.dish.clone())
    }

    async fn insert_meal(&self, record: &MealRecord) -> Result<()> {
        self.record(Call::Insert(record.clone()));
        self.check(PipelineStep::Persistence)
    }
}

pub fn apple() -> DishIdentification {
    DishIdentification {
        dish_name: "apple".to_string(),
        calories: 95.0,
        protein: 0.5,
        carbs: 25.0,
        fat: 0.3,
        confidence: 0.92,
    }
}

pub struct FixedClock(pub u128);

impl Clock for FixedClock {
    fn now_millis(&self) -> u128 {
        self.0
    }
}

#[derive(Default)]
pub struct CollectingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Collects every result handed to the completion handler.
#[derive(Clone, Default)]
pub struct Completions(pub Arc<Mutex<Vec<AnalysisResult>>>);

impl Completions {
    pub fn handler(&self) -> impl FnMut(AnalysisResult) + Send + 'static {
        let sink = self.0.clone();
        move |result| sink.lock().unwrap().push(result)
    }

    pub fn all(&self) -> Vec<AnalysisResult> {
        self.0.lock().unwrap().clone()
    }
}

/// Shared view into the streams a [`MockCamera`] hands out.
pub struct StreamProbe {
    pub stops: AtomicUsize,
    pub grabs: AtomicUsize,
    pub plays: AtomicUsize,
    pub live_tracks: AtomicUsize,
    pub fail_grab: AtomicBool,
    pub size: Mutex<Size>,
}

impl StreamProbe {
    pub fn new(size: Size) -> Arc<Self> {
        Arc::new(Self {
            stops: AtomicUsize::new(0),
            grabs: AtomicUsize::new(0),
            plays: AtomicUsize::new(0),
            live_tracks: AtomicUsize::new(0),
            fail_grab: AtomicBool::new(false),
            size: Mutex::new(size),
        })
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }

    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }
}

pub struct MockStream {
    probe: Arc<StreamProbe>,
    stopped: bool,
}

impl MediaStream for MockStream {
    fn active_tracks(&self) -> usize {
        if self.stopped { 0 } else { 1 }
    }

    fn play(&mut self) -> Result<()> {
        self.probe.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn video_size(&self) -> Size {
        *self.probe.size.lock().unwrap()
    }

    fn grab_frame(&mut self) -> Result<RgbaFrame> {
        if self.probe.fail_grab.load(Ordering::SeqCst) {
            return Err(anyhow!("could not create 2d drawing context"));
        }
        self.probe.grabs.fetch_add(1, Ordering::SeqCst);
        let size = self.video_size();
        let data = [180u8, 40, 40, 255].repeat((size.w * size.h) as usize);
        Ok(RgbaFrame::packed(data, size.w, size.h))
    }

    fn stop_all_tracks(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.probe.live_tracks.fetch_sub(1, Ordering::SeqCst);
        }
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockCamera {
    pub probe: Arc<StreamProbe>,
    pub opens: AtomicUsize,
    pub failure: Option<String>,
    pub last_constraints: Mutex<Option<StreamConstraints>>,
}

impl MockCamera {
    pub fn new(size: Size) -> Arc<Self> {
        Arc::new(Self {
            probe: StreamProbe::new(size),
            opens: AtomicUsize::new(0),
            failure: None,
            last_constraints: Mutex::new(None),
        })
    }

    pub fn denied(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            probe: StreamProbe::new(Size { w: 0, h: 0 }),
            opens: AtomicUsize::new(0),
            failure: Some(reason.to_string()),
            last_constraints: Mutex::new(None),
        })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for MockCamera {
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn MediaStream>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_constraints.lock().unwrap() = Some(*constraints);
        if let Some(reason) = &self.failure {
            return Err(anyhow!("{}", reason));
        }
        self.probe.live_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockStream {
            probe: self.probe.clone(),
            stopped: false,
        }))
    }
}

pub fn jpeg_file() -> meal_capture::capture::image::ImageFile {
    meal_capture::capture::image::ImageFile::new(
        "apple.jpg",
        "image/jpeg",
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9],
    )
}
