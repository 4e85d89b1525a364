//! # Analysis Pipeline
//!
//! Sequential, dependent steps run once per captured image:
//!
//! 1. Resolve the authenticated identity
//! 2. Upload the raw image to object storage under `{user}/{millis}.{ext}`
//! 3. Resolve the public URL of the upload
//! 4. Identify the dish from the base64 data URL
//! 5. Persist the combined meal record
//! 6. Return the combined [`AnalysisResult`]
//!
//! The first failing step aborts the rest. Nothing already written is cleaned
//! up and nothing is retried. A single-slot in-flight token makes a second
//! concurrent run fail fast instead of interleaving with the first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::backend::{Clock, MealBackend, SystemClock, storage_key};
use crate::capture::image::EncodedImage;
use crate::error::{CaptureError, CaptureResult, PipelineStep};
use crate::model::{AnalysisResult, MealRecord};

/// Single-slot token held for the duration of one pipeline run.
#[derive(Debug, Default)]
pub struct InFlightSlot {
    busy: AtomicBool,
}

impl InFlightSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> CaptureResult<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard { slot: self })
            .map_err(|_| {
                CaptureError::busy("analyzing", "start analysis", "An image is already being analyzed")
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the slot on drop, whatever the outcome of the run.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    slot: &'a InFlightSlot,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

pub struct AnalysisPipeline {
    backend: Arc<dyn MealBackend>,
    clock: Arc<dyn Clock>,
    bucket: String,
    slot: InFlightSlot,
}

impl AnalysisPipeline {
    pub fn new(backend: Arc<dyn MealBackend>, bucket: impl Into<String>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock), bucket)
    }

    pub fn with_clock(
        backend: Arc<dyn MealBackend>,
        clock: Arc<dyn Clock>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            clock,
            bucket: bucket.into(),
            slot: InFlightSlot::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_busy()
    }

    /// Run every step for `image`. Fails fast with `Busy` if a run is in flight.
    pub async fn run(&self, image: &EncodedImage) -> CaptureResult<AnalysisResult> {
        if image.bytes.is_empty() {
            return Err(CaptureError::invalid_input("image", "No image to analyze"));
        }
        let _guard = self.slot.try_acquire()?;

        let identity = self
            .backend
            .current_user()
            .await
            .map_err(|e| CaptureError::pipeline(PipelineStep::Identity, e))?
            .ok_or_else(CaptureError::unauthenticated)?;

        let key = storage_key(&identity, self.clock.now_millis(), &image.extension());
        debug!(bucket = %self.bucket, %key, size = image.bytes.len(), "Uploading image");
        self.backend
            .upload(&self.bucket, &key, &image.bytes, &image.media_type)
            .await
            .map_err(|e| CaptureError::pipeline(PipelineStep::Upload, e))?;

        let image_url = self
            .backend
            .public_url(&self.bucket, &key)
            .await
            .map_err(|e| CaptureError::pipeline(PipelineStep::PublicUrl, e))?;

        debug!(%image_url, "Identifying dish");
        let dish = self
            .backend
            .identify_dish(&image.data_url)
            .await
            .map_err(|e| CaptureError::pipeline(PipelineStep::Inference, e))?;

        let record = MealRecord::new(&identity, &dish, &image_url);
        self.backend
            .insert_meal(&record)
            .await
            .map_err(|e| CaptureError::pipeline(PipelineStep::Persistence, e))?;

        info!(
            dish = %dish.dish_name,
            calories = dish.calories,
            confidence = dish.confidence,
            "Meal analyzed"
        );
        Ok(AnalysisResult::new(dish, image_url))
    }
}
