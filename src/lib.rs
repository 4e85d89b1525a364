//! # Meal Capture Library
//!
//! Capture a meal photo from a file picker or a live camera, send it through a
//! remote dish-identification pipeline, and persist the result.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `capture`: Camera streams, the readiness race, and image payloads
//! - `session`: Ephemeral capture state and the derived controller state
//! - `pipeline`: Identity → upload → public URL → inference → persistence
//! - `controller`: The capture state machine that ties everything together
//! - `backend`: Collaborator trait and the hosted REST implementation
//! - `config`: Configuration management and validation
//!
//! Image storage, dish identification, and persistence are remote collaborators
//! injected through [`backend::MealBackend`]; camera hardware is injected through
//! [`capture::camera::CameraDevice`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use meal_capture::backend::http::HttpBackend;
//! use meal_capture::capture::image::ImageFile;
//! use meal_capture::config::BackendConfig;
//! use meal_capture::CaptureController;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HttpBackend::new(
//!     BackendConfig::new("https://demo.supabase.co", "anon-key").with_access_token("jwt"),
//! )?;
//! let mut controller = CaptureController::builder()
//!     .with_backend(backend)
//!     .on_complete(|meal| println!("{} ({} kcal)", meal.dish_name, meal.calories))
//!     .build()?;
//!
//! let file = ImageFile::from_path("lunch.jpg").await?;
//! controller.submit_file(file).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod session;

/// Re-export error types for convenience
pub use error::{CaptureError, CaptureResult, HasRecoverySuggestion, HasSeverity};

pub use controller::{CaptureController, Notice, NoticeLevel, Notifier, PhotoRoute};
pub use model::AnalysisResult;
pub use session::CaptureState;
