//! # Error Handling
//!
//! Error taxonomy for the capture controller and its analysis pipeline.
//!
//! ## Architecture
//!
//! - **Error Types**: one enum covering input validation, camera access,
//!   still-frame rendering, pipeline steps and configuration
//! - **Error Context**: timestamp, operation, recovery suggestion, severity and
//!   free-form metadata attached to every variant
//! - **User Messages**: [`CaptureError::user_message`] produces the transient
//!   notice shown to the user. Failures are never forwarded to the completion
//!   handler.
//!
//! ## Usage
//!
//! ```rust
//! use meal_capture::error::{CaptureError, HasRecoverySuggestion};
//!
//! let error = CaptureError::device_access("permission denied")
//!     .with_context("opening front camera");
//!
//! assert_eq!(error.category(), "device_access");
//! assert!(error.recovery_suggestion().is_some());
//! ```

use std::{collections::HashMap, fmt, time::SystemTime};

use thiserror::Error;

/// Shown when a failure carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to analyze image";

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational errors
    Info,
    /// User-correctable problems (wrong file type, camera still warming up)
    Warning,
    /// Errors that abort the current capture
    Error,
    /// Errors that leave the controller unusable until reconfigured
    Fatal,
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Additional metadata as key-value pairs
    pub metadata: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            metadata: HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }
}

/// The sequential steps of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStep {
    Identity,
    Upload,
    PublicUrl,
    Inference,
    Persistence,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Identity => "identity",
            PipelineStep::Upload => "upload",
            PipelineStep::PublicUrl => "public_url",
            PipelineStep::Inference => "inference",
            PipelineStep::Persistence => "persistence",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base error type for the capture controller
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Rejected input: non-image file, capture before the camera is ready
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        field: String,
        reason: String,
        context: ErrorContext,
    },
    /// Camera acquisition failed (permission denied, no device, hardware busy)
    #[error("Could not access camera: {reason}")]
    DeviceAccess { reason: String, context: ErrorContext },
    /// Still-frame rasterization failed; the live stream is kept for a retry
    #[error("Failed to capture photo: {reason}")]
    Rendering { reason: String, context: ErrorContext },
    /// One of identity, upload, public URL, inference or persistence failed
    #[error("Pipeline step '{step}' failed: {source}")]
    Pipeline {
        step: PipelineStep,
        source: anyhow::Error,
        context: ErrorContext,
    },
    /// An operation was attempted while another one holds the controller
    #[error("Cannot {attempted_operation} while {current_state}: {reason}")]
    Busy {
        current_state: String,
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },
    /// Configuration validation errors
    #[error("Configuration error in '{field}': {reason} (value: {value})")]
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    #[error("External library error in {library}: {source}")]
    External {
        library: String,
        source: Box<dyn std::error::Error + Send + Sync>,
        context: ErrorContext,
    },
}

impl CaptureError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    pub fn device_access(reason: impl Into<String>) -> Self {
        Self::DeviceAccess {
            reason: reason.into(),
            context: ErrorContext::new().with_recovery_suggestion(
                "Check camera permissions or use file upload instead",
            ),
        }
    }

    pub fn rendering(reason: impl Into<String>) -> Self {
        Self::Rendering {
            reason: reason.into(),
            context: ErrorContext::new().with_recovery_suggestion("Try capturing again"),
        }
    }

    pub fn pipeline(step: PipelineStep, source: anyhow::Error) -> Self {
        Self::Pipeline {
            step,
            source,
            context: ErrorContext::new().with_operation(step.as_str()),
        }
    }

    /// Identity resolution returned no user.
    pub fn unauthenticated() -> Self {
        Self::pipeline(
            PipelineStep::Identity,
            anyhow::anyhow!("User not authenticated"),
        )
        .with_recovery_suggestion("Sign in and try again")
    }

    pub fn busy(
        current_state: impl Into<String>,
        attempted_operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Busy {
            current_state: current_state.into(),
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Warning),
        }
    }

    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    pub fn io(operation: impl Into<String>, path: Option<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path,
            source,
            context: ErrorContext::new(),
        }
    }

    pub fn external(
        library: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidInput { context, .. } => context,
            Self::DeviceAccess { context, .. } => context,
            Self::Rendering { context, .. } => context,
            Self::Pipeline { context, .. } => context,
            Self::Busy { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::InvalidInput { context, .. } => context,
            Self::DeviceAccess { context, .. } => context,
            Self::Rendering { context, .. } => context,
            Self::Pipeline { context, .. } => context,
            Self::Busy { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::DeviceAccess { .. } => "device_access",
            Self::Rendering { .. } => "rendering",
            Self::Pipeline { .. } => "pipeline",
            Self::Busy { .. } => "busy",
            Self::Config { .. } => "config",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
        }
    }

    /// The failing pipeline step, if any.
    pub fn pipeline_step(&self) -> Option<PipelineStep> {
        match self {
            Self::Pipeline { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Text for the transient user-facing notice.
    pub fn user_message(&self) -> String {
        let message = match self {
            Self::InvalidInput { reason, .. } => reason.clone(),
            Self::DeviceAccess { .. } => {
                "Could not access camera. Please check permissions or use file upload instead."
                    .to_string()
            }
            Self::Rendering { reason, .. } => reason.clone(),
            Self::Pipeline { source, .. } => source.to_string(),
            Self::Busy { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message
        }
    }
}

/// Result type alias using our custom error type
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Trait for errors with severity levels
pub trait HasSeverity {
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for CaptureError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for CaptureError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

impl From<meal_frame::FrameError> for CaptureError {
    fn from(error: meal_frame::FrameError) -> Self {
        Self::rendering(error.to_string())
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(error: serde_json::Error) -> Self {
        Self::external("serde_json", error)
    }
}
