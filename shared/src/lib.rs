// lib.rs - Nirbhaya shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod advice;
pub mod app;
pub mod call;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod evidence;
pub mod model;
pub mod navigation;
pub mod safety;
pub mod screens;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::AppConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use navigation::Screen;
pub use view::ViewModel;

pub const EVIDENCE_TOAST_MS: u64 = 2_000;
pub const SOS_TOAST_MS: u64 = 5_000;
pub const CONTACT_CALL_TOAST_MS: u64 = 3_000;
pub const MAX_CHAT_INPUT_CHARS: usize = 2_000;
pub const MAX_LOCATION_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// The user can retry right away.
    Transient,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    PermissionDenied,
    DeviceNotFound,
    UnsupportedEnvironment,
    NoActiveStream,
    UnsupportedRecording,
    RecordingError,
    AdviceServiceTimeout,
    AdviceServiceFailure,
    Validation,
    InvalidState,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::UnsupportedEnvironment => "UNSUPPORTED_ENVIRONMENT",
            Self::NoActiveStream => "NO_ACTIVE_STREAM",
            Self::UnsupportedRecording => "UNSUPPORTED_RECORDING",
            Self::RecordingError => "RECORDING_ERROR",
            Self::AdviceServiceTimeout => "ADVICE_SERVICE_TIMEOUT",
            Self::AdviceServiceFailure => "ADVICE_SERVICE_FAILURE",
            Self::Validation => "VALIDATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::PermissionDenied
            | Self::DeviceNotFound
            | Self::NoActiveStream
            | Self::RecordingError
            | Self::AdviceServiceTimeout
            | Self::AdviceServiceFailure
            | Self::InvalidState => ErrorSeverity::Transient,

            Self::UnsupportedEnvironment
            | Self::UnsupportedRecording
            | Self::Validation
            | Self::Internal => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self.default_severity(), ErrorSeverity::Transient)
    }
}

/// User-facing error record. Nothing in this app is fatal; the worst case
/// is a permanent error the user cannot fix from inside the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::PermissionDenied
            | ErrorKind::DeviceNotFound
            | ErrorKind::UnsupportedEnvironment
            | ErrorKind::NoActiveStream
            | ErrorKind::UnsupportedRecording
            | ErrorKind::RecordingError
            | ErrorKind::Validation => self.message.clone(),
            ErrorKind::AdviceServiceTimeout | ErrorKind::AdviceServiceFailure => {
                "Could not get a response from the AI. Please try again.".into()
            }
            ErrorKind::InvalidState => "That action isn't available right now.".into(),
            ErrorKind::Internal => "An unexpected error occurred. Please try again.".into(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorKind::PermissionDenied.code(), "PERMISSION_DENIED");
        assert_eq!(ErrorKind::NoActiveStream.code(), "NO_ACTIVE_STREAM");
        assert_eq!(
            ErrorKind::AdviceServiceTimeout.code(),
            "ADVICE_SERVICE_TIMEOUT"
        );
    }

    #[test]
    fn test_capture_errors_show_their_own_message() {
        let err = AppError::new(ErrorKind::DeviceNotFound, "No camera was found on this device.");
        assert_eq!(err.user_facing_message(), "No camera was found on this device.");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_advice_errors_get_generic_message() {
        let err = AppError::new(ErrorKind::AdviceServiceFailure, "HTTP error 502")
            .with_internal("upstream reset")
            .with_context("endpoint", "safety-advice");
        assert_eq!(
            err.user_facing_message(),
            "Could not get a response from the AI. Please try again."
        );
        assert_eq!(err.context.get("endpoint").map(String::as_str), Some("safety-advice"));
        assert_eq!(err.to_string(), "[ADVICE_SERVICE_FAILURE] HTTP error 502");
    }

    #[test]
    fn test_unsupported_environment_is_permanent() {
        assert_eq!(
            ErrorKind::UnsupportedEnvironment.default_severity(),
            ErrorSeverity::Permanent
        );
        assert!(!ErrorKind::UnsupportedRecording.is_retryable());
    }
}
