//! Evidence recording: device acquisition, recorder lifecycle and the
//! dialog that owns them.

mod controller;
mod dialog;
mod format;

pub use self::controller::{
    Artifact, ArtifactId, ArtifactSource, MediaCommand, MediaSession, RecorderState,
};
pub use self::dialog::{DialogPhase, DialogTicket, RecordingCommand, RecordingDialog};
pub use self::format::{
    artifact_file_name, extension_for, select_recording_format, RecordingFormat,
    DEFAULT_FORMAT_CANDIDATES, FALLBACK_MIME_TYPE,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::MediaError;
use crate::{AppError, ErrorKind};

pub const RECORDING_TICK_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentProblem {
    InsecureContext,
    NoMediaDevices,
}

/// Errors shown inline in the recording dialog. Display text is what the
/// user reads.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureError {
    #[error("Camera/Microphone permission was denied. Please allow access and try again.")]
    PermissionDenied,

    #[error("No camera was found on this device.")]
    DeviceNotFound,

    #[error("Camera access requires HTTPS (or localhost). Open the site over HTTPS and try again.")]
    InsecureContext,

    #[error("Camera is not available in this browser.")]
    MediaDevicesUnavailable,

    #[error("Unable to access camera/microphone.")]
    AcquisitionFailed { reason: String },

    #[error("Camera is not started yet.")]
    NoActiveStream,

    #[error("Video recording is not supported in this browser.")]
    UnsupportedRecording,

    #[error("Unable to start recording.")]
    RecorderStartFailed { reason: String },

    #[error("Recording error occurred.")]
    RecordingFailed { reason: String },
}

impl CaptureError {
    pub fn unsupported(problem: EnvironmentProblem) -> Self {
        match problem {
            EnvironmentProblem::InsecureContext => CaptureError::InsecureContext,
            EnvironmentProblem::NoMediaDevices => CaptureError::MediaDevicesUnavailable,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::PermissionDenied => ErrorKind::PermissionDenied,
            CaptureError::DeviceNotFound => ErrorKind::DeviceNotFound,
            CaptureError::InsecureContext
            | CaptureError::MediaDevicesUnavailable
            | CaptureError::AcquisitionFailed { .. } => ErrorKind::UnsupportedEnvironment,
            CaptureError::NoActiveStream => ErrorKind::NoActiveStream,
            CaptureError::UnsupportedRecording => ErrorKind::UnsupportedRecording,
            CaptureError::RecorderStartFailed { .. } | CaptureError::RecordingFailed { .. } => {
                ErrorKind::RecordingError
            }
        }
    }

    /// Acquisition failures that leave the dialog retryable.
    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self,
            CaptureError::PermissionDenied
                | CaptureError::DeviceNotFound
                | CaptureError::InsecureContext
                | CaptureError::MediaDevicesUnavailable
                | CaptureError::AcquisitionFailed { .. }
        )
    }
}

impl From<MediaError> for CaptureError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::PermissionDenied => CaptureError::PermissionDenied,
            MediaError::NotFound => CaptureError::DeviceNotFound,
            MediaError::InsecureContext => CaptureError::InsecureContext,
            MediaError::NotSupported => CaptureError::MediaDevicesUnavailable,
            other => CaptureError::AcquisitionFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl From<&CaptureError> for AppError {
    fn from(e: &CaptureError) -> Self {
        let app = AppError::new(e.kind(), e.to_string());
        match e {
            CaptureError::AcquisitionFailed { reason }
            | CaptureError::RecorderStartFailed { reason }
            | CaptureError::RecordingFailed { reason } => app.with_internal(reason.clone()),
            _ => app,
        }
    }
}

/// A file chosen through the fallback picker on hosts without a recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedFile {
    pub name: String,
    pub mime_type: Option<String>,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_classify() {
        assert_eq!(
            CaptureError::from(MediaError::PermissionDenied),
            CaptureError::PermissionDenied
        );
        assert_eq!(
            CaptureError::from(MediaError::NotFound),
            CaptureError::DeviceNotFound
        );
        assert_eq!(
            CaptureError::from(MediaError::Aborted).to_string(),
            "Unable to access camera/microphone."
        );
    }

    #[test]
    fn test_kinds_map_to_taxonomy() {
        assert_eq!(
            CaptureError::InsecureContext.kind(),
            ErrorKind::UnsupportedEnvironment
        );
        assert_eq!(
            CaptureError::RecordingFailed {
                reason: "x".into()
            }
            .kind(),
            ErrorKind::RecordingError
        );
        assert!(CaptureError::DeviceNotFound.is_acquisition_error());
        assert!(!CaptureError::NoActiveStream.is_acquisition_error());
    }

    #[test]
    fn test_app_error_keeps_reason_internal() {
        let err = CaptureError::RecordingFailed {
            reason: "encoder crashed".into(),
        };
        let app = AppError::from(&err);
        assert_eq!(app.code(), "RECORDING_ERROR");
        assert_eq!(app.message, "Recording error occurred.");
        assert_eq!(app.internal_message.as_deref(), Some("encoder crashed"));
    }
}
