//! Device capture boundary.
//!
//! The shell owns the real camera/microphone handles and the platform
//! recorder; the core only ever sees opaque stream and track ids. Every
//! acquired stream must eventually be answered with one `StopTrack` per
//! track.

use std::fmt;

use crux_core::capability::{Capability, CapabilityContext, Operation};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(StreamId);
typed_id!(TrackId);

pub struct Media<Ev> {
    context: CapabilityContext<MediaOperation, Ev>,
}

impl<Ev> Capability<Ev> for Media<Ev> {
    type Operation = MediaOperation;
    type MappedSelf<MappedEv> = Media<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Media::new(self.context.map_event(f))
    }
}

impl<Ev> Media<Ev> {
    pub fn new(context: CapabilityContext<MediaOperation, Ev>) -> Self {
        Self { context }
    }
}

impl<Ev> Media<Ev>
where
    Ev: Send + 'static,
{
    /// Asks the shell which of `candidates` its recorder can produce, and
    /// whether capture is possible at all.
    pub fn query_environment<F>(&self, candidates: Vec<String>, callback: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        self.request(MediaOperation::QueryEnvironment { candidates }, callback);
    }

    pub fn acquire<F>(&self, constraints: CaptureConstraints, callback: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        self.request(MediaOperation::Acquire { constraints }, callback);
    }

    pub fn attach_preview(&self, stream: StreamId) {
        self.notify(MediaOperation::AttachPreview { stream });
    }

    pub fn stop_track(&self, stream: StreamId, track: TrackId) {
        self.notify(MediaOperation::StopTrack { stream, track });
    }

    /// Starts the platform recorder. The shell answers with a stream of
    /// [`RecorderEvent`]s that ends after `Stopped` or `Error`.
    pub fn start_recorder<F>(
        &self,
        stream: StreamId,
        mime_type: Option<String>,
        timeslice_ms: Option<u64>,
        callback: F,
    ) where
        F: Fn(MediaResult) -> Ev + Send + Sync + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let mut events = ctx.stream_from_shell(MediaOperation::StartRecorder {
                stream,
                mime_type,
                timeslice_ms,
            });
            while let Some(result) = events.next().await {
                ctx.update_app(callback(result));
            }
        });
    }

    pub fn stop_recorder(&self, stream: StreamId) {
        self.notify(MediaOperation::StopRecorder { stream });
    }

    pub fn create_object_url<F>(&self, data: Vec<u8>, mime_type: String, callback: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        self.request(MediaOperation::CreateObjectUrl { data, mime_type }, callback);
    }

    pub fn revoke_object_url(&self, url: String) {
        self.notify(MediaOperation::RevokeObjectUrl { url });
    }

    fn request<F>(&self, operation: MediaOperation, callback: F)
    where
        F: FnOnce(MediaResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(result));
        });
    }

    fn notify(&self, operation: MediaOperation) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaOperation {
    QueryEnvironment {
        candidates: Vec<String>,
    },
    Acquire {
        constraints: CaptureConstraints,
    },
    AttachPreview {
        stream: StreamId,
    },
    StopTrack {
        stream: StreamId,
        track: TrackId,
    },
    StartRecorder {
        stream: StreamId,
        mime_type: Option<String>,
        timeslice_ms: Option<u64>,
    },
    StopRecorder {
        stream: StreamId,
    },
    CreateObjectUrl {
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
        mime_type: String,
    },
    RevokeObjectUrl {
        url: String,
    },
}

impl Operation for MediaOperation {
    type Output = MediaResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    User,
    /// Rear camera; the default for evidence capture.
    #[default]
    Environment,
}

impl CameraFacing {
    pub fn facing_mode(self) -> &'static str {
        match self {
            CameraFacing::User => "user",
            CameraFacing::Environment => "environment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub video: bool,
    pub audio: bool,
    /// Treated as an `ideal` constraint: the shell falls back to any camera.
    pub facing: CameraFacing,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            facing: CameraFacing::Environment,
        }
    }
}

/// What the host can do. Reported once and cached by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEnvironment {
    pub secure_context: bool,
    pub has_media_devices: bool,
    pub has_recorder: bool,
    /// Subset of the queried candidates for which the recorder's
    /// `isTypeSupported` probe answered true.
    pub supported_formats: Vec<String>,
}

impl MediaEnvironment {
    pub fn is_type_supported(&self, mime_type: &str) -> bool {
        self.has_recorder && self.supported_formats.iter().any(|f| f == mime_type)
    }
}

impl Default for MediaEnvironment {
    fn default() -> Self {
        Self {
            secure_context: true,
            has_media_devices: true,
            has_recorder: true,
            supported_formats: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub id: TrackId,
    pub kind: TrackKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHandle {
    pub id: StreamId,
    pub tracks: Vec<TrackInfo>,
}

impl StreamHandle {
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn has_audio(&self) -> bool {
        self.tracks.iter().any(|t| t.kind == TrackKind::Audio)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderEvent {
    Started {
        mime_type: String,
    },
    DataAvailable {
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
    /// Terminal. `mime_type` is what the recorder reports, if anything.
    Stopped {
        mime_type: Option<String>,
        stopped_at_ms: i64,
    },
    /// Terminal.
    Error {
        message: String,
    },
}

impl RecorderEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecorderEvent::Stopped { .. } | RecorderEvent::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaOutput {
    Environment(MediaEnvironment),
    Stream(StreamHandle),
    Recorder(RecorderEvent),
    ObjectUrl(String),
}

impl MediaOutput {
    pub fn into_stream(self) -> Option<StreamHandle> {
        match self {
            MediaOutput::Stream(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn into_environment(self) -> Option<MediaEnvironment> {
        match self {
            MediaOutput::Environment(env) => Some(env),
            _ => None,
        }
    }

    pub fn into_object_url(self) -> Option<String> {
        match self {
            MediaOutput::ObjectUrl(url) => Some(url),
            _ => None,
        }
    }
}

/// Errors as reported by the shell. Web shells can build these straight
/// from a `DOMException` with [`MediaError::from_dom_exception`].
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaError {
    #[error("camera/microphone permission denied")]
    PermissionDenied,

    #[error("no matching capture device found")]
    NotFound,

    #[error("capture requires a secure context")]
    InsecureContext,

    #[error("media capture not supported on this host")]
    NotSupported,

    #[error("capture device is busy or unreadable: {reason}")]
    NotReadable { reason: String },

    #[error("capture request aborted")]
    Aborted,

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl MediaError {
    pub fn from_dom_exception(name: &str, message: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" => MediaError::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => MediaError::NotFound,
            "SecurityError" => MediaError::InsecureContext,
            "NotSupportedError" | "TypeError" => MediaError::NotSupported,
            "NotReadableError" | "TrackStartError" => MediaError::NotReadable {
                reason: message.to_string(),
            },
            "AbortError" => MediaError::Aborted,
            _ => MediaError::Internal {
                message: format!("{name}: {message}"),
            },
        }
    }
}

pub type MediaResult = Result<MediaOutput, MediaError>;
