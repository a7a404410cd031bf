use serde::{Deserialize, Serialize};

use super::format::{artifact_file_name, select_recording_format, RecordingFormat, FALLBACK_MIME_TYPE};
use super::{CaptureError, PickedFile};
use crate::capabilities::{
    CaptureConstraints, MediaEnvironment, RecorderEvent, StreamHandle, StreamId, TrackId,
};

/// Side effects requested by the media session. The owner forwards them to
/// the media capability in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCommand {
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
        artifact: ArtifactId,
        data: Vec<u8>,
        mime_type: String,
    },
    RevokeObjectUrl {
        url: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactSource {
    Recorded,
    Picked,
}

/// An immutable recording. `url` is filled in once the shell has issued
/// an object URL for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: ArtifactId,
    pub mime_type: String,
    pub file_name: String,
    pub size_bytes: usize,
    pub source: ArtifactSource,
    pub url: Option<String>,
}

/// Owns at most one device stream, one recorder and one artifact.
#[derive(Debug, Default)]
pub struct MediaSession {
    stream: Option<StreamHandle>,
    recorder: RecorderState,
    stop_requested: bool,
    format: RecordingFormat,
    reported_mime: Option<String>,
    chunks: Vec<Vec<u8>>,
    artifact: Option<Artifact>,
    next_artifact: u64,
}

impl MediaSession {
    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<&StreamHandle> {
        self.stream.as_ref()
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.recorder
    }

    pub fn is_recording(&self) -> bool {
        self.recorder == RecorderState::Recording
    }

    pub fn format(&self) -> &RecordingFormat {
        &self.format
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Drops any current stream before asking for a new one.
    pub fn begin_acquire(&mut self, constraints: CaptureConstraints) -> Vec<MediaCommand> {
        let mut commands = self.release_stream();
        commands.push(MediaCommand::Acquire { constraints });
        commands
    }

    pub fn on_acquired(&mut self, handle: StreamHandle) -> Vec<MediaCommand> {
        let mut commands = self.release_stream();
        tracing::info!(
            stream = %handle.id,
            tracks = handle.track_count(),
            "capture stream acquired"
        );
        commands.push(MediaCommand::AttachPreview {
            stream: handle.id.clone(),
        });
        self.stream = Some(handle);
        commands
    }

    /// A no-op while already recording.
    pub fn start_recording(
        &mut self,
        env: &MediaEnvironment,
        candidates: &[String],
        timeslice_ms: Option<u64>,
    ) -> Result<Vec<MediaCommand>, CaptureError> {
        let stream = self
            .stream
            .as_ref()
            .map(|s| s.id.clone())
            .ok_or(CaptureError::NoActiveStream)?;
        if self.is_recording() {
            return Ok(Vec::new());
        }
        if !env.has_recorder {
            return Err(CaptureError::UnsupportedRecording);
        }

        let mut commands = self.reset_output();
        self.format = select_recording_format(candidates, |c| env.is_type_supported(c));
        self.chunks.clear();
        self.reported_mime = None;
        self.stop_requested = false;
        self.recorder = RecorderState::Recording;

        tracing::info!(stream = %stream, format = ?self.format, "recording started");
        commands.push(MediaCommand::StartRecorder {
            stream,
            mime_type: self.format.mime_type().map(ToString::to_string),
            timeslice_ms,
        });
        Ok(commands)
    }

    /// The recorder could not be constructed; nothing was recorded.
    pub fn on_recorder_start_failed(&mut self, reason: String) -> CaptureError {
        if self.is_recording() {
            self.recorder = RecorderState::Idle;
            self.chunks.clear();
        }
        tracing::warn!(%reason, "recorder failed to start");
        CaptureError::RecorderStartFailed { reason }
    }

    pub fn stop_recording(&mut self) -> Vec<MediaCommand> {
        if !self.is_recording() || self.stop_requested {
            return Vec::new();
        }
        match &self.stream {
            Some(stream) => {
                self.stop_requested = true;
                vec![MediaCommand::StopRecorder {
                    stream: stream.id.clone(),
                }]
            }
            None => Vec::new(),
        }
    }

    pub fn on_recorder_event(
        &mut self,
        event: RecorderEvent,
    ) -> Result<Vec<MediaCommand>, CaptureError> {
        if !self.is_recording() {
            tracing::debug!(?event, "recorder event outside recording, ignored");
            return Ok(Vec::new());
        }
        match event {
            RecorderEvent::Started { mime_type } => {
                if !mime_type.is_empty() {
                    self.reported_mime = Some(mime_type);
                }
                Ok(Vec::new())
            }
            RecorderEvent::DataAvailable { data } => {
                if !data.is_empty() {
                    self.chunks.push(data);
                }
                Ok(Vec::new())
            }
            RecorderEvent::Stopped {
                mime_type,
                stopped_at_ms,
            } => Ok(self.finish_recording(mime_type, stopped_at_ms)),
            RecorderEvent::Error { message } => {
                self.recorder = RecorderState::Stopped;
                self.stop_requested = false;
                self.chunks.clear();
                tracing::warn!(%message, "recorder error");
                Err(CaptureError::RecordingFailed { reason: message })
            }
        }
    }

    fn finish_recording(
        &mut self,
        reported: Option<String>,
        stopped_at_ms: i64,
    ) -> Vec<MediaCommand> {
        let mime_type = reported
            .filter(|m| !m.is_empty())
            .or_else(|| self.reported_mime.take())
            .or_else(|| self.format.mime_type().map(ToString::to_string))
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

        let data = std::mem::take(&mut self.chunks).concat();
        self.recorder = RecorderState::Stopped;
        self.stop_requested = false;

        tracing::info!(bytes = data.len(), %mime_type, "recording finished");
        self.store_artifact(data, mime_type, stopped_at_ms, ArtifactSource::Recorded)
    }

    /// Treats a user-picked file exactly like a finished recording. Ignored
    /// while the recorder is running.
    pub fn accept_file(&mut self, file: PickedFile, now_ms: i64) -> Vec<MediaCommand> {
        if self.is_recording() {
            tracing::debug!(name = %file.name, "ignoring picked file during recording");
            return Vec::new();
        }
        if file.data.is_empty() {
            tracing::debug!(name = %file.name, "ignoring empty picked file");
            return Vec::new();
        }
        let mime_type = file
            .mime_type
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());
        self.store_artifact(file.data, mime_type, now_ms, ArtifactSource::Picked)
    }

    fn store_artifact(
        &mut self,
        data: Vec<u8>,
        mime_type: String,
        at_ms: i64,
        source: ArtifactSource,
    ) -> Vec<MediaCommand> {
        let mut commands = self.reset_output();
        self.next_artifact += 1;
        let id = ArtifactId(self.next_artifact);
        self.artifact = Some(Artifact {
            id,
            file_name: artifact_file_name(at_ms, &mime_type),
            mime_type: mime_type.clone(),
            size_bytes: data.len(),
            source,
            url: None,
        });
        commands.push(MediaCommand::CreateObjectUrl {
            artifact: id,
            data,
            mime_type,
        });
        commands
    }

    /// Attaches `url` to the artifact it was issued for; any other URL is
    /// handed straight back for revocation.
    pub fn on_object_url(&mut self, artifact: ArtifactId, url: String) -> Vec<MediaCommand> {
        match &mut self.artifact {
            Some(current) if current.id == artifact && current.url.is_none() => {
                current.url = Some(url);
                Vec::new()
            }
            _ => {
                tracing::debug!(artifact = artifact.0, "revoking URL for superseded artifact");
                vec![MediaCommand::RevokeObjectUrl { url }]
            }
        }
    }

    /// Full teardown. Safe to call any number of times.
    pub fn release(&mut self) -> Vec<MediaCommand> {
        let mut commands = self.release_stream();
        commands.extend(self.reset_output());
        self.format = RecordingFormat::PlatformDefault;
        self.recorder = RecorderState::Idle;
        commands
    }

    pub fn release_stream(&mut self) -> Vec<MediaCommand> {
        let mut commands = Vec::new();
        let Some(stream) = self.stream.take() else {
            self.recorder = RecorderState::Idle;
            self.chunks.clear();
            return commands;
        };
        if self.is_recording() {
            commands.push(MediaCommand::StopRecorder {
                stream: stream.id.clone(),
            });
        }
        self.recorder = RecorderState::Idle;
        self.stop_requested = false;
        self.reported_mime = None;
        self.chunks.clear();

        tracing::debug!(stream = %stream.id, tracks = stream.track_count(), "releasing capture stream");
        commands.extend(stream.tracks.into_iter().map(|t| MediaCommand::StopTrack {
            stream: stream.id.clone(),
            track: t.id,
        }));
        commands
    }

    fn reset_output(&mut self) -> Vec<MediaCommand> {
        match self.artifact.take().and_then(|a| a.url) {
            Some(url) => vec![MediaCommand::RevokeObjectUrl { url }],
            None => Vec::new(),
        }
    }
}

/// Track-stop commands for a stream the session never took ownership of.
pub(crate) fn stop_all_tracks(handle: StreamHandle) -> Vec<MediaCommand> {
    let StreamHandle { id, tracks } = handle;
    tracks
        .into_iter()
        .map(|t| MediaCommand::StopTrack {
            stream: id.clone(),
            track: t.id,
        })
        .collect()
}
