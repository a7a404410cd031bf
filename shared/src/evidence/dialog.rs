use serde::{Deserialize, Serialize};

use super::controller::{stop_all_tracks, ArtifactId, MediaCommand, MediaSession};
use super::{CaptureError, EnvironmentProblem, PickedFile, RECORDING_TICK_MS};
use crate::capabilities::{
    CaptureConstraints, MediaEnvironment, MediaOutput, MediaResult, TimerId, TimerIds,
};
use crate::config::CaptureConfig;

/// Identifies one open/acquire cycle of the dialog. Callbacks carrying an
/// older ticket are stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogPhase {
    Closed,
    /// Open without a stream; an acquisition error may be showing.
    Ready,
    Initializing,
    Streaming,
    Recording,
    /// A recording (or picked file) is available.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingCommand {
    Media(MediaCommand),
    StartTimer { id: TimerId, millis: u64 },
    CancelTimer { id: TimerId },
}

impl From<MediaCommand> for RecordingCommand {
    fn from(command: MediaCommand) -> Self {
        RecordingCommand::Media(command)
    }
}

fn media(commands: Vec<MediaCommand>) -> Vec<RecordingCommand> {
    commands.into_iter().map(RecordingCommand::Media).collect()
}

#[derive(Debug, Default)]
pub struct RecordingDialog {
    open: bool,
    generation: u64,
    initializing: bool,
    session: MediaSession,
    environment: Option<MediaEnvironment>,
    error: Option<CaptureError>,
    recording_timer: Option<TimerId>,
    recording_seconds: u32,
}

impl RecordingDialog {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn ticket(&self) -> DialogTicket {
        DialogTicket(self.generation)
    }

    pub fn session(&self) -> &MediaSession {
        &self.session
    }

    pub fn error(&self) -> Option<&CaptureError> {
        self.error.as_ref()
    }

    pub fn environment(&self) -> Option<&MediaEnvironment> {
        self.environment.as_ref()
    }

    pub fn recording_seconds(&self) -> u32 {
        self.recording_seconds
    }

    pub fn recording_timer(&self) -> Option<TimerId> {
        self.recording_timer
    }

    /// Whether the host is known to lack a recorder, so the fallback file
    /// picker should be offered.
    pub fn needs_fallback_picker(&self) -> bool {
        self.environment.as_ref().is_some_and(|env| !env.has_recorder)
    }

    pub fn phase(&self) -> DialogPhase {
        if !self.open {
            DialogPhase::Closed
        } else if self.initializing {
            DialogPhase::Initializing
        } else if self.session.is_recording() {
            DialogPhase::Recording
        } else if self.session.artifact().is_some() {
            DialogPhase::Stopped
        } else if self.session.has_stream() {
            DialogPhase::Streaming
        } else {
            DialogPhase::Ready
        }
    }

    fn is_current(&self, ticket: DialogTicket) -> bool {
        self.open && ticket.0 == self.generation
    }

    pub fn open(&mut self) -> bool {
        if self.open {
            return false;
        }
        self.open = true;
        self.generation += 1;
        self.error = None;
        tracing::debug!(ticket = self.generation, "recording dialog opened");
        true
    }

    /// Ignored while an acquisition is already in flight.
    pub fn init_camera(&mut self, config: &CaptureConfig) -> Vec<RecordingCommand> {
        if !self.open || self.initializing {
            return Vec::new();
        }
        self.initializing = true;
        self.error = None;
        self.generation += 1;

        match &self.environment {
            Some(_) => self.proceed_acquire(config),
            None => vec![RecordingCommand::Media(MediaCommand::QueryEnvironment {
                candidates: config.format_candidates.clone(),
            })],
        }
    }

    pub fn on_environment(
        &mut self,
        ticket: DialogTicket,
        result: MediaResult,
        config: &CaptureConfig,
    ) -> Vec<RecordingCommand> {
        if !self.is_current(ticket) || !self.initializing {
            tracing::debug!(ticket = ticket.0, "stale environment report discarded");
            return Vec::new();
        }
        match result.map(MediaOutput::into_environment) {
            Ok(Some(env)) => {
                tracing::debug!(?env, "media environment reported");
                self.environment = Some(env);
                self.proceed_acquire(config)
            }
            Ok(None) => self.fail_acquire(CaptureError::AcquisitionFailed {
                reason: "unexpected environment output".to_string(),
            }),
            Err(e) => self.fail_acquire(e.into()),
        }
    }

    fn proceed_acquire(&mut self, config: &CaptureConfig) -> Vec<RecordingCommand> {
        let env = self.environment.clone().unwrap_or_default();
        if !env.secure_context {
            return self.fail_acquire(CaptureError::unsupported(EnvironmentProblem::InsecureContext));
        }
        if !env.has_media_devices {
            let mut commands = media(self.session.release_stream());
            commands.extend(
                self.fail_acquire(CaptureError::unsupported(EnvironmentProblem::NoMediaDevices)),
            );
            return commands;
        }
        let constraints = CaptureConstraints {
            video: true,
            audio: config.audio,
            facing: config.facing,
        };
        let mut commands = self.cancel_recording_timer();
        commands.extend(media(self.session.begin_acquire(constraints)));
        commands
    }

    fn fail_acquire(&mut self, error: CaptureError) -> Vec<RecordingCommand> {
        tracing::warn!(%error, "camera initialization failed");
        self.initializing = false;
        self.error = Some(error);
        Vec::new()
    }

    /// A stream for a stale ticket is released on the spot.
    pub fn on_stream(&mut self, ticket: DialogTicket, result: MediaResult) -> Vec<RecordingCommand> {
        let current = self.is_current(ticket) && self.initializing;
        match result.map(MediaOutput::into_stream) {
            Ok(Some(handle)) if !current => {
                tracing::info!(stream = %handle.id, ticket = ticket.0, "releasing stream from stale acquisition");
                media(stop_all_tracks(handle))
            }
            Ok(Some(handle)) => {
                self.initializing = false;
                media(self.session.on_acquired(handle))
            }
            _ if !current => Vec::new(),
            Ok(None) => self.fail_acquire(CaptureError::AcquisitionFailed {
                reason: "unexpected acquisition output".to_string(),
            }),
            Err(e) => self.fail_acquire(e.into()),
        }
    }

    pub fn start_recording(
        &mut self,
        config: &CaptureConfig,
        ids: &mut TimerIds,
    ) -> Vec<RecordingCommand> {
        if !self.open || self.initializing {
            return Vec::new();
        }
        let env = self.environment.clone().unwrap_or_default();
        let was_recording = self.session.is_recording();
        match self
            .session
            .start_recording(&env, &config.format_candidates, config.timeslice_ms)
        {
            Ok(commands) => {
                self.error = None;
                let mut out = media(commands);
                if !was_recording {
                    out.extend(self.cancel_recording_timer());
                    let id = ids.next();
                    self.recording_timer = Some(id);
                    self.recording_seconds = 0;
                    out.push(RecordingCommand::StartTimer {
                        id,
                        millis: RECORDING_TICK_MS,
                    });
                }
                out
            }
            Err(error) => {
                tracing::warn!(%error, "recording could not start");
                self.error = Some(error);
                Vec::new()
            }
        }
    }

    pub fn stop_recording(&mut self) -> Vec<RecordingCommand> {
        if !self.open {
            return Vec::new();
        }
        media(self.session.stop_recording())
    }

    pub fn on_recorder(&mut self, ticket: DialogTicket, result: MediaResult) -> Vec<RecordingCommand> {
        if !self.is_current(ticket) {
            tracing::debug!(ticket = ticket.0, "stale recorder event discarded");
            return Vec::new();
        }
        let event = match result {
            Ok(MediaOutput::Recorder(event)) => event,
            Ok(other) => {
                tracing::warn!(?other, "unexpected recorder output");
                return Vec::new();
            }
            Err(e) => {
                let error = self.session.on_recorder_start_failed(e.to_string());
                self.error = Some(error);
                return self.cancel_recording_timer();
            }
        };
        let terminal = event.is_terminal();
        let mut commands = match self.session.on_recorder_event(event) {
            Ok(commands) => media(commands),
            Err(error) => {
                self.error = Some(error);
                Vec::new()
            }
        };
        if terminal {
            commands.extend(self.cancel_recording_timer());
        }
        commands
    }

    pub fn on_object_url(
        &mut self,
        ticket: DialogTicket,
        artifact: ArtifactId,
        result: MediaResult,
    ) -> Vec<RecordingCommand> {
        let url = match result.map(MediaOutput::into_object_url) {
            Ok(Some(url)) => url,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "object URL creation failed");
                return Vec::new();
            }
        };
        if !self.is_current(ticket) {
            return vec![RecordingCommand::Media(MediaCommand::RevokeObjectUrl { url })];
        }
        media(self.session.on_object_url(artifact, url))
    }

    pub fn accept_file(&mut self, file: PickedFile, now_ms: i64) -> Vec<RecordingCommand> {
        if !self.open || self.session.is_recording() {
            return Vec::new();
        }
        self.error = None;
        media(self.session.accept_file(file, now_ms))
    }

    /// Returns `None` when `id` is not the recording timer.
    pub fn on_timer(&mut self, id: TimerId) -> Option<Vec<RecordingCommand>> {
        if self.recording_timer != Some(id) {
            return None;
        }
        if !self.session.is_recording() {
            self.recording_timer = None;
            return Some(Vec::new());
        }
        self.recording_seconds = self.recording_seconds.saturating_add(1);
        Some(vec![RecordingCommand::StartTimer {
            id,
            millis: RECORDING_TICK_MS,
        }])
    }

    fn cancel_recording_timer(&mut self) -> Vec<RecordingCommand> {
        self.recording_timer
            .take()
            .map(|id| RecordingCommand::CancelTimer { id })
            .into_iter()
            .collect()
    }

    /// Every exit path lands here. Releases everything the session owns.
    pub fn close(&mut self) -> Vec<RecordingCommand> {
        if !self.open {
            return Vec::new();
        }
        tracing::debug!(phase = ?self.phase(), "recording dialog closing");
        self.open = false;
        self.generation += 1;
        self.initializing = false;
        self.error = None;
        self.recording_seconds = 0;
        let mut commands = self.cancel_recording_timer();
        commands.extend(media(self.session.release()));
        commands
    }
}
