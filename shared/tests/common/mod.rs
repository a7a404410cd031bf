//! A scripted shell for driving the core through `AppTester`.
//!
//! Notifications (track stops, previews, URL revocations) are applied to
//! the fake device as soon as they appear. Requests that need an answer
//! are queued until the test resolves them, so tests control ordering.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};

use crux_core::testing::AppTester;
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};

use shared::capabilities::{
    MediaEnvironment, MediaError, MediaOperation, MediaOutput, RecorderEvent, StreamHandle,
    StreamId, TimerId, TimerOperation, TimerOutput, TrackId, TrackInfo, TrackKind,
};
use shared::view::ViewModel;
use shared::{App, Effect, Event, Model};

pub struct FakeDevice {
    pub environment: MediaEnvironment,
    /// Formats the recorder claims to support.
    pub supported_formats: Vec<String>,
    pub fail_next_acquire: Option<MediaError>,
    pub tracks_per_stream: usize,
    next_stream: u32,
    next_url: u32,
    pub live_tracks: HashSet<(StreamId, TrackId)>,
    pub stopped_tracks: Vec<(StreamId, TrackId)>,
    pub acquired_tracks: usize,
    pub previews: Vec<StreamId>,
    pub recorder_stops: Vec<StreamId>,
    pub created_urls: Vec<String>,
    pub revoked_urls: Vec<String>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            environment: MediaEnvironment::default(),
            supported_formats: vec!["video/webm".to_string()],
            fail_next_acquire: None,
            tracks_per_stream: 2,
            next_stream: 0,
            next_url: 0,
            live_tracks: HashSet::new(),
            stopped_tracks: Vec::new(),
            acquired_tracks: 0,
            previews: Vec::new(),
            recorder_stops: Vec::new(),
            created_urls: Vec::new(),
            revoked_urls: Vec::new(),
        }
    }
}

impl FakeDevice {
    fn answer(&mut self, operation: &MediaOperation) -> Result<MediaOutput, MediaError> {
        match operation {
            MediaOperation::QueryEnvironment { candidates } => {
                let mut env = self.environment.clone();
                env.supported_formats = candidates
                    .iter()
                    .filter(|c| self.supported_formats.contains(c))
                    .cloned()
                    .collect();
                Ok(MediaOutput::Environment(env))
            }
            MediaOperation::Acquire { .. } => {
                if let Some(error) = self.fail_next_acquire.take() {
                    return Err(error);
                }
                self.next_stream += 1;
                let id = StreamId::new(format!("stream-{}", self.next_stream));
                let tracks: Vec<TrackInfo> = (0..self.tracks_per_stream)
                    .map(|n| TrackInfo {
                        id: TrackId::new(format!("{}-track-{n}", id.as_str())),
                        kind: if n == 0 { TrackKind::Video } else { TrackKind::Audio },
                    })
                    .collect();
                for track in &tracks {
                    self.live_tracks.insert((id.clone(), track.id.clone()));
                }
                self.acquired_tracks += tracks.len();
                Ok(MediaOutput::Stream(StreamHandle { id, tracks }))
            }
            MediaOperation::CreateObjectUrl { .. } => {
                self.next_url += 1;
                let url = format!("blob:fake/{}", self.next_url);
                self.created_urls.push(url.clone());
                Ok(MediaOutput::ObjectUrl(url))
            }
            other => panic!("{other:?} does not expect an answer"),
        }
    }

    fn notify(&mut self, operation: &MediaOperation) {
        match operation {
            MediaOperation::AttachPreview { stream } => self.previews.push(stream.clone()),
            MediaOperation::StopTrack { stream, track } => {
                let key = (stream.clone(), track.clone());
                assert!(
                    self.live_tracks.remove(&key),
                    "track {track} stopped twice or never acquired"
                );
                self.stopped_tracks.push(key);
            }
            MediaOperation::StopRecorder { stream } => self.recorder_stops.push(stream.clone()),
            MediaOperation::RevokeObjectUrl { url } => self.revoked_urls.push(url.clone()),
            _ => {}
        }
    }

    pub fn outstanding_urls(&self) -> usize {
        self.created_urls
            .iter()
            .filter(|u| !self.revoked_urls.contains(u))
            .count()
    }
}

struct PendingTimer {
    id: TimerId,
    due_ms: u64,
    request: Request<TimerOperation>,
}

pub struct FakeShell {
    pub app: AppTester<App, Effect>,
    pub model: Model,
    pub device: FakeDevice,
    pub now_ms: u64,
    pub renders: usize,
    pub http_requests: usize,
    http: VecDeque<Request<HttpRequest>>,
    media: VecDeque<Request<MediaOperation>>,
    recorder: Option<Request<MediaOperation>>,
    timers: Vec<PendingTimer>,
}

impl Default for FakeShell {
    fn default() -> Self {
        Self::with_device(FakeDevice::default())
    }
}

impl FakeShell {
    pub fn with_device(device: FakeDevice) -> Self {
        Self {
            app: AppTester::<App, Effect>::default(),
            model: Model::default(),
            device,
            now_ms: 0,
            renders: 0,
            http_requests: 0,
            http: VecDeque::new(),
            media: VecDeque::new(),
            recorder: None,
            timers: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, event: Event) {
        let update = self.app.update(event, &mut self.model);
        self.absorb(update.effects);
        for event in update.events {
            self.dispatch(event);
        }
    }

    fn absorb(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render(_) => self.renders += 1,
                Effect::Http(request) => {
                    self.http_requests += 1;
                    self.http.push_back(request);
                }
                Effect::Media(request) => {
                    let answered = matches!(
                        request.operation,
                        MediaOperation::QueryEnvironment { .. }
                            | MediaOperation::Acquire { .. }
                            | MediaOperation::CreateObjectUrl { .. }
                    );
                    if answered {
                        self.media.push_back(request);
                    } else if matches!(request.operation, MediaOperation::StartRecorder { .. }) {
                        self.recorder = Some(request);
                    } else {
                        self.device.notify(&request.operation);
                    }
                }
                Effect::Timer(request) => match request.operation {
                    TimerOperation::Start { id, millis } => {
                        self.timers.retain(|t| t.id != id);
                        self.timers.push(PendingTimer {
                            id,
                            due_ms: self.now_ms + millis,
                            request,
                        });
                    }
                    TimerOperation::Cancel { id } => self.timers.retain(|t| t.id != id),
                },
            }
        }
    }

    pub fn pending_http(&self) -> usize {
        self.http.len()
    }

    /// The oldest outstanding HTTP request, as the shell would send it.
    pub fn next_http_request(&self) -> Option<&HttpRequest> {
        self.http.front().map(|r| &r.operation)
    }

    /// Parses the JSON body of the oldest outstanding HTTP request.
    pub fn next_http_body(&self) -> serde_json::Value {
        let request = self.next_http_request().expect("no pending http request");
        serde_json::from_slice(&request.body).expect("request body should be json")
    }

    /// Answers the oldest outstanding HTTP request with `response`.
    pub fn resolve_http(&mut self, response: HttpResponse) {
        let mut request = self.http.pop_front().expect("no pending http request");
        let update = self
            .app
            .resolve(&mut request, HttpResult::Ok(response))
            .expect("http request should resolve");
        self.absorb(update.effects);
        for event in update.events {
            self.dispatch(event);
        }
    }

    pub fn pending_media(&self) -> usize {
        self.media.len()
    }

    pub fn next_media_operation(&self) -> Option<&MediaOperation> {
        self.media.front().map(|r| &r.operation)
    }

    /// Answers the oldest outstanding media request from the fake device.
    pub fn resolve_media(&mut self) {
        let mut request = self.media.pop_front().expect("no pending media request");
        let answer = self.device.answer(&request.operation);
        self.resolve(&mut request, answer);
    }

    pub fn resolve_media_with(&mut self, answer: Result<MediaOutput, MediaError>) {
        let mut request = self.media.pop_front().expect("no pending media request");
        self.resolve(&mut request, answer);
    }

    /// Takes the oldest outstanding media request without answering it.
    pub fn hold_media(&mut self) -> Request<MediaOperation> {
        self.media.pop_front().expect("no pending media request")
    }

    pub fn resolve_held(&mut self, mut request: Request<MediaOperation>) {
        let answer = self.device.answer(&request.operation);
        self.resolve(&mut request, answer);
    }

    fn resolve(
        &mut self,
        request: &mut Request<MediaOperation>,
        answer: Result<MediaOutput, MediaError>,
    ) {
        let update = self
            .app
            .resolve(request, answer)
            .expect("media request should resolve");
        self.absorb(update.effects);
        for event in update.events {
            self.dispatch(event);
        }
    }

    pub fn recorder_running(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn recorder_mime(&self) -> Option<Option<String>> {
        self.recorder.as_ref().map(|r| match &r.operation {
            MediaOperation::StartRecorder { mime_type, .. } => mime_type.clone(),
            _ => None,
        })
    }

    /// Pushes one event down the recorder stream.
    pub fn emit_recorder(&mut self, event: RecorderEvent) {
        let terminal = event.is_terminal();
        let mut request = self.recorder.take().expect("no recorder running");
        let update = self
            .app
            .resolve(&mut request, Ok(MediaOutput::Recorder(event)))
            .expect("recorder stream should accept events");
        if !terminal {
            self.recorder = Some(request);
        }
        self.absorb(update.effects);
        for event in update.events {
            self.dispatch(event);
        }
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn has_timer(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Moves the clock forward, firing due timers in order.
    pub fn advance(&mut self, ms: u64) {
        let target = self.now_ms + ms;
        loop {
            let next = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due_ms <= target)
                .min_by_key(|(_, t)| t.due_ms)
                .map(|(i, _)| i);
            let Some(index) = next else { break };
            let mut timer = self.timers.remove(index);
            self.now_ms = timer.due_ms;
            let update = self
                .app
                .resolve(&mut timer.request, TimerOutput::Fired { id: timer.id })
                .expect("timer should resolve");
            self.absorb(update.effects);
            for event in update.events {
                self.dispatch(event);
            }
        }
        self.now_ms = target;
    }

    pub fn view(&self) -> ViewModel {
        self.app.view(&self.model)
    }
}
