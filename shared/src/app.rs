use serde::de::DeserializeOwned;
use serde::Serialize;

use crux_core::App as _;

use crate::advice::{
    AdviceError, DataUri, DistressRequest, DistressResponse, HotspotResponse, RequestTicket,
    SafetyAdviceRequest, SafetyAdviceResponse,
};
use crate::call::{CallCommand, CallSession, Caller};
use crate::capabilities::{post_json, Capabilities, TimerId, TimerOutput, ValidatedUrl};
use crate::config::{AdviceEndpoint, AppConfig};
use crate::event::{ChatText, Event};
use crate::evidence::{DialogTicket, MediaCommand, RecordingCommand};
use crate::model::{Model, ToastKind};
use crate::navigation::{Screen, Transition, Visible};
use crate::safety::{SafetyCommand, SosTrigger};
use crate::screens::{find_contact, MapError, Settled, TrackingState};
use crate::view::ViewModel;
use crate::{AppError, ErrorKind, CONTACT_CALL_TOAST_MS, EVIDENCE_TOAST_MS, SOS_TOAST_MS};

const ADVICE_ERROR_DESCRIPTION: &str = "Could not get a response from the AI. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdviceScreen {
    Assistant,
    Map,
}

impl AdviceScreen {
    fn error_title(self) -> &'static str {
        match self {
            AdviceScreen::Assistant => "Error fetching advice",
            AdviceScreen::Map => "Error generating map",
        }
    }
}

#[derive(Default)]
pub struct App;

impl App {
    fn is_showing(model: &Model, screen: Screen) -> bool {
        model.nav.visible() == Visible::Screen(screen)
    }

    // ------------------------------------------------------------------
    // Command runners
    // ------------------------------------------------------------------

    fn run_call(commands: Vec<CallCommand>, model: &mut Model, caps: &Capabilities) {
        for command in commands {
            match command {
                CallCommand::StartTicker { id, millis } => {
                    caps.timer.start(id, millis, Event::TimerFired);
                }
                CallCommand::CancelTicker { id } => caps.timer.cancel(id),
                CallCommand::TearDownOverlay => {
                    model.call = None;
                    model.nav.dismiss_fake_call();
                    tracing::info!(screen = %model.nav.active(), "call overlay dismissed");
                }
            }
        }
    }

    /// Callbacks are tagged with the dialog's ticket as of now, so run this
    /// after the dialog has been updated.
    fn run_recording(commands: Vec<RecordingCommand>, model: &Model, caps: &Capabilities) {
        let ticket = model.recording.ticket();
        for command in commands {
            match command {
                RecordingCommand::Media(media) => Self::run_media(media, ticket, caps),
                RecordingCommand::StartTimer { id, millis } => {
                    caps.timer.start(id, millis, Event::TimerFired);
                }
                RecordingCommand::CancelTimer { id } => caps.timer.cancel(id),
            }
        }
    }

    fn run_media(command: MediaCommand, ticket: DialogTicket, caps: &Capabilities) {
        match command {
            MediaCommand::QueryEnvironment { candidates } => {
                caps.media.query_environment(candidates, move |result| {
                    Event::MediaEnvironmentReported {
                        ticket,
                        result: Box::new(result),
                    }
                });
            }
            MediaCommand::Acquire { constraints } => {
                caps.media.acquire(constraints, move |result| Event::StreamAcquired {
                    ticket,
                    result: Box::new(result),
                });
            }
            MediaCommand::AttachPreview { stream } => caps.media.attach_preview(stream),
            MediaCommand::StopTrack { stream, track } => caps.media.stop_track(stream, track),
            MediaCommand::StartRecorder {
                stream,
                mime_type,
                timeslice_ms,
            } => {
                caps.media
                    .start_recorder(stream, mime_type, timeslice_ms, move |result| {
                        Event::RecorderUpdate {
                            ticket,
                            result: Box::new(result),
                        }
                    });
            }
            MediaCommand::StopRecorder { stream } => caps.media.stop_recorder(stream),
            MediaCommand::CreateObjectUrl {
                artifact,
                data,
                mime_type,
            } => {
                caps.media.create_object_url(data, mime_type, move |result| {
                    Event::ObjectUrlCreated {
                        ticket,
                        artifact,
                        result: Box::new(result),
                    }
                });
            }
            MediaCommand::RevokeObjectUrl { url } => caps.media.revoke_object_url(url),
        }
    }

    fn run_safety(commands: Vec<SafetyCommand>, model: &mut Model, caps: &Capabilities) {
        for command in commands {
            match command {
                SafetyCommand::StartTimer { id, millis } => {
                    caps.timer.start(id, millis, Event::TimerFired);
                }
                SafetyCommand::CancelTimer { id } => caps.timer.cancel(id),
                SafetyCommand::RaiseSos(trigger) => Self::announce_sos(trigger, model),
            }
        }
    }

    fn announce_sos(trigger: SosTrigger, model: &mut Model) {
        tracing::warn!(?trigger, "SOS activated");
        model.show_toast(
            "SOS Activated!",
            "Emergency alerts sent to contacts and authorities.",
            ToastKind::Destructive,
            Some(SOS_TOAST_MS),
        );
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    fn apply_transition(transition: Transition, model: &mut Model, caps: &Capabilities) {
        match transition {
            Transition::Left { from, to } => {
                tracing::info!(%from, %to, "navigated");
                Self::leave_screen(from, model, caps);
            }
            Transition::Suppressed => {
                tracing::debug!("navigation ignored while the call overlay is up");
            }
            Transition::Unchanged => {}
        }
    }

    /// Tears down everything local to `screen`.
    fn leave_screen(screen: Screen, model: &mut Model, caps: &Capabilities) {
        model.last_error = None;
        match screen {
            Screen::Home => {
                model.safety.cancel_sos();
                let commands = model.recording.close();
                Self::run_recording(commands, model, caps);
            }
            Screen::Map => {
                if let Some(timer) = model.map.leave() {
                    caps.timer.cancel(timer);
                }
            }
            Screen::Assistant => {
                if let Some(timer) = model.assistant.leave() {
                    caps.timer.cancel(timer);
                }
            }
            Screen::Tracking => model.tracking = TrackingState::default(),
            Screen::Resources | Screen::Profile => {}
        }
    }

    // ------------------------------------------------------------------
    // Advice service
    // ------------------------------------------------------------------

    /// Starts the timeout and posts the request. A request that cannot be
    /// sent settles immediately as a failure.
    fn request_advice<B, T>(
        &self,
        which: AdviceEndpoint,
        body: &B,
        (ticket, timer): (RequestTicket, TimerId),
        to_event: fn(RequestTicket, Result<T, AdviceError>) -> Event,
        model: &mut Model,
        caps: &Capabilities,
    ) where
        B: Serialize,
        T: DeserializeOwned + Send + 'static,
    {
        caps.timer
            .start(timer, model.config.advice.timeout_ms, Event::TimerFired);

        let sent = model
            .config
            .advice
            .endpoint(which)
            .map_err(|e| AdviceError::Failure {
                reason: e.to_string(),
            })
            .and_then(|url| ValidatedUrl::from_url(&url).map_err(AdviceError::from))
            .and_then(|url| {
                post_json(&caps.http, &url, body, move |result| {
                    to_event(ticket, result.map_err(AdviceError::from))
                })
                .map_err(AdviceError::from)
            });

        if let Err(error) = sent {
            tracing::warn!(%error, endpoint = ?which, "advice request not sent");
            self.update(to_event(ticket, Err(error)), model, caps);
        }
    }

    fn settle(settled: Settled, screen: AdviceScreen, model: &mut Model, caps: &Capabilities) {
        if let Some(timer) = settled.cancel_timer {
            caps.timer.cancel(timer);
        }
        match settled.failure {
            Some(failure) => {
                model.last_error = Some(
                    AppError::from(&failure).with_context("screen", format!("{screen:?}")),
                );
                model.show_toast(
                    screen.error_title(),
                    ADVICE_ERROR_DESCRIPTION,
                    ToastKind::Destructive,
                    None,
                );
            }
            None => model.last_error = None,
        }
    }

    fn configure(config: AppConfig, model: &mut Model) {
        match config.validate() {
            Ok(()) => {
                model.config = config.validated();
                tracing::info!(
                    base_url = %model.config.advice.base_url,
                    timeout_ms = model.config.advice.timeout_ms,
                    "configured"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "rejected configuration");
                model.last_error = Some(
                    AppError::new(ErrorKind::Validation, "Invalid configuration")
                        .with_internal(e.to_string()),
                );
            }
        }
    }

    fn on_timer(output: TimerOutput, model: &mut Model, caps: &Capabilities) {
        let id = match output {
            TimerOutput::Fired { id } => id,
            TimerOutput::Cancelled { id } => {
                tracing::trace!(timer = id.0, "timer cancelled");
                return;
            }
        };

        if let Some(call) = model.call.as_mut() {
            if call.ticker() == Some(id) {
                let commands = call.tick(id);
                Self::run_call(commands, model, caps);
                return;
            }
        }
        if let Some(commands) = model.recording.on_timer(id) {
            Self::run_recording(commands, model, caps);
            return;
        }
        let timeout_ms = model.config.advice.timeout_ms;
        if let Some(settled) = model.assistant.on_timer(id, timeout_ms) {
            Self::settle(settled, AdviceScreen::Assistant, model, caps);
            return;
        }
        if let Some(settled) = model.map.on_timer(id, timeout_ms) {
            Self::settle(settled, AdviceScreen::Map, model, caps);
            return;
        }
        if let Some(commands) = model.safety.on_timer(id) {
            Self::run_safety(commands, model, caps);
            return;
        }
        tracing::trace!(timer = id.0, "stale timer ignored");
    }
}

fn advice_event(ticket: RequestTicket, result: Result<SafetyAdviceResponse, AdviceError>) -> Event {
    Event::AdviceReceived {
        ticket,
        result: Box::new(result),
    }
}

fn hotspots_event(ticket: RequestTicket, result: Result<HotspotResponse, AdviceError>) -> Event {
    Event::HotspotsReceived {
        ticket,
        result: Box::new(result),
    }
}

fn distress_event(ticket: RequestTicket, result: Result<DistressResponse, AdviceError>) -> Event {
    Event::DistressAssessed {
        ticket,
        result: Box::new(result),
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        tracing::debug!(
            event = event.name(),
            user = event.is_user_initiated(),
            "update"
        );

        match event {
            Event::Configure(config) => Self::configure(*config, model),

            Event::Navigate { screen } => {
                let transition = model.nav.navigate(screen);
                Self::apply_transition(transition, model, caps);
            }

            Event::Back => {
                let transition = model.nav.back();
                Self::apply_transition(transition, model, caps);
            }

            Event::ToastDismissed { id } => {
                model.dismiss_toast(id);
            }

            Event::SosPressed => {
                if Self::is_showing(model, Screen::Home) {
                    model.safety.request_sos();
                }
            }

            Event::SosConfirmed => {
                let commands = model.safety.confirm_sos();
                Self::run_safety(commands, model, caps);
            }

            Event::SosCancelled => {
                model.safety.cancel_sos();
            }

            Event::FakeCallRequested => {
                if !model.nav.show_fake_call() {
                    tracing::debug!("call overlay already shown");
                } else {
                    // the screen underneath comes back fresh
                    Self::leave_screen(model.nav.active(), model, caps);
                    let caller = Caller::from(&model.config.call);
                    let (session, commands) = CallSession::start(
                        caller,
                        model.config.call.auto_answer,
                        &mut model.timers,
                    );
                    tracing::info!(caller = %session.caller().name, "fake call started");
                    model.call = Some(session);
                    Self::run_call(commands, model, caps);
                }
            }

            Event::CallAccepted => {
                let commands = match model.call.as_mut() {
                    Some(call) => call.accept(&mut model.timers),
                    None => Vec::new(),
                };
                Self::run_call(commands, model, caps);
            }

            Event::CallHungUp => {
                let commands = match model.call.as_mut() {
                    Some(call) => call.hang_up(),
                    None if model.nav.fake_call_shown() => vec![CallCommand::TearDownOverlay],
                    None => Vec::new(),
                };
                Self::run_call(commands, model, caps);
            }

            Event::RecordDialogOpened => {
                if Self::is_showing(model, Screen::Home) && model.recording.open() {
                    model.show_toast(
                        "Evidence Capture",
                        "Opening camera…",
                        ToastKind::Default,
                        Some(EVIDENCE_TOAST_MS),
                    );
                    let commands = model.recording.init_camera(&model.config.capture);
                    Self::run_recording(commands, model, caps);
                }
            }

            Event::RecordDialogClosed => {
                let commands = model.recording.close();
                Self::run_recording(commands, model, caps);
            }

            Event::CameraInitRequested => {
                let commands = model.recording.init_camera(&model.config.capture);
                Self::run_recording(commands, model, caps);
            }

            Event::RecordingStartRequested => {
                let commands = model
                    .recording
                    .start_recording(&model.config.capture, &mut model.timers);
                Self::run_recording(commands, model, caps);
            }

            Event::RecordingStopRequested => {
                let commands = model.recording.stop_recording();
                Self::run_recording(commands, model, caps);
            }

            Event::FallbackFilePicked { file, picked_at_ms } => {
                let commands = model.recording.accept_file(*file, picked_at_ms);
                Self::run_recording(commands, model, caps);
            }

            Event::AssistantInputChanged { text } => {
                model.assistant.set_input(text.into_inner());
            }

            Event::AssistantPromptSubmitted { text, time_of_day } => {
                if !Self::is_showing(model, Screen::Assistant) {
                    return;
                }
                let prompt = text.as_ref().map(ChatText::as_str);
                if let Some((ticket, timer, question)) =
                    model.assistant.submit(prompt, &mut model.timers)
                {
                    let request = SafetyAdviceRequest::for_question(
                        &model.config.advice.default_location,
                        &time_of_day,
                        &question,
                    );
                    self.request_advice(
                        AdviceEndpoint::SafetyAdvice,
                        &request,
                        (ticket, timer),
                        advice_event,
                        model,
                        caps,
                    );
                }
            }

            Event::MapLocationChanged { location } => {
                model.map.set_location(location.into_inner());
            }

            Event::HotspotsRequested { time_of_day } => {
                if !Self::is_showing(model, Screen::Map) {
                    return;
                }
                match model.map.request(&time_of_day, &mut model.timers) {
                    Ok(Some((ticket, timer, request))) => {
                        self.request_advice(
                            AdviceEndpoint::Hotspots,
                            &request,
                            (ticket, timer),
                            hotspots_event,
                            model,
                            caps,
                        );
                    }
                    Ok(None) => tracing::debug!("hotspot request already in flight"),
                    Err(e @ MapError::LocationRequired) => {
                        model.last_error = Some(AppError::from(&e));
                        model.show_toast(
                            "Location required",
                            e.to_string(),
                            ToastKind::Destructive,
                            None,
                        );
                    }
                }
            }

            Event::DistressCheckRequested {
                movement_data,
                audio_data,
            } => {
                let parsed = DataUri::parse(&movement_data).and_then(|movement| {
                    let audio = audio_data.as_deref().map(DataUri::parse).transpose()?;
                    Ok(DistressRequest {
                        movement_data: movement,
                        audio_data: audio,
                    })
                });
                match parsed {
                    Err(e) => {
                        tracing::warn!(error = %e, "distress sample rejected");
                        model.last_error = Some(
                            AppError::new(ErrorKind::Validation, e.to_string())
                                .with_context("field", "movementData"),
                        );
                    }
                    Ok(request) => match model.safety.begin_distress_check(&mut model.timers) {
                        Some((ticket, timer)) => {
                            tracing::debug!(movement = %request.movement_data, "checking for distress");
                            self.request_advice(
                                AdviceEndpoint::Distress,
                                &request,
                                (ticket, timer),
                                distress_event,
                                model,
                                caps,
                            );
                        }
                        None => tracing::debug!("distress check already in flight"),
                    },
                }
            }

            Event::SafetyPromptConfirmed => {
                let commands = model.safety.confirm_safe();
                Self::run_safety(commands, model, caps);
            }

            Event::SafetyPromptDeclined => {
                let commands = model.safety.decline_safe();
                Self::run_safety(commands, model, caps);
            }

            Event::LocationSharingToggled { enabled } => {
                if Self::is_showing(model, Screen::Tracking) && model.tracking.set_session(enabled)
                {
                    tracing::info!(enabled, "walking session toggled");
                }
            }

            Event::ContactCallRequested { name } => match find_contact(&name) {
                Some(contact) => {
                    model.show_toast(
                        format!("Calling {}...", contact.name),
                        "Opening dialer to call your trusted contact.",
                        ToastKind::Default,
                        Some(CONTACT_CALL_TOAST_MS),
                    );
                }
                None => tracing::warn!(%name, "unknown contact"),
            },

            // --- capability responses ---
            Event::MediaEnvironmentReported { ticket, result } => {
                let commands =
                    model
                        .recording
                        .on_environment(ticket, *result, &model.config.capture);
                Self::run_recording(commands, model, caps);
            }

            Event::StreamAcquired { ticket, result } => {
                let commands = model.recording.on_stream(ticket, *result);
                Self::run_recording(commands, model, caps);
            }

            Event::RecorderUpdate { ticket, result } => {
                let commands = model.recording.on_recorder(ticket, *result);
                Self::run_recording(commands, model, caps);
            }

            Event::ObjectUrlCreated {
                ticket,
                artifact,
                result,
            } => {
                let commands = model.recording.on_object_url(ticket, artifact, *result);
                Self::run_recording(commands, model, caps);
            }

            Event::TimerFired(output) => Self::on_timer(output, model, caps),

            Event::AdviceReceived { ticket, result } => {
                if let Some(settled) = model.assistant.on_response(ticket, *result) {
                    Self::settle(settled, AdviceScreen::Assistant, model, caps);
                }
            }

            Event::HotspotsReceived { ticket, result } => {
                if let Some(settled) = model.map.on_response(ticket, *result) {
                    Self::settle(settled, AdviceScreen::Map, model, caps);
                }
            }

            Event::DistressAssessed { ticket, result } => {
                let commands = model.safety.on_assessment(
                    ticket,
                    *result,
                    &mut model.timers,
                    model.config.safety.prompt_timeout_ms,
                );
                Self::run_safety(commands, model, caps);
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::build(model)
    }
}
