use serde::{Deserialize, Serialize};

use crate::call::{format_elapsed, CallSession, CallStatus};
use crate::capabilities::StreamId;
use crate::evidence::{CaptureError, DialogPhase, RecordingDialog};
use crate::model::{Model, Toast, ToastKind};
use crate::navigation::{Screen, Visible};
use crate::safety::SafetyMonitor;
use crate::screens::{
    AssistantState, ChatMessage, GuardianStatus, MapState, TrackingState, GUARDIANS,
    QUICK_PROMPTS, TRUSTED_CONTACTS,
};
use crate::{AppError, ErrorSeverity};

pub const USER_NAME: &str = "Priya";
pub const WELCOME_MESSAGE: &str = "Welcome Back,";

pub const SOS_CONFIRM_TITLE: &str = "Activate Emergency SOS?";
pub const SOS_CONFIRM_DESCRIPTION: &str = "This will send your live location and an emergency \
alert to your guardians and local authorities. Are you sure?";

pub const SAFETY_PROMPT_TITLE: &str = "Are you safe?";

pub const RECORD_TITLE: &str = "Record Evidence";
pub const RECORD_DESCRIPTION: &str = "Grant camera/microphone access, then start recording.";
pub const FALLBACK_NOTICE: &str =
    "This browser does not support in-app recording. Use the fallback capture below.";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToastView {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub kind: ToastKind,
    pub duration_ms: Option<u64>,
}

impl From<&Toast> for ToastView {
    fn from(t: &Toast) -> Self {
        Self {
            id: t.id,
            title: t.title.clone(),
            description: t.description.clone(),
            kind: t.kind,
            duration_ms: t.duration_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HeaderView {
    pub title: String,
    pub description: Option<String>,
    pub welcome_message: Option<String>,
    pub show_back: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NavItemView {
    pub id: String,
    pub label: String,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConfirmView {
    pub title: String,
    pub description: String,
    pub cancel_label: String,
    pub confirm_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CallView {
    pub caller_name: String,
    pub caller_initial: String,
    pub avatar_url: Option<String>,
    pub status: CallStatus,
    /// Caller subtext while ringing, `mm:ss` once answered.
    pub status_line: String,
    pub can_accept: bool,
    pub hang_up_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ButtonView {
    pub label: String,
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ArtifactView {
    pub url: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecordingView {
    pub phase: DialogPhase,
    pub title: String,
    pub description: String,
    pub error: Option<String>,
    pub error_code: Option<String>,
    /// Present while there is no stream.
    pub camera_button: Option<ButtonView>,
    /// Present when there is a stream and the host can record.
    pub start_button: Option<ButtonView>,
    pub stop_button: Option<ButtonView>,
    /// Present when the host cannot record.
    pub fallback_notice: Option<String>,
    pub preview_stream: Option<StreamId>,
    pub elapsed: Option<String>,
    pub artifact: Option<ArtifactView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HomeView {
    pub sos_hint: String,
    pub recording: Option<RecordingView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HotspotView {
    pub crime_heatmap_data: String,
    pub safe_route_suggestions: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MapView {
    pub location: String,
    pub loading: bool,
    pub button: ButtonView,
    pub insights: Option<HotspotView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AssistantView {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub loading: bool,
    pub quick_prompts: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersonView {
    pub name: String,
    pub initial: String,
    pub relation: String,
    pub status: Option<GuardianStatus>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackingView {
    pub guardians: Vec<PersonView>,
    pub session_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileView {
    pub name: String,
    pub contacts: Vec<PersonView>,
    pub guardians: Vec<PersonView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SafetyPromptView {
    pub title: String,
    pub reason: String,
    pub confirm_label: String,
    pub decline_label: String,
}

/// Exactly one of these is on screen.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ScreenView {
    FakeCall(CallView),
    Home(HomeView),
    Map(MapView),
    Assistant(AssistantView),
    Tracking(TrackingView),
    Resources,
    Profile(ProfileView),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    /// Hidden behind the call overlay.
    pub header: Option<HeaderView>,
    pub nav_items: Vec<NavItemView>,
    pub screen: ScreenView,
    pub toast: Option<ToastView>,
    pub sos_confirm: Option<ConfirmView>,
    pub safety_prompt: Option<SafetyPromptView>,
    pub error: Option<UserFacingError>,
}

impl ViewModel {
    pub fn build(model: &Model) -> Self {
        let (header, nav_items, screen) = match model.nav.visible() {
            Visible::FakeCall => {
                let screen = match &model.call {
                    Some(call) => ScreenView::FakeCall(call_view(call)),
                    // overlay without a session renders as home
                    None => ScreenView::Home(home_view(&model.recording)),
                };
                (None, Vec::new(), screen)
            }
            Visible::Screen(active) => (
                Some(header_view(active)),
                nav_items(active),
                screen_view(active, model),
            ),
        };

        Self {
            header,
            nav_items,
            screen,
            toast: model.toast.as_ref().map(ToastView::from),
            sos_confirm: sos_confirm_view(&model.safety),
            safety_prompt: safety_prompt_view(&model.safety),
            error: model.last_error.as_ref().map(UserFacingError::from),
        }
    }
}

fn header_view(screen: Screen) -> HeaderView {
    match screen.title() {
        Some(title) => HeaderView {
            title: title.to_string(),
            description: screen.description().map(str::to_string),
            welcome_message: None,
            show_back: true,
        },
        None => HeaderView {
            title: USER_NAME.to_string(),
            description: None,
            welcome_message: Some(WELCOME_MESSAGE.to_string()),
            show_back: false,
        },
    }
}

fn nav_items(active: Screen) -> Vec<NavItemView> {
    Screen::ALL
        .into_iter()
        .filter(|s| s.in_tab_bar())
        .map(|s| NavItemView {
            id: s.id().to_string(),
            label: s.label().to_string(),
            active: s == active,
        })
        .collect()
}

fn screen_view(screen: Screen, model: &Model) -> ScreenView {
    match screen {
        Screen::Home => ScreenView::Home(home_view(&model.recording)),
        Screen::Map => ScreenView::Map(map_view(&model.map)),
        Screen::Assistant => ScreenView::Assistant(assistant_view(&model.assistant)),
        Screen::Tracking => ScreenView::Tracking(tracking_view(&model.tracking)),
        Screen::Resources => ScreenView::Resources,
        Screen::Profile => ScreenView::Profile(profile_view()),
    }
}

fn call_view(call: &CallSession) -> CallView {
    let caller = call.caller();
    CallView {
        caller_name: caller.name.clone(),
        caller_initial: caller.initial(),
        avatar_url: caller.avatar_url.clone(),
        status: call.status(),
        status_line: call.status_line(),
        can_accept: call.status() == CallStatus::Ringing,
        hang_up_label: call.hang_up_label().to_string(),
    }
}

fn home_view(dialog: &RecordingDialog) -> HomeView {
    HomeView {
        sos_hint: "Press the button to send an SOS alert to your emergency contacts.".to_string(),
        recording: recording_view(dialog),
    }
}

fn recording_view(dialog: &RecordingDialog) -> Option<RecordingView> {
    let phase = dialog.phase();
    if phase == DialogPhase::Closed {
        return None;
    }
    let session = dialog.session();
    let can_record = dialog.environment().map_or(true, |env| env.has_recorder);
    let recording = session.is_recording();

    let camera_button = (!session.has_stream()).then(|| {
        let initializing = phase == DialogPhase::Initializing;
        ButtonView {
            label: if initializing { "Starting Camera…" } else { "Start Camera" }.to_string(),
            enabled: !initializing,
        }
    });
    let controls = session.has_stream() && can_record;

    Some(RecordingView {
        phase,
        title: RECORD_TITLE.to_string(),
        description: RECORD_DESCRIPTION.to_string(),
        error: dialog.error().map(CaptureError::to_string),
        error_code: dialog.error().map(|e| e.kind().code().to_string()),
        camera_button,
        start_button: controls.then(|| ButtonView {
            label: "Start".to_string(),
            enabled: !recording,
        }),
        stop_button: controls.then(|| ButtonView {
            label: "Stop".to_string(),
            enabled: recording,
        }),
        fallback_notice: dialog
            .needs_fallback_picker()
            .then(|| FALLBACK_NOTICE.to_string()),
        preview_stream: session.stream().map(|s| s.id.clone()),
        elapsed: recording.then(|| format_elapsed(dialog.recording_seconds())),
        artifact: session.artifact().and_then(|a| {
            a.url.as_ref().map(|url| ArtifactView {
                url: url.clone(),
                file_name: a.file_name.clone(),
                mime_type: a.mime_type.clone(),
                size_bytes: a.size_bytes,
            })
        }),
    })
}

fn map_view(map: &MapState) -> MapView {
    let loading = map.is_loading();
    MapView {
        location: map.location().to_string(),
        loading,
        button: ButtonView {
            label: if loading { "Generating..." } else { "Get Safety Map" }.to_string(),
            enabled: !loading,
        },
        insights: map.insights().map(|i| HotspotView {
            crime_heatmap_data: i.crime_heatmap_data.clone(),
            safe_route_suggestions: i.safe_route_suggestions.clone(),
        }),
    }
}

fn assistant_view(assistant: &AssistantState) -> AssistantView {
    AssistantView {
        messages: assistant.messages().to_vec(),
        input: assistant.input().to_string(),
        loading: assistant.is_loading(),
        quick_prompts: QUICK_PROMPTS.iter().map(|p| (*p).to_string()).collect(),
    }
}

fn person(name: &str, relation: &str, status: Option<GuardianStatus>) -> PersonView {
    PersonView {
        name: name.to_string(),
        initial: name.chars().next().map(String::from).unwrap_or_default(),
        relation: relation.to_string(),
        status,
    }
}

fn guardian_views() -> Vec<PersonView> {
    GUARDIANS
        .iter()
        .map(|g| person(g.name, g.relation, Some(g.status)))
        .collect()
}

fn tracking_view(tracking: &TrackingState) -> TrackingView {
    TrackingView {
        guardians: guardian_views(),
        session_active: tracking.session_active(),
    }
}

fn profile_view() -> ProfileView {
    ProfileView {
        name: USER_NAME.to_string(),
        contacts: TRUSTED_CONTACTS
            .iter()
            .map(|c| person(c.name, c.relation, None))
            .collect(),
        guardians: guardian_views(),
    }
}

fn sos_confirm_view(safety: &SafetyMonitor) -> Option<ConfirmView> {
    safety.sos_confirm_open().then(|| ConfirmView {
        title: SOS_CONFIRM_TITLE.to_string(),
        description: SOS_CONFIRM_DESCRIPTION.to_string(),
        cancel_label: "Cancel".to_string(),
        confirm_label: "Activate SOS".to_string(),
    })
}

fn safety_prompt_view(safety: &SafetyMonitor) -> Option<SafetyPromptView> {
    safety.prompt_reason().map(|reason| SafetyPromptView {
        title: SAFETY_PROMPT_TITLE.to_string(),
        reason: reason.to_string(),
        confirm_label: "I'm safe".to_string(),
        decline_label: "I need help".to_string(),
    })
}
