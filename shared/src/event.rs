use serde::{Deserialize, Serialize};

use crate::advice::{
    AdviceError, DistressResponse, HotspotResponse, RequestTicket, SafetyAdviceResponse,
};
use crate::capabilities::{MediaResult, TimerOutput};
use crate::config::AppConfig;
use crate::evidence::{ArtifactId, DialogTicket, PickedFile};
use crate::navigation::Screen;
use crate::{MAX_CHAT_INPUT_CHARS, MAX_LOCATION_CHARS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("value too long ({len} > {max})")]
    TooLong { len: usize, max: usize },
}

// --- Bounded text: validated on construction and on deserialize ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(try_from = "String", into = "String")]
pub struct BoundedText<const MAX: usize>(String);

impl<const MAX: usize> BoundedText<MAX> {
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let len = s.chars().count();
        if len > MAX {
            return Err(ValidationError::TooLong { len, max: MAX });
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<const MAX: usize> TryFrom<String> for BoundedText<MAX> {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl<const MAX: usize> From<BoundedText<MAX>> for String {
    fn from(text: BoundedText<MAX>) -> Self {
        text.0
    }
}

pub type ChatText = BoundedText<MAX_CHAT_INPUT_CHARS>;
pub type LocationText = BoundedText<MAX_LOCATION_CHARS>;

type AdviceResult<T> = Result<T, AdviceError>;

// --- Event enum: large variants boxed, capability callbacks never cross the bridge ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Lifecycle
    Configure(Box<AppConfig>),

    // Navigation & chrome
    Navigate {
        screen: Screen,
    },
    Back,
    ToastDismissed {
        id: u64,
    },

    // SOS
    SosPressed,
    SosConfirmed,
    SosCancelled,

    // Fake call
    FakeCallRequested,
    CallAccepted,
    CallHungUp,

    // Evidence recording
    RecordDialogOpened,
    RecordDialogClosed,
    CameraInitRequested,
    RecordingStartRequested,
    RecordingStopRequested,
    FallbackFilePicked {
        file: Box<PickedFile>,
        picked_at_ms: i64,
    },

    // Safety assistant
    AssistantInputChanged {
        text: ChatText,
    },
    /// `text` is a quick prompt; `None` sends the input box.
    AssistantPromptSubmitted {
        text: Option<ChatText>,
        time_of_day: String,
    },

    // Safety map
    MapLocationChanged {
        location: LocationText,
    },
    HotspotsRequested {
        time_of_day: String,
    },

    // Distress detection
    DistressCheckRequested {
        movement_data: String,
        audio_data: Option<String>,
    },
    SafetyPromptConfirmed,
    SafetyPromptDeclined,

    // Tracking & profile
    LocationSharingToggled {
        enabled: bool,
    },
    ContactCallRequested {
        name: String,
    },

    // Capability responses
    #[serde(skip)]
    MediaEnvironmentReported {
        ticket: DialogTicket,
        result: Box<MediaResult>,
    },
    #[serde(skip)]
    StreamAcquired {
        ticket: DialogTicket,
        result: Box<MediaResult>,
    },
    #[serde(skip)]
    RecorderUpdate {
        ticket: DialogTicket,
        result: Box<MediaResult>,
    },
    #[serde(skip)]
    ObjectUrlCreated {
        ticket: DialogTicket,
        artifact: ArtifactId,
        result: Box<MediaResult>,
    },
    #[serde(skip)]
    TimerFired(TimerOutput),
    #[serde(skip)]
    AdviceReceived {
        ticket: RequestTicket,
        result: Box<AdviceResult<SafetyAdviceResponse>>,
    },
    #[serde(skip)]
    HotspotsReceived {
        ticket: RequestTicket,
        result: Box<AdviceResult<HotspotResponse>>,
    },
    #[serde(skip)]
    DistressAssessed {
        ticket: RequestTicket,
        result: Box<AdviceResult<DistressResponse>>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Configure(_) => "configure",
            Event::Navigate { .. } => "navigate",
            Event::Back => "back",
            Event::ToastDismissed { .. } => "toast_dismissed",
            Event::SosPressed => "sos_pressed",
            Event::SosConfirmed => "sos_confirmed",
            Event::SosCancelled => "sos_cancelled",
            Event::FakeCallRequested => "fake_call_requested",
            Event::CallAccepted => "call_accepted",
            Event::CallHungUp => "call_hung_up",
            Event::RecordDialogOpened => "record_dialog_opened",
            Event::RecordDialogClosed => "record_dialog_closed",
            Event::CameraInitRequested => "camera_init_requested",
            Event::RecordingStartRequested => "recording_start_requested",
            Event::RecordingStopRequested => "recording_stop_requested",
            Event::FallbackFilePicked { .. } => "fallback_file_picked",
            Event::AssistantInputChanged { .. } => "assistant_input_changed",
            Event::AssistantPromptSubmitted { .. } => "assistant_prompt_submitted",
            Event::MapLocationChanged { .. } => "map_location_changed",
            Event::HotspotsRequested { .. } => "hotspots_requested",
            Event::DistressCheckRequested { .. } => "distress_check_requested",
            Event::SafetyPromptConfirmed => "safety_prompt_confirmed",
            Event::SafetyPromptDeclined => "safety_prompt_declined",
            Event::LocationSharingToggled { .. } => "location_sharing_toggled",
            Event::ContactCallRequested { .. } => "contact_call_requested",
            Event::MediaEnvironmentReported { .. } => "media_environment_reported",
            Event::StreamAcquired { .. } => "stream_acquired",
            Event::RecorderUpdate { .. } => "recorder_update",
            Event::ObjectUrlCreated { .. } => "object_url_created",
            Event::TimerFired(_) => "timer_fired",
            Event::AdviceReceived { .. } => "advice_received",
            Event::HotspotsReceived { .. } => "hotspots_received",
            Event::DistressAssessed { .. } => "distress_assessed",
        }
    }

    pub fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Event::Configure(_)
                | Event::MediaEnvironmentReported { .. }
                | Event::StreamAcquired { .. }
                | Event::RecorderUpdate { .. }
                | Event::ObjectUrlCreated { .. }
                | Event::TimerFired(_)
                | Event::AdviceReceived { .. }
                | Event::HotspotsReceived { .. }
                | Event::DistressAssessed { .. }
        )
    }
}
