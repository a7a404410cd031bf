use serde::{Deserialize, Serialize};

use crate::call::CallSession;
use crate::capabilities::TimerIds;
use crate::config::AppConfig;
use crate::evidence::RecordingDialog;
use crate::navigation::Navigator;
use crate::safety::SafetyMonitor;
use crate::screens::{AssistantState, MapState, TrackingState};
use crate::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Default,
    Destructive,
}

/// Only one toast is shown at a time; a new one replaces the old.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub kind: ToastKind,
    /// `None` leaves dismissal to the shell's default.
    pub duration_ms: Option<u64>,
}

/// Core state. Never crosses the bridge; the shell only sees the view.
#[derive(Debug, Default)]
pub struct Model {
    pub config: AppConfig,
    pub nav: Navigator,
    pub timers: TimerIds,

    pub toast: Option<Toast>,
    next_toast_id: u64,

    pub safety: SafetyMonitor,
    /// Lives exactly as long as the fake-call overlay.
    pub call: Option<CallSession>,
    pub recording: RecordingDialog,
    pub assistant: AssistantState,
    pub map: MapState,
    pub tracking: TrackingState,

    pub last_error: Option<AppError>,
}

impl Model {
    pub fn show_toast(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        kind: ToastKind,
        duration_ms: Option<u64>,
    ) -> u64 {
        self.next_toast_id += 1;
        let toast = Toast {
            id: self.next_toast_id,
            title: title.into(),
            description: description.into(),
            kind,
            duration_ms,
        };
        tracing::debug!(id = toast.id, title = %toast.title, "toast shown");
        self.toast = Some(toast);
        self.next_toast_id
    }

    /// Ignores ids of toasts that were already replaced.
    pub fn dismiss_toast(&mut self, id: u64) -> bool {
        if self.toast.as_ref().is_some_and(|t| t.id == id) {
            self.toast = None;
            true
        } else {
            false
        }
    }
}
