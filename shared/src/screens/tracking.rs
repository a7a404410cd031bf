use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardianStatus {
    Viewing,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guardian {
    pub name: &'static str,
    pub relation: &'static str,
    pub status: GuardianStatus,
}

pub static GUARDIANS: [Guardian; 2] = [
    Guardian {
        name: "Mom",
        relation: "Guardian",
        status: GuardianStatus::Viewing,
    },
    Guardian {
        name: "Aisha Khan",
        relation: "Guardian",
        status: GuardianStatus::Idle,
    },
];

/// "Walking With Me" switch. Nothing is shared; the flag only drives the UI.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrackingState {
    session_active: bool,
}

impl TrackingState {
    pub fn session_active(&self) -> bool {
        self.session_active
    }

    /// Returns whether the flag changed.
    pub fn set_session(&mut self, enabled: bool) -> bool {
        let changed = self.session_active != enabled;
        self.session_active = enabled;
        changed
    }
}
