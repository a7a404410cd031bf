//! Screen-local state. Each screen's state is reset when the user leaves it.

pub mod assistant;
pub mod map;
pub mod profile;
pub mod tracking;

pub use self::assistant::{AssistantState, ChatMessage, Sender, GREETING, QUICK_PROMPTS};
pub use self::map::{MapError, MapState, DEFAULT_MAP_LOCATION};
pub use self::profile::{find_contact, Contact, TRUSTED_CONTACTS};
pub use self::tracking::{Guardian, GuardianStatus, TrackingState, GUARDIANS};

use crate::advice::AdviceError;
use crate::capabilities::TimerId;

/// How an advice request ended, as seen by the screen that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    /// Timeout timer still armed, to be cancelled.
    pub cancel_timer: Option<TimerId>,
    /// Set when demo content was substituted.
    pub failure: Option<AdviceError>,
}
