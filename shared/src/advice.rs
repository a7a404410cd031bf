//! Contracts for the advice-generation service and the bookkeeping that
//! bounds every call with a timeout.
//!
//! The service is slow and unreliable by nature. Each request races a
//! timer; whichever resolves first wins and the loser is discarded. A
//! timeout or failure is answered with deterministic demo content so the
//! user always gets something useful.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{HttpError, TimerId, TimerIds};
use crate::{AppError, ErrorKind};

// ============================================================================
// Wire contracts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAdviceRequest {
    pub location: String,
    pub time_of_day: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_crime_data: Option<String>,
}

impl SafetyAdviceRequest {
    /// The assistant phrases the user's question as crime context.
    pub fn for_question(location: &str, time_of_day: &str, question: &str) -> Self {
        Self {
            location: location.to_string(),
            time_of_day: time_of_day.to_string(),
            recent_crime_data: Some(format!("User asked: \"{question}\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyAdviceResponse {
    pub advice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotRequest {
    pub location: String,
    pub time_of_day: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotResponse {
    pub crime_heatmap_data: String,
    pub safe_route_suggestions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistressRequest {
    pub movement_data: DataUri,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<DataUri>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistressResponse {
    pub is_distress: bool,
    pub prompt_user: bool,
    #[serde(rename = "autoSendSOS")]
    pub auto_send_sos: bool,
    pub reason: String,
}

/// `data:<mime>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataUri(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("data URI must start with 'data:'")]
    MissingScheme,
    #[error("data URI must declare a MIME type")]
    MissingMimeType,
    #[error("data URI must be base64-encoded")]
    NotBase64,
    #[error("data URI payload is empty")]
    EmptyPayload,
    #[error("data URI payload contains invalid base64")]
    InvalidPayload,
}

impl DataUri {
    pub fn parse(raw: &str) -> Result<Self, DataUriError> {
        let rest = raw.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotBase64)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(DataUriError::NotBase64)?;
        let essence = mime.split(';').next().unwrap_or_default();
        if essence.is_empty() || !essence.contains('/') {
            return Err(DataUriError::MissingMimeType);
        }
        if payload.is_empty() {
            return Err(DataUriError::EmptyPayload);
        }
        let valid = payload
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='));
        if !valid {
            return Err(DataUriError::InvalidPayload);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn mime_type(&self) -> &str {
        self.0
            .trim_start_matches("data:")
            .split([';', ','])
            .next()
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DataUri {
    type Error = DataUriError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<DataUri> for String {
    fn from(uri: DataUri) -> Self {
        uri.0
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // payloads can be megabytes
        write!(f, "data:{};base64,…", self.mime_type())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdviceError {
    #[error("advice service did not answer within {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("advice service failed: {reason}")]
    Failure { reason: String },
}

impl AdviceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdviceError::Timeout { .. } => ErrorKind::AdviceServiceTimeout,
            AdviceError::Failure { .. } => ErrorKind::AdviceServiceFailure,
        }
    }
}

impl From<HttpError> for AdviceError {
    fn from(e: HttpError) -> Self {
        AdviceError::Failure {
            reason: e.to_string(),
        }
    }
}

impl From<&AdviceError> for AppError {
    fn from(e: &AdviceError) -> Self {
        AppError::new(e.kind(), e.to_string())
    }
}

// ============================================================================
// In-flight tracking
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    ticket: RequestTicket,
    timer: TimerId,
}

/// At most one request in flight per tracker. The first of response and
/// timeout to arrive settles it.
#[derive(Debug, Default)]
pub struct AdviceTracker {
    pending: Option<Pending>,
    issued: u64,
}

impl AdviceTracker {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn ticket(&self) -> Option<RequestTicket> {
        self.pending.map(|p| p.ticket)
    }

    pub fn owns_timer(&self, id: TimerId) -> bool {
        self.pending.is_some_and(|p| p.timer == id)
    }

    /// `None` while a request is already in flight.
    pub fn begin(&mut self, ids: &mut TimerIds) -> Option<(RequestTicket, TimerId)> {
        if self.pending.is_some() {
            return None;
        }
        self.issued += 1;
        let pending = Pending {
            ticket: RequestTicket(self.issued),
            timer: ids.next(),
        };
        self.pending = Some(pending);
        Some((pending.ticket, pending.timer))
    }

    /// Settles the request if `ticket` is still live, returning the
    /// timeout timer to cancel. A late response yields `None`.
    pub fn resolve(&mut self, ticket: RequestTicket) -> Option<TimerId> {
        match self.pending {
            Some(p) if p.ticket == ticket => {
                self.pending = None;
                Some(p.timer)
            }
            _ => None,
        }
    }

    /// Settles the request if `timer` is its timeout.
    pub fn expire(&mut self, timer: TimerId) -> Option<RequestTicket> {
        match self.pending {
            Some(p) if p.timer == timer => {
                self.pending = None;
                Some(p.ticket)
            }
            _ => None,
        }
    }

    /// Abandons the in-flight request; any later response is stale.
    pub fn cancel(&mut self) -> Option<TimerId> {
        self.pending.take().map(|p| p.timer)
    }
}

// ============================================================================
// Demo content
// ============================================================================

pub fn demo_advice(question: &str) -> String {
    format!(
        "I couldn't reach the safety advisor, so here is general guidance for \"{question}\":\n\
         1. Stay in well-lit, busy places and avoid shortcuts through isolated areas.\n\
         2. Share your live location with a trusted contact before you set out.\n\
         3. Keep your phone charged and the emergency number 112 ready to dial.\n\
         4. Trust your instincts. If something feels wrong, head towards people, a shop or a police station.\n\
         5. Use the SOS button on the home screen if you are in danger."
    )
}

pub fn demo_hotspots(location: &str, time_of_day: &str) -> HotspotResponse {
    HotspotResponse {
        crime_heatmap_data: format!(
            "Live hotspot data for {location} is unavailable right now. Treat poorly lit side streets, \
             empty bus stops and parking areas around {time_of_day} as higher risk."
        ),
        safe_route_suggestions: format!(
            "Around {location}, prefer main roads with street lighting and open shops, stay near \
             crowded transit stops, and note the nearest police station before you leave."
        ),
    }
}

pub fn demo_distress() -> DistressResponse {
    DistressResponse {
        is_distress: false,
        prompt_user: false,
        auto_send_sos: false,
        reason: "Distress analysis is unavailable; no distress assumed.".to_string(),
    }
}
