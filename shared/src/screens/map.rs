use thiserror::Error;

use super::Settled;
use crate::advice::{
    demo_hotspots, AdviceError, AdviceTracker, HotspotRequest, HotspotResponse, RequestTicket,
};
use crate::capabilities::{TimerId, TimerIds};
use crate::{AppError, ErrorKind};

pub const DEFAULT_MAP_LOCATION: &str = "Bandra, Mumbai";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("Please enter a location to generate a map.")]
    LocationRequired,
}

impl From<&MapError> for AppError {
    fn from(e: &MapError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string()).with_context("field", "location")
    }
}

#[derive(Debug)]
pub struct MapState {
    location: String,
    insights: Option<HotspotResponse>,
    tracker: AdviceTracker,
    in_flight: Option<HotspotRequest>,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            location: DEFAULT_MAP_LOCATION.to_string(),
            insights: None,
            tracker: AdviceTracker::default(),
            in_flight: None,
        }
    }
}

impl MapState {
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn insights(&self) -> Option<&HotspotResponse> {
        self.insights.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.tracker.is_pending()
    }

    pub fn pending_ticket(&self) -> Option<RequestTicket> {
        self.tracker.ticket()
    }

    pub fn set_location(&mut self, location: String) {
        self.location = location;
    }

    /// `Ok(None)` while a request is already in flight. Previous insights
    /// are cleared when a new request goes out.
    pub fn request(
        &mut self,
        time_of_day: &str,
        ids: &mut TimerIds,
    ) -> Result<Option<(RequestTicket, TimerId, HotspotRequest)>, MapError> {
        let location = self.location.trim();
        if location.is_empty() {
            return Err(MapError::LocationRequired);
        }
        let request = HotspotRequest {
            location: location.to_string(),
            time_of_day: time_of_day.to_string(),
        };
        let Some((ticket, timer)) = self.tracker.begin(ids) else {
            return Ok(None);
        };
        self.insights = None;
        self.in_flight = Some(request.clone());
        Ok(Some((ticket, timer, request)))
    }

    pub fn on_response(
        &mut self,
        ticket: RequestTicket,
        result: Result<HotspotResponse, AdviceError>,
    ) -> Option<Settled> {
        let Some(timer) = self.tracker.resolve(ticket) else {
            tracing::debug!(ticket = ticket.0, "late hotspot response discarded");
            return None;
        };
        let failure = match result {
            Ok(insights) => {
                self.in_flight = None;
                self.insights = Some(insights);
                None
            }
            Err(error) => {
                self.fall_back(&error);
                Some(error)
            }
        };
        Some(Settled {
            cancel_timer: Some(timer),
            failure,
        })
    }

    pub fn on_timer(&mut self, id: TimerId, after_ms: u64) -> Option<Settled> {
        self.tracker.expire(id)?;
        let error = AdviceError::Timeout { after_ms };
        self.fall_back(&error);
        Some(Settled {
            cancel_timer: None,
            failure: Some(error),
        })
    }

    fn fall_back(&mut self, error: &AdviceError) {
        tracing::warn!(%error, "hotspot data unavailable, showing demo insights");
        if let Some(request) = self.in_flight.take() {
            self.insights = Some(demo_hotspots(&request.location, &request.time_of_day));
        }
    }

    pub fn leave(&mut self) -> Option<TimerId> {
        let timer = self.tracker.cancel();
        *self = Self::default();
        timer
    }
}
