//! Simulated incoming call used as a social escape hatch.

use serde::{Deserialize, Serialize};

use crate::capabilities::{TimerId, TimerIds};
use crate::config::CallConfig;

pub const CALL_TICK_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    Ringing,
    Active,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub name: String,
    pub subtext: String,
    pub avatar_url: Option<String>,
}

impl Caller {
    /// First character of the name, upper-cased, for the avatar fallback.
    pub fn initial(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}

impl From<&CallConfig> for Caller {
    fn from(config: &CallConfig) -> Self {
        Self {
            name: config.caller_name.clone(),
            subtext: config.caller_subtext.clone(),
            avatar_url: config.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallCommand {
    StartTicker { id: TimerId, millis: u64 },
    CancelTicker { id: TimerId },
    /// The owner must dismiss the overlay and drop the session.
    TearDownOverlay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSession {
    status: CallStatus,
    elapsed_seconds: u32,
    caller: Caller,
    ticker: Option<TimerId>,
}

impl CallSession {
    pub fn start(caller: Caller, auto_answer: bool, ids: &mut TimerIds) -> (Self, Vec<CallCommand>) {
        let mut session = Self {
            status: CallStatus::Ringing,
            elapsed_seconds: 0,
            caller,
            ticker: None,
        };
        let commands = if auto_answer {
            session.accept(ids)
        } else {
            Vec::new()
        };
        (session, commands)
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn ticker(&self) -> Option<TimerId> {
        self.ticker
    }

    pub fn accept(&mut self, ids: &mut TimerIds) -> Vec<CallCommand> {
        if self.status != CallStatus::Ringing {
            return Vec::new();
        }
        let id = ids.next();
        self.status = CallStatus::Active;
        self.elapsed_seconds = 0;
        self.ticker = Some(id);
        tracing::debug!(timer = id.0, "call answered");
        vec![CallCommand::StartTicker {
            id,
            millis: CALL_TICK_MS,
        }]
    }

    /// Counts one second if `id` is the live ticker, and re-arms it.
    pub fn tick(&mut self, id: TimerId) -> Vec<CallCommand> {
        if self.status != CallStatus::Active || self.ticker != Some(id) {
            tracing::trace!(timer = id.0, "ignoring stale call tick");
            return Vec::new();
        }
        self.elapsed_seconds = self.elapsed_seconds.saturating_add(1);
        vec![CallCommand::StartTicker {
            id,
            millis: CALL_TICK_MS,
        }]
    }

    /// Decline while ringing or end while active.
    pub fn hang_up(&mut self) -> Vec<CallCommand> {
        if self.status == CallStatus::Ended {
            return Vec::new();
        }
        self.status = CallStatus::Ended;
        let mut commands = Vec::with_capacity(2);
        if let Some(id) = self.ticker.take() {
            commands.push(CallCommand::CancelTicker { id });
        }
        commands.push(CallCommand::TearDownOverlay);
        tracing::debug!(elapsed = self.elapsed_seconds, "call ended");
        commands
    }

    /// Subtext while ringing, `mm:ss` otherwise.
    pub fn status_line(&self) -> String {
        match self.status {
            CallStatus::Ringing => self.caller.subtext.clone(),
            CallStatus::Active | CallStatus::Ended => format_elapsed(self.elapsed_seconds),
        }
    }

    pub fn hang_up_label(&self) -> &'static str {
        match self.status {
            CallStatus::Ringing => "Decline",
            CallStatus::Active | CallStatus::Ended => "End Call",
        }
    }
}

pub fn format_elapsed(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn caller() -> Caller {
        Caller::from(&CallConfig::default())
    }

    fn answered() -> (CallSession, TimerId, TimerIds) {
        let mut ids = TimerIds::default();
        let (mut session, commands) = CallSession::start(caller(), false, &mut ids);
        assert!(commands.is_empty());
        let commands = session.accept(&mut ids);
        let id = match commands.as_slice() {
            [CallCommand::StartTicker { id, millis: 1_000 }] => *id,
            other => panic!("unexpected commands {other:?}"),
        };
        (session, id, ids)
    }

    #[test]
    fn test_starts_ringing_with_subtext() {
        let mut ids = TimerIds::default();
        let (session, _) = CallSession::start(caller(), false, &mut ids);
        assert_eq!(session.status(), CallStatus::Ringing);
        assert_eq!(session.status_line(), "Samsung Galaxy S25+ 5G");
        assert_eq!(session.hang_up_label(), "Decline");
        assert_eq!(session.caller().initial(), "M");
    }

    #[test]
    fn test_auto_answer_starts_active() {
        let mut ids = TimerIds::default();
        let (session, commands) = CallSession::start(caller(), true, &mut ids);
        assert_eq!(session.status(), CallStatus::Active);
        assert_eq!(commands.len(), 1);
        assert_eq!(session.status_line(), "00:00");
        assert_eq!(session.hang_up_label(), "End Call");
    }

    #[test]
    fn test_decline_while_ringing_tears_down_without_cancel() {
        let mut ids = TimerIds::default();
        let (mut session, _) = CallSession::start(caller(), false, &mut ids);
        assert_eq!(session.hang_up(), vec![CallCommand::TearDownOverlay]);
        assert_eq!(session.status(), CallStatus::Ended);
        assert!(session.hang_up().is_empty());
    }

    #[test]
    fn test_hang_up_cancels_ticker_and_ignores_late_ticks() {
        let (mut session, id, _) = answered();
        session.tick(id);
        assert_eq!(
            session.hang_up(),
            vec![CallCommand::CancelTicker { id }, CallCommand::TearDownOverlay]
        );
        assert!(session.tick(id).is_empty());
        assert_eq!(session.elapsed_seconds(), 1);
    }

    #[test]
    fn test_foreign_timer_ignored() {
        let (mut session, id, _) = answered();
        assert!(session.tick(TimerId(id.0 + 100)).is_empty());
        assert_eq!(session.elapsed_seconds(), 0);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(59), "00:59");
        assert_eq!(format_elapsed(61), "01:01");
        assert_eq!(format_elapsed(3_600), "60:00");
    }

    proptest! {
        #[test]
        fn prop_elapsed_counts_ticks_while_active(n in 0u32..500, late in 0u32..20) {
            let (mut session, id, _) = answered();
            for _ in 0..n {
                session.tick(id);
            }
            prop_assert_eq!(session.elapsed_seconds(), n);

            session.hang_up();
            for _ in 0..late {
                prop_assert!(session.tick(id).is_empty());
            }
            prop_assert_eq!(session.elapsed_seconds(), n);
        }
    }
}
