//! SOS confirmation and distress escalation.
//!
//! Alerts are never delivered anywhere. Raising SOS only produces the
//! confirmation toast.

use serde::{Deserialize, Serialize};

use crate::advice::{demo_distress, AdviceError, AdviceTracker, DistressResponse, RequestTicket};
use crate::capabilities::{TimerId, TimerIds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SosTrigger {
    /// The user confirmed the SOS dialog.
    Confirmed,
    /// The distress service asked for an automatic alert.
    Automatic,
    /// The user answered "not safe" or ignored the prompt.
    PromptEscalation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyCommand {
    StartTimer { id: TimerId, millis: u64 },
    CancelTimer { id: TimerId },
    RaiseSos(SosTrigger),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SafetyPrompt {
    reason: String,
    timer: TimerId,
}

#[derive(Debug, Default)]
pub struct SafetyMonitor {
    sos_confirm_open: bool,
    prompt: Option<SafetyPrompt>,
    distress: AdviceTracker,
    last_assessment: Option<DistressResponse>,
    activations: u32,
}

impl SafetyMonitor {
    pub fn sos_confirm_open(&self) -> bool {
        self.sos_confirm_open
    }

    pub fn prompt_reason(&self) -> Option<&str> {
        self.prompt.as_ref().map(|p| p.reason.as_str())
    }

    pub fn distress_pending(&self) -> bool {
        self.distress.is_pending()
    }

    pub fn distress_ticket(&self) -> Option<RequestTicket> {
        self.distress.ticket()
    }

    pub fn last_assessment(&self) -> Option<&DistressResponse> {
        self.last_assessment.as_ref()
    }

    pub fn activations(&self) -> u32 {
        self.activations
    }

    pub fn request_sos(&mut self) -> bool {
        !std::mem::replace(&mut self.sos_confirm_open, true)
    }

    pub fn confirm_sos(&mut self) -> Vec<SafetyCommand> {
        if !std::mem::take(&mut self.sos_confirm_open) {
            return Vec::new();
        }
        self.raise(SosTrigger::Confirmed)
    }

    /// Also used when the home screen is left with the dialog up.
    pub fn cancel_sos(&mut self) -> bool {
        std::mem::take(&mut self.sos_confirm_open)
    }

    pub fn begin_distress_check(&mut self, ids: &mut TimerIds) -> Option<(RequestTicket, TimerId)> {
        self.distress.begin(ids)
    }

    pub fn on_assessment(
        &mut self,
        ticket: RequestTicket,
        result: Result<DistressResponse, AdviceError>,
        ids: &mut TimerIds,
        prompt_timeout_ms: u64,
    ) -> Vec<SafetyCommand> {
        let Some(timer) = self.distress.resolve(ticket) else {
            tracing::debug!(ticket = ticket.0, "late distress assessment discarded");
            return Vec::new();
        };
        let mut commands = vec![SafetyCommand::CancelTimer { id: timer }];
        let assessment = result.unwrap_or_else(|error| {
            tracing::warn!(%error, "distress service failed, assuming no distress");
            demo_distress()
        });
        commands.extend(self.apply(assessment, ids, prompt_timeout_ms));
        commands
    }

    fn apply(
        &mut self,
        assessment: DistressResponse,
        ids: &mut TimerIds,
        prompt_timeout_ms: u64,
    ) -> Vec<SafetyCommand> {
        tracing::info!(
            is_distress = assessment.is_distress,
            prompt_user = assessment.prompt_user,
            auto_send_sos = assessment.auto_send_sos,
            "distress assessment"
        );
        let mut commands = Vec::new();
        if assessment.auto_send_sos {
            commands.extend(self.dismiss_prompt());
            commands.extend(self.raise(SosTrigger::Automatic));
        } else if assessment.prompt_user && self.prompt.is_none() {
            let timer = ids.next();
            self.prompt = Some(SafetyPrompt {
                reason: assessment.reason.clone(),
                timer,
            });
            commands.push(SafetyCommand::StartTimer {
                id: timer,
                millis: prompt_timeout_ms,
            });
        }
        self.last_assessment = Some(assessment);
        commands
    }

    pub fn confirm_safe(&mut self) -> Vec<SafetyCommand> {
        self.dismiss_prompt()
    }

    pub fn decline_safe(&mut self) -> Vec<SafetyCommand> {
        if self.prompt.is_none() {
            return Vec::new();
        }
        let mut commands = self.dismiss_prompt();
        commands.extend(self.raise(SosTrigger::PromptEscalation));
        commands
    }

    fn dismiss_prompt(&mut self) -> Vec<SafetyCommand> {
        self.prompt
            .take()
            .map(|p| SafetyCommand::CancelTimer { id: p.timer })
            .into_iter()
            .collect()
    }

    /// Handles the distress timeout and the prompt expiry. `None` when the
    /// timer belongs to someone else.
    pub fn on_timer(&mut self, id: TimerId) -> Option<Vec<SafetyCommand>> {
        if let Some(ticket) = self.distress.expire(id) {
            tracing::warn!(ticket = ticket.0, "distress check timed out, assuming no distress");
            self.last_assessment = Some(demo_distress());
            return Some(Vec::new());
        }
        if self.prompt.as_ref().is_some_and(|p| p.timer == id) {
            self.prompt = None;
            tracing::warn!("safety prompt unanswered, escalating");
            return Some(self.raise(SosTrigger::PromptEscalation));
        }
        None
    }

    fn raise(&mut self, trigger: SosTrigger) -> Vec<SafetyCommand> {
        self.activations = self.activations.saturating_add(1);
        tracing::warn!(?trigger, activations = self.activations, "SOS raised");
        vec![SafetyCommand::RaiseSos(trigger)]
    }
}
