use serde::{Deserialize, Serialize};

use super::Settled;
use crate::advice::{demo_advice, AdviceError, AdviceTracker, RequestTicket, SafetyAdviceResponse};
use crate::capabilities::{TimerId, TimerIds};

pub const GREETING: &str = "Hello! I'm your AI Safety Assistant. How can I help you stay safe today? \
You can ask me anything or select one of the prompts below.";

pub const QUICK_PROMPTS: [&str; 4] = [
    "Tips for walking alone at night",
    "What to do if I feel unsafe?",
    "How to be safe in a taxi?",
    "Create a safety plan for my evening walk",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    #[serde(rename = "ai")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
}

#[derive(Debug)]
pub struct AssistantState {
    messages: Vec<ChatMessage>,
    input: String,
    tracker: AdviceTracker,
    question: Option<String>,
    next_id: u64,
}

impl Default for AssistantState {
    fn default() -> Self {
        let mut state = Self {
            messages: Vec::new(),
            input: String::new(),
            tracker: AdviceTracker::default(),
            question: None,
            next_id: 1,
        };
        state.push(Sender::Assistant, GREETING.to_string());
        state
    }
}

impl AssistantState {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_loading(&self) -> bool {
        self.tracker.is_pending()
    }

    pub fn pending_ticket(&self) -> Option<RequestTicket> {
        self.tracker.ticket()
    }

    pub fn set_input(&mut self, text: String) {
        self.input = text;
    }

    fn push(&mut self, sender: Sender, text: String) {
        self.messages.push(ChatMessage {
            id: self.next_id,
            text,
            sender,
        });
        self.next_id += 1;
    }

    /// Sends `prompt`, or the input box when `prompt` is empty. Returns the
    /// question to ask, or `None` when there is nothing to send or a request
    /// is already in flight.
    pub fn submit(
        &mut self,
        prompt: Option<&str>,
        ids: &mut TimerIds,
    ) -> Option<(RequestTicket, TimerId, String)> {
        let text = match prompt {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => self.input.clone(),
        };
        if text.trim().is_empty() || self.tracker.is_pending() {
            return None;
        }
        let (ticket, timer) = self.tracker.begin(ids)?;
        self.push(Sender::User, text.clone());
        self.input.clear();
        self.question = Some(text.clone());
        Some((ticket, timer, text))
    }

    pub fn on_response(
        &mut self,
        ticket: RequestTicket,
        result: Result<SafetyAdviceResponse, AdviceError>,
    ) -> Option<Settled> {
        let Some(timer) = self.tracker.resolve(ticket) else {
            tracing::debug!(ticket = ticket.0, "late advice response discarded");
            return None;
        };
        let failure = match result {
            Ok(response) => {
                self.question = None;
                self.push(Sender::Assistant, response.advice);
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
        tracing::warn!(%error, "advice unavailable, answering with demo advice");
        let question = self.question.take().unwrap_or_default();
        self.push(Sender::Assistant, demo_advice(&question));
    }

    /// Resets the chat. Returns the timeout timer of an abandoned request.
    pub fn leave(&mut self) -> Option<TimerId> {
        let timer = self.tracker.cancel();
        *self = Self::default();
        timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(advice: &str) -> Result<SafetyAdviceResponse, AdviceError> {
        Ok(SafetyAdviceResponse {
            advice: advice.to_string(),
        })
    }

    #[test]
    fn test_starts_with_greeting() {
        let state = AssistantState::default();
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].sender, Sender::Assistant);
        assert_eq!(state.messages()[0].text, GREETING);
    }

    #[test]
    fn test_blank_input_is_not_sent() {
        let mut ids = TimerIds::default();
        let mut state = AssistantState::default();
        state.set_input("   ".to_string());
        assert!(state.submit(None, &mut ids).is_none());
        assert!(state.submit(Some(""), &mut ids).is_none());
        assert_eq!(state.messages().len(), 1);
    }

    #[test]
    fn test_quick_prompt_wins_over_input() {
        let mut ids = TimerIds::default();
        let mut state = AssistantState::default();
        state.set_input("typed".to_string());
        let (_, _, question) = state.submit(Some(QUICK_PROMPTS[1]), &mut ids).unwrap();
        assert_eq!(question, QUICK_PROMPTS[1]);
        assert_eq!(state.input(), "");
        assert!(state.is_loading());
    }

    #[test]
    fn test_no_concurrent_requests() {
        let mut ids = TimerIds::default();
        let mut state = AssistantState::default();
        state.submit(Some("first"), &mut ids).unwrap();
        assert!(state.submit(Some("second"), &mut ids).is_none());
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn test_success_appends_advice_and_cancels_timeout() {
        let mut ids = TimerIds::default();
        let mut state = AssistantState::default();
        let (ticket, timer, _) = state.submit(Some("Is Bandra safe?"), &mut ids).unwrap();
        let settled = state.on_response(ticket, ok("Stay on lit roads.")).unwrap();
        assert_eq!(settled.cancel_timer, Some(timer));
        assert!(settled.failure.is_none());
        assert_eq!(state.messages().last().unwrap().text, "Stay on lit roads.");
        assert!(!state.is_loading());
    }

    #[test]
    fn test_timeout_answers_with_demo_and_discards_late_reply() {
        let mut ids = TimerIds::default();
        let mut state = AssistantState::default();
        let (ticket, timer, _) = state.submit(Some("Is Bandra safe?"), &mut ids).unwrap();
        let settled = state.on_timer(timer, 6_000).unwrap();
        assert_eq!(settled.failure, Some(AdviceError::Timeout { after_ms: 6_000 }));
        let last = state.messages().last().unwrap();
        assert_eq!(last.sender, Sender::Assistant);
        assert!(last.text.contains("Is Bandra safe?"));

        assert!(state.on_response(ticket, ok("too late")).is_none());
        assert_eq!(state.messages().len(), 3);
    }

    #[test]
    fn test_failure_answers_with_demo() {
        let mut ids = TimerIds::default();
        let mut state = AssistantState::default();
        let (ticket, _, _) = state.submit(Some("taxi at night"), &mut ids).unwrap();
        let settled = state
            .on_response(
                ticket,
                Err(AdviceError::Failure {
                    reason: "HTTP 502".to_string(),
                }),
            )
            .unwrap();
        assert!(settled.failure.is_some());
        assert!(state.messages().last().unwrap().text.contains("taxi at night"));
    }

    #[test]
    fn test_leave_resets_and_abandons_request() {
        let mut ids = TimerIds::default();
        let mut state = AssistantState::default();
        let (ticket, timer, _) = state.submit(Some("hello"), &mut ids).unwrap();
        assert_eq!(state.leave(), Some(timer));
        assert_eq!(state.messages().len(), 1);
        assert!(state.on_response(ticket, ok("late")).is_none());
    }
}
