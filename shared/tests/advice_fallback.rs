mod common;

use common::FakeShell;
use crux_http::protocol::HttpResponse;
use serde_json::json;
use shared::advice::{AdviceError, DistressResponse, HotspotResponse, SafetyAdviceResponse};
use shared::event::{ChatText, LocationText};
use shared::screens::{Sender, QUICK_PROMPTS};
use shared::view::{AssistantView, MapView, ScreenView};
use shared::{Event, Screen};

const MOVEMENT: &str = "data:application/json;base64,eyJ4IjoxfQ==";

fn assistant(shell: &FakeShell) -> AssistantView {
    match shell.view().screen {
        ScreenView::Assistant(view) => view,
        other => panic!("expected assistant screen, got {other:?}"),
    }
}

fn map(shell: &FakeShell) -> MapView {
    match shell.view().screen {
        ScreenView::Map(view) => view,
        other => panic!("expected map screen, got {other:?}"),
    }
}

fn ask(shell: &mut FakeShell, prompt: &str) {
    shell.dispatch(Event::AssistantPromptSubmitted {
        text: Some(ChatText::new(prompt).unwrap()),
        time_of_day: "21:30".to_string(),
    });
}

fn assessment(prompt_user: bool, auto_send_sos: bool) -> DistressResponse {
    DistressResponse {
        is_distress: prompt_user || auto_send_sos,
        prompt_user,
        auto_send_sos,
        reason: "Sudden stop after running".to_string(),
    }
}

fn check_distress(shell: &mut FakeShell) {
    shell.dispatch(Event::DistressCheckRequested {
        movement_data: MOVEMENT.to_string(),
        audio_data: None,
    });
}

#[test]
fn test_timeout_answers_with_demo_and_drops_late_reply() {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::Navigate {
        screen: Screen::Assistant,
    });
    ask(&mut shell, QUICK_PROMPTS[0]);
    assert_eq!(shell.http_requests, 1);
    assert!(assistant(&shell).loading);
    let ticket = shell.model.assistant.pending_ticket().unwrap();

    shell.advance(5_999);
    assert!(assistant(&shell).loading);
    shell.advance(1);

    let view = assistant(&shell);
    assert!(!view.loading);
    let last = view.messages.last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert!(last.text.contains(QUICK_PROMPTS[0]));
    let toast = shell.view().toast.expect("error toast");
    assert_eq!(toast.title, "Error fetching advice");
    assert_eq!(
        shell.view().error.map(|e| e.error_code).as_deref(),
        Some("ADVICE_SERVICE_TIMEOUT")
    );

    shell.dispatch(Event::AdviceReceived {
        ticket,
        result: Box::new(Ok(SafetyAdviceResponse {
            advice: "too late".to_string(),
        })),
    });
    let view = assistant(&shell);
    assert_eq!(view.messages.len(), 3);
    assert!(view.messages.iter().all(|m| m.text != "too late"));
}

#[test]
fn test_answer_in_time_cancels_timeout() {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::Navigate {
        screen: Screen::Assistant,
    });
    shell.dispatch(Event::AssistantInputChanged {
        text: ChatText::new("Is the late train safe?").unwrap(),
    });
    shell.dispatch(Event::AssistantPromptSubmitted {
        text: None,
        time_of_day: "23:10".to_string(),
    });
    assert_eq!(shell.timer_count(), 1);
    assert_eq!(assistant(&shell).input, "");

    let ticket = shell.model.assistant.pending_ticket().unwrap();
    shell.dispatch(Event::AdviceReceived {
        ticket,
        result: Box::new(Ok(SafetyAdviceResponse {
            advice: "Sit in the ladies compartment near the guard.".to_string(),
        })),
    });
    assert_eq!(shell.timer_count(), 0);
    assert!(shell.view().toast.is_none());

    let view = assistant(&shell);
    let texts: Vec<_> = view.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(
        texts[1..],
        [
            "Is the late train safe?",
            "Sit in the ladies compartment near the guard."
        ]
    );
}

#[test]
fn test_service_failure_answers_with_demo() {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::Navigate {
        screen: Screen::Assistant,
    });
    ask(&mut shell, "taxi at night");
    let ticket = shell.model.assistant.pending_ticket().unwrap();
    shell.dispatch(Event::AdviceReceived {
        ticket,
        result: Box::new(Err(AdviceError::Failure {
            reason: "HTTP 500".to_string(),
        })),
    });

    assert_eq!(shell.timer_count(), 0);
    assert!(assistant(&shell)
        .messages
        .last()
        .is_some_and(|m| m.text.contains("taxi at night")));
    assert_eq!(
        shell.view().error.map(|e| e.error_code).as_deref(),
        Some("ADVICE_SERVICE_FAILURE")
    );
}

/// Checks the outgoing advice request as the shell would see it on the wire.
fn assert_advice_request(shell: &FakeShell, question: &str) {
    let request = shell.next_http_request().expect("advice request");
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "http://localhost:9002/api/safety-advice");
    assert!(request
        .headers
        .iter()
        .any(|h| h.name.eq_ignore_ascii_case("content-type")
            && h.value.starts_with("application/json")));
    assert_eq!(
        shell.next_http_body(),
        json!({
            "location": "Mumbai, India",
            "timeOfDay": "21:30",
            "recentCrimeData": format!("User asked: \"{question}\""),
        })
    );
}

fn assistant_with_question(question: &str) -> FakeShell {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::Navigate {
        screen: Screen::Assistant,
    });
    ask(&mut shell, question);
    assert_eq!(shell.pending_http(), 1);
    assert_advice_request(&shell, question);
    shell
}

#[test]
fn test_advice_reply_over_http_is_shown() {
    let mut shell = assistant_with_question("Is Bandra safe?");
    shell.resolve_http(
        HttpResponse::ok()
            .json(json!({ "advice": "Stick to the lit promenade after dark." }))
            .build(),
    );

    assert_eq!(shell.timer_count(), 0);
    assert!(shell.view().error.is_none());
    let view = assistant(&shell);
    assert!(!view.loading);
    let last = view.messages.last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert_eq!(last.text, "Stick to the lit promenade after dark.");
}

#[test]
fn test_advice_server_error_answers_with_demo() {
    let mut shell = assistant_with_question("Is Bandra safe?");
    shell.resolve_http(HttpResponse::status(500).build());

    assert_eq!(shell.timer_count(), 0);
    let view = assistant(&shell);
    assert!(!view.loading);
    assert!(view
        .messages
        .last()
        .is_some_and(|m| m.sender == Sender::Assistant && m.text.contains("Is Bandra safe?")));
    assert_eq!(
        shell.view().error.map(|e| e.error_code).as_deref(),
        Some("ADVICE_SERVICE_FAILURE")
    );
}

#[test]
fn test_malformed_advice_body_answers_with_demo() {
    let mut shell = assistant_with_question("Walking home from the station");
    shell.resolve_http(HttpResponse::ok().body("<html>gateway</html>").build());

    assert_eq!(shell.timer_count(), 0);
    let view = assistant(&shell);
    assert!(view
        .messages
        .last()
        .is_some_and(|m| m.text.contains("Walking home from the station")));
    assert_eq!(
        shell.view().error.map(|e| e.error_code).as_deref(),
        Some("ADVICE_SERVICE_FAILURE")
    );
    assert_eq!(
        shell.view().toast.map(|t| t.title).as_deref(),
        Some("Error fetching advice")
    );
}

#[test]
fn test_prompts_only_go_out_from_the_assistant_screen() {
    let mut shell = FakeShell::default();
    ask(&mut shell, "hello");
    assert_eq!(shell.http_requests, 0);
    assert!(shell.model.assistant.pending_ticket().is_none());
}

#[test]
fn test_leaving_assistant_abandons_request() {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::Navigate {
        screen: Screen::Assistant,
    });
    ask(&mut shell, "hello");
    let ticket = shell.model.assistant.pending_ticket().unwrap();

    shell.dispatch(Event::Back);
    assert_eq!(shell.timer_count(), 0);

    shell.dispatch(Event::AdviceReceived {
        ticket,
        result: Box::new(Ok(SafetyAdviceResponse {
            advice: "late".to_string(),
        })),
    });
    shell.dispatch(Event::Navigate {
        screen: Screen::Assistant,
    });
    assert_eq!(assistant(&shell).messages.len(), 1);
}

#[test]
fn test_map_requires_location() {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::Navigate { screen: Screen::Map });
    assert_eq!(map(&shell).location, "Bandra, Mumbai");

    shell.dispatch(Event::MapLocationChanged {
        location: LocationText::new("   ").unwrap(),
    });
    shell.dispatch(Event::HotspotsRequested {
        time_of_day: "20:00".to_string(),
    });

    assert_eq!(shell.http_requests, 0);
    let toast = shell.view().toast.expect("validation toast");
    assert_eq!(toast.description, "Please enter a location to generate a map.");
    assert_eq!(
        shell.view().error.map(|e| e.error_code).as_deref(),
        Some("VALIDATION_ERROR")
    );
}

#[test]
fn test_map_shows_insights() {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::Navigate { screen: Screen::Map });
    shell.dispatch(Event::HotspotsRequested {
        time_of_day: "20:00".to_string(),
    });

    let view = map(&shell);
    assert!(view.loading);
    assert_eq!(view.button.label, "Generating...");
    assert!(!view.button.enabled);

    let ticket = shell.model.map.pending_ticket().unwrap();
    shell.dispatch(Event::HotspotsReceived {
        ticket,
        result: Box::new(Ok(HotspotResponse {
            crime_heatmap_data: "Low activity near the station".to_string(),
            safe_route_suggestions: "Use Hill Road".to_string(),
        })),
    });

    let view = map(&shell);
    assert_eq!(view.button.label, "Get Safety Map");
    assert_eq!(
        view.insights.map(|i| i.safe_route_suggestions).as_deref(),
        Some("Use Hill Road")
    );
    assert_eq!(shell.timer_count(), 0);
}

#[test]
fn test_map_timeout_shows_demo_insights() {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::Navigate { screen: Screen::Map });
    shell.dispatch(Event::MapLocationChanged {
        location: LocationText::new("Connaught Place, Delhi").unwrap(),
    });
    shell.dispatch(Event::HotspotsRequested {
        time_of_day: "22:00".to_string(),
    });
    shell.advance(6_000);

    let insights = map(&shell).insights.expect("demo insights");
    assert!(insights.safe_route_suggestions.contains("Connaught Place, Delhi"));
    assert_eq!(
        shell.view().toast.map(|t| t.title).as_deref(),
        Some("Error generating map")
    );
}

#[test]
fn test_distress_auto_sends_sos() {
    let mut shell = FakeShell::default();
    check_distress(&mut shell);
    assert_eq!(shell.http_requests, 1);

    let ticket = shell.model.safety.distress_ticket().unwrap();
    shell.dispatch(Event::DistressAssessed {
        ticket,
        result: Box::new(Ok(assessment(true, true))),
    });

    assert!(shell.view().safety_prompt.is_none());
    assert_eq!(
        shell.view().toast.map(|t| t.title).as_deref(),
        Some("SOS Activated!")
    );
    assert_eq!(shell.timer_count(), 0);
}

#[test]
fn test_unanswered_safety_prompt_escalates() {
    let mut shell = FakeShell::default();
    check_distress(&mut shell);
    let ticket = shell.model.safety.distress_ticket().unwrap();
    shell.dispatch(Event::DistressAssessed {
        ticket,
        result: Box::new(Ok(assessment(true, false))),
    });

    let prompt = shell.view().safety_prompt.expect("safety prompt");
    assert_eq!(prompt.title, "Are you safe?");
    assert_eq!(prompt.reason, "Sudden stop after running");
    assert!(shell.view().toast.is_none());

    shell.advance(30_000);
    assert!(shell.view().safety_prompt.is_none());
    assert_eq!(shell.model.safety.activations(), 1);
}

#[test]
fn test_answering_safety_prompt() {
    let mut shell = FakeShell::default();
    for (answer, activations) in [
        (Event::SafetyPromptConfirmed, 0),
        (Event::SafetyPromptDeclined, 1),
    ] {
        check_distress(&mut shell);
        let ticket = shell.model.safety.distress_ticket().unwrap();
        shell.dispatch(Event::DistressAssessed {
            ticket,
            result: Box::new(Ok(assessment(true, false))),
        });
        shell.dispatch(answer);
        assert!(shell.view().safety_prompt.is_none());
        assert_eq!(shell.timer_count(), 0);
        assert_eq!(shell.model.safety.activations(), activations);
    }
}

#[test]
fn test_distress_timeout_assumes_no_distress() {
    let mut shell = FakeShell::default();
    check_distress(&mut shell);
    let ticket = shell.model.safety.distress_ticket().unwrap();
    shell.advance(6_000);
    assert_eq!(
        shell.model.safety.last_assessment().map(|a| a.is_distress),
        Some(false)
    );

    shell.dispatch(Event::DistressAssessed {
        ticket,
        result: Box::new(Ok(assessment(false, true))),
    });
    assert_eq!(shell.model.safety.activations(), 0);
}

#[test]
fn test_malformed_sample_is_rejected() {
    let mut shell = FakeShell::default();
    shell.dispatch(Event::DistressCheckRequested {
        movement_data: "not a data uri".to_string(),
        audio_data: None,
    });
    assert_eq!(shell.http_requests, 0);
    assert!(!shell.model.safety.distress_pending());
    assert_eq!(
        shell.view().error.map(|e| e.error_code).as_deref(),
        Some("VALIDATION_ERROR")
    );
}
