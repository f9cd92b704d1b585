//! End-to-end dispatch tests against a `wiremock` backend.
//!
//! Each test mounts the endpoints of one backend variant and drives the
//! widget through `ChatWidget::send`, checking the request bodies the server
//! saw and the messages that landed in the conversation.

use std::time::Duration;

use assistant_core::client::{AskClient, BackendClient, ChatClient};
use assistant_core::dispatch::DETAIL_SUFFIX;
use assistant_core::{ChatRole, ChatWidget, Phase, SelectionHub, Source};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn ask_client(server: &MockServer) -> BackendClient {
    BackendClient::Ask(AskClient::new(&server.uri(), TIMEOUT).expect("client"))
}

fn chat_client(server: &MockServer) -> BackendClient {
    BackendClient::Chat(ChatClient::new(&server.uri(), TIMEOUT).expect("client"))
}

// ---------------------------------------------------------------------------
// Variant A: /api/ask and /api/ask-selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_manual_send_posts_suffixed_question_to_ask() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .and(body_json(json!({
            "question": format!("What is Physical AI?{}", DETAIL_SUFFIX)
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "**Physical AI** is embodied intelligence.",
            "sources": ["intro.md", {"file_path": "docs/physical-ai.md"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ask_client(&server);
    let mut widget = ChatWidget::new(5);
    widget.draft_mut().push_str("What is Physical AI?");

    assert!(widget.send(&client, None, false, TIMEOUT).await);

    let messages = widget.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[0].content, "What is Physical AI?");
    assert_eq!(messages[1].role, ChatRole::Assistant);
    assert_eq!(messages[1].content, "**Physical AI** is embodied intelligence.");
    assert_eq!(messages[1].sources[0], Source::Label("intro.md".to_string()));
    assert_eq!(messages[1].sources[1].display_label(1), "docs/physical-ai.md");
    assert_eq!(widget.phase(), Phase::DisplayedSuccess);
}

#[tokio::test]
async fn test_selection_auto_send_routes_to_ask_selection() {
    let server = MockServer::start().await;
    let selection = "Gazebo simulates rigid body dynamics";
    Mock::given(method("POST"))
        .and(path("/api/ask-selection"))
        .and(body_json(json!({
            "question": format!("Explain this section in detail: \"{}\"", selection),
            "selection": selection
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "It integrates the equations of motion."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ask_client(&server);
    let hub = SelectionHub::new();
    let mut widget = ChatWidget::mount(&hub, 5);

    hub.pointer_released(&format!("  {}\n", selection));
    let request = widget.poll_selection().expect("auto send");
    assert!(widget.shell().is_open());

    let outcome = client.ask(&request).await;
    assert!(widget.complete(request.ticket, outcome));

    let messages = widget.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].content.contains(selection));
    assert_eq!(messages[1].content, "It integrates the equations of motion.");
    assert!(widget.dispatcher().selection().is_none());
}

#[tokio::test]
async fn test_message_field_is_last_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "fallback"})))
        .mount(&server)
        .await;

    let client = ask_client(&server);
    let mut widget = ChatWidget::new(5);
    widget.draft_mut().push_str("hi");
    widget.send(&client, None, false, TIMEOUT).await;

    assert_eq!(widget.conversation().messages()[1].content, "fallback");
}

#[tokio::test]
async fn test_backend_detail_becomes_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "bad request"})))
        .mount(&server)
        .await;

    let client = ask_client(&server);
    let mut widget = ChatWidget::new(5);
    widget.draft_mut().push_str("anything");
    widget.send(&client, None, false, TIMEOUT).await;

    let messages = widget.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, ChatRole::Assistant);
    assert_eq!(messages[1].content, "Error: bad request");
    assert_eq!(widget.phase(), Phase::DisplayedError);
    assert!(!widget.is_loading());
}

#[tokio::test]
async fn test_error_field_and_generic_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "index offline"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ask-selection"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = ask_client(&server);
    let mut widget = ChatWidget::new(5);
    widget.draft_mut().push_str("first");
    widget.send(&client, None, false, TIMEOUT).await;

    widget.on_selection("a selected paragraph");
    widget.discard_selection();
    widget.on_selection("a selected paragraph");
    widget.send(&client, None, false, TIMEOUT).await;

    let messages = widget.conversation().messages();
    assert_eq!(messages[1].content, "Error: index offline");
    assert_eq!(messages[3].content, "Error: request failed with status 503");
}

#[tokio::test]
async fn test_alternating_turns_over_many_sends() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "ok"})))
        .expect(4)
        .mount(&server)
        .await;

    let client = ask_client(&server);
    let mut widget = ChatWidget::new(5);
    for n in 0..4 {
        widget.draft_mut().push_str(&format!("question {}", n));
        widget.send(&client, None, false, TIMEOUT).await;
    }

    let messages = widget.conversation().messages();
    assert_eq!(messages.len(), 8);
    for (i, message) in messages.iter().enumerate() {
        let expected = if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant };
        assert_eq!(message.role, expected);
    }
    assert_eq!(messages[4].content, "question 2");
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"answer": "too late"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = ask_client(&server);
    let mut widget = ChatWidget::new(5);
    widget.draft_mut().push_str("slow");
    widget.send(&client, None, false, Duration::from_secs(1)).await;

    let messages = widget.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Error: request timed out after 1s");
    assert!(!widget.is_loading());
}

#[tokio::test]
async fn test_unreachable_backend_reports_transport_error() {
    let client = BackendClient::Ask(AskClient::new("http://127.0.0.1:9", TIMEOUT).expect("client"));
    let mut widget = ChatWidget::new(5);
    widget.draft_mut().push_str("hello?");
    widget.send(&client, None, false, TIMEOUT).await;

    let messages = widget.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].content.starts_with("Error: "));
    assert!(widget.dispatcher().selection().is_none());
}

#[tokio::test]
async fn test_empty_send_issues_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let client = ask_client(&server);
    let mut widget = ChatWidget::new(5);
    widget.draft_mut().push_str("   ");

    assert!(!widget.send(&client, None, false, TIMEOUT).await);
    assert!(widget.conversation().is_empty());
}

// ---------------------------------------------------------------------------
// Variant B: /api/chat with session continuity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_chat_variant_threads_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "messages": [
                {"role": "user", "content": format!("What is ROS2?{}", DETAIL_SUFFIX)}
            ],
            "context_text": null,
            "session_id": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "A robotics middleware.",
            "sources": [],
            "session_id": "session-42"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "messages": [
                {"role": "user", "content": "What is ROS2?"},
                {"role": "assistant", "content": "A robotics middleware."},
                {"role": "user", "content": format!("And nodes?{}", DETAIL_SUFFIX)}
            ],
            "context_text": null,
            "session_id": "session-42"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Processes that communicate.",
            "session_id": "session-42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = chat_client(&server);
    let mut widget = ChatWidget::new(0);
    widget.draft_mut().push_str("What is ROS2?");
    widget.send(&client, None, false, TIMEOUT).await;
    assert_eq!(widget.conversation().session_id(), Some("session-42"));

    widget.draft_mut().push_str("And nodes?");
    widget.send(&client, None, false, TIMEOUT).await;

    assert_eq!(widget.conversation().len(), 4);
    assert_eq!(widget.conversation().messages()[3].content, "Processes that communicate.");
}

#[tokio::test]
async fn test_clear_starts_a_fresh_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "hello",
            "session_id": "s-1"
        })))
        .mount(&server)
        .await;

    let client = chat_client(&server);
    let mut widget = ChatWidget::new(0);
    widget.draft_mut().push_str("hi");
    widget.send(&client, None, false, TIMEOUT).await;
    assert_eq!(widget.conversation().session_id(), Some("s-1"));

    widget.clear_chat();
    assert!(widget.conversation().is_empty());
    assert_eq!(widget.conversation().session_id(), None);

    widget.draft_mut().push_str("again");
    let request = widget.begin_send().expect("send");
    assert_eq!(request.session_id, None);
    assert_eq!(request.history.len(), 1);
}

#[tokio::test]
async fn test_chat_variant_sends_selection_as_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({
            "messages": [
                {"role": "user", "content": "Explain this section in detail: \"PID\""}
            ],
            "context_text": "PID",
            "session_id": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Proportional, integral, derivative.",
            "session_id": "s-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = chat_client(&server);
    let hub = SelectionHub::new();
    let mut widget = ChatWidget::mount(&hub, 0);

    hub.pointer_released("PID");
    let request = widget.poll_selection().expect("auto send");
    let outcome = client.ask(&request).await;
    widget.complete(request.ticket, outcome);

    assert_eq!(widget.conversation().len(), 2);
    assert_eq!(widget.conversation().session_id(), Some("s-2"));
}

#[tokio::test]
async fn test_health_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;

    let body = ask_client(&server).health().await.expect("healthy");
    assert_eq!(body["status"], "healthy");
}
