//! HTTP assistant client behavior against a stubbed upstream.

use std::time::Duration;

use card_advisor::advisor::{
    AssistantClient, AssistantError, AssistantStep, HistoryEntry, HttpAssistantClient, Role,
    TurnRequest,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(message: &str) -> TurnRequest {
    TurnRequest {
        message: message.to_string(),
        conversation_history: vec![HistoryEntry {
            role: Role::Assistant,
            content: "What's your approximate monthly income in rupees?".to_string(),
        }],
    }
}

fn client(server: &MockServer, api_key: Option<&str>, timeout: Duration) -> HttpAssistantClient {
    HttpAssistantClient::new(
        format!("{}/chat", server.uri()),
        api_key.map(str::to_string),
        timeout,
    )
    .expect("client builds")
}

#[tokio::test]
async fn structured_reply_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("authorization", "Bearer secret-key"))
        .and(body_partial_json(json!({
            "message": "about 60000",
            "conversationHistory": [{ "role": "assistant" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Great. How much do you spend on fuel each month?",
            "nextStep": "spending",
            "options": ["Under ₹2,000", "₹2,000 - ₹5,000"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, Some("secret-key"), Duration::from_secs(2))
        .respond(&request("about 60000"))
        .await
        .expect("assistant replies");

    assert_eq!(reply.next_step, Some(AssistantStep::Spending));
    assert_eq!(reply.options.map(|options| options.len()), Some(2));
}

#[tokio::test]
async fn plain_text_reply_points_back_to_income() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("Could you tell me your monthly income?"),
        )
        .mount(&server)
        .await;

    let reply = client(&server, None, Duration::from_secs(2))
        .respond(&request("hello"))
        .await
        .expect("assistant replies");

    assert_eq!(reply.message, "Could you tell me your monthly income?");
    assert_eq!(reply.next_step, Some(AssistantStep::Income));
    assert!(reply.options.is_none());
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client(&server, None, Duration::from_secs(2))
        .respond(&request("50000"))
        .await
        .expect_err("status surfaces as an error");

    match err {
        AssistantError::Status { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  "))
        .mount(&server)
        .await;

    let err = client(&server, None, Duration::from_secs(2))
        .respond(&request("50000"))
        .await
        .expect_err("empty replies are errors");
    assert!(matches!(err, AssistantError::EmptyReply));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "late", "nextStep": "spending" }))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let err = client(&server, None, Duration::from_millis(100))
        .respond(&request("50000"))
        .await
        .expect_err("request times out");
    assert!(matches!(err, AssistantError::Transport(_)));
}

#[tokio::test]
async fn blank_api_key_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(|request: &wiremock::Request| !request.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Which benefits matter most to you?",
            "nextStep": "benefits"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, Some("   "), Duration::from_secs(2))
        .respond(&request("groceries 4000"))
        .await
        .expect("assistant replies");
    assert_eq!(reply.next_step, Some(AssistantStep::Benefits));
}
