use super::common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::advisor::assistant::{AssistantStep, Role, FALLBACK_MESSAGE};
use crate::advisor::collector::CollectorError;
use crate::advisor::domain::{CardId, SpendingCategory, UserProfile};
use crate::advisor::presentation::{ComparisonError, NO_MATCHES_MESSAGE};
use crate::advisor::repository::{RepositoryError, SessionRepository};
use crate::advisor::service::{
    AdvisorService, AdvisorServiceError, RecommendationRequest, StartSession,
};
use crate::advisor::session::{ConversationMode, SessionId, SessionStage, SessionView, Speaker};

async fn complete_scripted_session(
    service: &AdvisorService<MemoryRepository, MemorySink>,
    user_id: Option<&str>,
) -> SessionView {
    let started = service
        .start_session(StartSession {
            user_id: user_id.map(str::to_string),
            mode: ConversationMode::Scripted,
        })
        .expect("session starts");

    let mut view = started;
    for answer in SCRIPTED_ANSWERS {
        view = service
            .handle_message(&view.session_id, answer)
            .await
            .expect("answer accepted");
    }
    view
}

fn ids(view: &SessionView) -> Vec<String> {
    view.results
        .as_ref()
        .map(|results| {
            results
                .recommendations
                .iter()
                .map(|entry| entry.card.id.0.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn scripted_session_ranks_on_completion() {
    let (service, _, sink) = build_service();
    let view = complete_scripted_session(&service, Some("user-1")).await;

    assert_eq!(view.stage, SessionStage::Results);
    assert_eq!(view.step, "complete");
    assert_eq!(view.profile, answered_profile());
    assert_eq!(ids(&view), vec!["fuel-saver", "cashback-max", "dine-plus"]);

    let results = view.results.as_ref().expect("results present");
    assert!(results.recommendations[0].top_pick);
    assert_eq!(results.recommendations[0].score, 60);
    assert_eq!(results.recommendations[1].score, 59);

    // greeting, seven answers, seven bot replies and the match summary
    assert_eq!(view.messages.len(), 16);
    assert_eq!(view.messages[1].speaker, Speaker::User);
    let summary = view.messages.last().expect("summary message");
    assert_eq!(summary.speaker, Speaker::Bot);
    assert!(summary.content.starts_with("Perfect! I've found 3 excellent credit card matches"));
    assert!(!view.awaiting_reply);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "user-1");
    assert_eq!(records[0].session_id, Some(view.session_id.clone()));
    assert_eq!(records[0].recommendations.len(), 3);
}

#[tokio::test]
async fn anonymous_sessions_are_not_persisted() {
    let (service, _, sink) = build_service();
    complete_scripted_session(&service, None).await;
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn blank_messages_are_rejected_without_advancing() {
    let (service, repository, _) = build_service();
    let view = service
        .start_session(StartSession::default())
        .expect("session starts");

    match service.handle_message(&view.session_id, "   ").await {
        Err(AdvisorServiceError::Collector(CollectorError::EmptyInput)) => {}
        other => panic!("expected empty input error, got {other:?}"),
    }

    let stored = repository
        .fetch(&view.session_id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.transcript.len(), 1);
    assert_eq!(stored.view().step, "income");
}

#[tokio::test]
async fn busy_session_rejects_a_second_turn() {
    let (service, repository, _) = build_service();
    let view = service
        .start_session(StartSession::default())
        .expect("session starts");

    repository
        .set_awaiting_reply(&view.session_id, true)
        .expect("flag set");

    match service.handle_message(&view.session_id, "50000").await {
        Err(AdvisorServiceError::TurnInFlight) => {}
        other => panic!("expected busy session, got {other:?}"),
    }
    assert!(matches!(
        service.restart(&view.session_id),
        Err(AdvisorServiceError::TurnInFlight)
    ));

    let stored = repository
        .fetch(&view.session_id)
        .expect("fetch succeeds")
        .expect("record present");
    assert!(stored.awaiting_reply, "the in-flight turn still owns the flag");
    assert_eq!(stored.transcript.len(), 1);
}

#[tokio::test]
async fn turn_flag_is_released_after_a_failed_turn() {
    let (service, repository, _) = build_service();
    let view = complete_scripted_session(&service, None).await;

    match service.handle_message(&view.session_id, "one more").await {
        Err(AdvisorServiceError::Collector(CollectorError::AlreadyComplete)) => {}
        other => panic!("expected completed questionnaire, got {other:?}"),
    }

    let stored = repository
        .fetch(&view.session_id)
        .expect("fetch succeeds")
        .expect("record present");
    assert!(!stored.awaiting_reply);
}

#[tokio::test]
async fn unknown_sessions_are_not_found() {
    let (service, _, _) = build_service();
    let missing = SessionId("session-missing".to_string());

    assert!(matches!(
        service.handle_message(&missing, "hello").await,
        Err(AdvisorServiceError::Repository(RepositoryError::NotFound))
    ));
    assert!(matches!(
        service.session(&missing),
        Err(AdvisorServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[tokio::test]
async fn comparison_and_navigation_follow_the_results() {
    let (service, _, _) = build_service();
    let started = service
        .start_session(StartSession::default())
        .expect("session starts");
    assert!(matches!(
        service.compare(&started.session_id, &[]),
        Err(AdvisorServiceError::ResultsNotReady)
    ));

    let view = complete_scripted_session(&service, None).await;
    let id = view.session_id.clone();

    match service.compare(&id, &[CardId("fuel-saver".to_string())]) {
        Err(AdvisorServiceError::Comparison(ComparisonError::NotEnoughCards { selected: 1 })) => {}
        other => panic!("expected not enough cards, got {other:?}"),
    }

    let compared = service
        .compare(
            &id,
            &[
                CardId("dine-plus".to_string()),
                CardId("fuel-saver".to_string()),
                CardId("sky-miles".to_string()),
            ],
        )
        .expect("comparison builds");
    assert_eq!(compared.stage, SessionStage::Comparison);
    let comparison = compared.comparison.as_ref().expect("comparison present");
    let compared_ids: Vec<&str> = comparison
        .cards
        .iter()
        .map(|card| card.id.0.as_str())
        .collect();
    assert_eq!(compared_ids, vec!["fuel-saver", "dine-plus"]);

    let back = service.back_to_results(&id).expect("back to results");
    assert_eq!(back.stage, SessionStage::Results);
    assert!(back.comparison.is_none());
    assert_eq!(ids(&back), ids(&view));
}

#[tokio::test]
async fn restart_keeps_the_catalog_snapshot() {
    let repository = Arc::new(MemoryRepository::default());
    let sink = Arc::new(MemorySink::default());
    let catalog = Arc::new(CountingCatalog::default());
    let service = AdvisorService::new(repository.clone(), sink, catalog.clone());

    let view = service
        .start_session(StartSession::default())
        .expect("session starts");
    let before = repository
        .fetch(&view.session_id)
        .expect("fetch succeeds")
        .expect("record present");

    for answer in SCRIPTED_ANSWERS {
        service
            .handle_message(&view.session_id, answer)
            .await
            .expect("answer accepted");
    }

    let restarted = service.restart(&view.session_id).expect("restart succeeds");
    assert_eq!(restarted.stage, SessionStage::Chat);
    assert_eq!(restarted.step, "income");
    assert_eq!(restarted.messages.len(), 1);
    assert!(restarted.results.is_none());
    assert_eq!(restarted.profile, UserProfile::default());

    let after = repository
        .fetch(&view.session_id)
        .expect("fetch succeeds")
        .expect("record present");
    assert!(Arc::ptr_eq(&before.catalog, &after.catalog));
    assert_eq!(catalog.reads.load(Ordering::SeqCst), 1);

    // The engine carries nothing over from the first run.
    let mut again = restarted;
    for answer in SCRIPTED_ANSWERS {
        again = service
            .handle_message(&view.session_id, answer)
            .await
            .expect("answer accepted");
    }
    assert_eq!(ids(&again), vec!["fuel-saver", "cashback-max", "dine-plus"]);
}

#[test]
fn recommend_validates_profiles() {
    let (service, _, _) = build_service();
    let request = RecommendationRequest {
        user_id: None,
        profile: UserProfile::default().with_spending(SpendingCategory::Fuel, Some(-5.0)),
    };

    assert!(matches!(
        service.recommend(request),
        Err(AdvisorServiceError::Profile(_))
    ));
}

#[test]
fn sink_failures_do_not_change_results() {
    let repository = Arc::new(MemoryRepository::default());
    let failing = AdvisorService::new(repository.clone(), Arc::new(FailingSink), static_catalog());
    let (healthy, _, sink) = build_service();

    let request = RecommendationRequest {
        user_id: Some("user-7".to_string()),
        profile: answered_profile(),
    };

    let from_failing = failing.recommend(request.clone()).expect("results despite sink");
    let from_healthy = healthy.recommend(request).expect("results");
    assert_eq!(from_failing, from_healthy);
    assert_eq!(sink.records().len(), 1);
}

#[test]
fn no_eligible_cards_is_an_empty_result_not_an_error() {
    let (service, _, _) = build_service();
    let request = RecommendationRequest {
        user_id: None,
        profile: UserProfile::default().with_monthly_income(Some(10_000.0)),
    };

    let results = service.recommend(request).expect("empty results are valid");
    assert!(results.is_empty());
    assert!(results.empty_state.is_some());
}

#[tokio::test]
async fn scripted_session_without_matches_says_so() {
    let (service, _, _) = build_service();
    let view = service
        .start_session(StartSession::default())
        .expect("session starts");

    let mut view = service
        .handle_message(&view.session_id, "10000")
        .await
        .expect("income accepted");
    for answer in &SCRIPTED_ANSWERS[1..] {
        view = service
            .handle_message(&view.session_id, answer)
            .await
            .expect("answer accepted");
    }

    assert_eq!(view.stage, SessionStage::Results);
    assert!(ids(&view).is_empty());
    let summary = view.messages.last().expect("summary message");
    assert_eq!(summary.content, NO_MATCHES_MESSAGE);
}

#[test]
fn explain_reports_gated_cards() {
    let (service, _, _) = build_service();
    let evaluations = service.explain(&answered_profile()).expect("explains");

    assert_eq!(evaluations.len(), 4);
    let gated = evaluations
        .iter()
        .find(|evaluation| evaluation.card_id.0 == "sky-miles")
        .expect("sky-miles evaluated");
    assert_eq!(gated.score, 0);
    assert!(!gated.eligibility.is_eligible());
}

#[test]
fn catalog_outages_surface_as_catalog_errors() {
    let service = AdvisorService::new(
        Arc::new(MemoryRepository::default()),
        Arc::new(MemorySink::default()),
        Arc::new(UnavailableCatalog),
    );

    assert!(matches!(
        service.start_session(StartSession::default()),
        Err(AdvisorServiceError::Catalog(_))
    ));
    assert!(matches!(
        service.catalog(),
        Err(AdvisorServiceError::Catalog(_))
    ));
}

#[test]
fn assisted_sessions_need_an_assistant() {
    let (service, _, _) = build_service();
    assert!(!service.has_assistant());
    assert!(matches!(
        service.start_session(StartSession {
            user_id: None,
            mode: ConversationMode::Assisted,
        }),
        Err(AdvisorServiceError::AssistantUnavailable)
    ));
}

#[tokio::test]
async fn assistant_failure_uses_fallback_and_keeps_the_step() {
    let assistant = ScriptedAssistant::default().failure("timeout");
    let (service, repository) = build_assisted_service(assistant.clone());
    let view = service
        .start_session(StartSession {
            user_id: None,
            mode: ConversationMode::Assisted,
        })
        .expect("session starts");

    let view = service
        .handle_message(&view.session_id, "about 80,000 a month")
        .await
        .expect("fallback is not an error");

    assert_eq!(view.stage, SessionStage::Chat);
    assert_eq!(view.step, "income");
    let last = view.messages.last().expect("fallback message");
    assert_eq!(last.content, FALLBACK_MESSAGE);
    assert_eq!(view.profile.monthly_income, Some(80_000.0));

    let stored = repository
        .fetch(&view.session_id)
        .expect("fetch succeeds")
        .expect("record present");
    assert!(!stored.awaiting_reply);
    assert_eq!(assistant.requests().len(), 1);
}

#[tokio::test]
async fn assisted_session_completes_on_analysis() {
    let assistant = ScriptedAssistant::default()
        .reply("Tell me about your spending.", Some(AssistantStep::Spending))
        .reply("Which benefits matter most?", Some(AssistantStep::Benefits))
        .reply("And your credit score?", Some(AssistantStep::CreditScore))
        .reply("Perfect! I'm analyzing your profile...", Some(AssistantStep::Analysis));
    let (service, _) = build_assisted_service(assistant.clone());

    let mut view = service
        .start_session(StartSession {
            user_id: None,
            mode: ConversationMode::Assisted,
        })
        .expect("session starts");

    for message in [
        "50000",
        "fuel 4000, groceries 3500 and dining 2500",
        "Cashback on all purchases",
        "Good (700-749)",
    ] {
        view = service
            .handle_message(&view.session_id, message)
            .await
            .expect("turn succeeds");
    }

    assert_eq!(view.stage, SessionStage::Results);
    assert_eq!(view.step, "analysis");
    assert_eq!(view.profile.spending_habits.get(SpendingCategory::Travel), None);
    assert_eq!(ids(&view), vec!["fuel-saver", "cashback-max", "dine-plus"]);
    let summary = view.messages.last().expect("summary message");
    assert!(summary.content.contains("found 3 excellent credit card matches"));

    let requests = assistant.requests();
    assert_eq!(requests.len(), 4);
    assert!(requests[0].conversation_history.is_empty());
    assert_eq!(requests[3].conversation_history.len(), 6);
    assert_eq!(requests[3].conversation_history[0].role, Role::User);
}
