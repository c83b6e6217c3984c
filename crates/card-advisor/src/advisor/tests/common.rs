use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::advisor::assistant::{
    AssistantClient, AssistantError, AssistantStep, TurnReply, TurnRequest,
};
use crate::advisor::catalog::{CardCatalog, CatalogError, StaticCatalog};
use crate::advisor::domain::{Card, CardCategory, CardId, CreditScoreBand, SpendingCategory, UserProfile};
use crate::advisor::repository::{
    RecommendationRecord, RecommendationSink, RepositoryError, SessionRepository, SinkError,
};
use crate::advisor::service::AdvisorService;
use crate::advisor::session::{SessionId, SessionRecord};

pub(super) const SCRIPTED_ANSWERS: [&str; 7] = [
    "₹50,000",
    "4000",
    "2000",
    "3500",
    "2500",
    "Cashback on all purchases",
    "Good (700-749)",
];

pub(super) fn card(
    id: &str,
    min_income: f64,
    annual_fee: f64,
    reward_type: &str,
    perks: &[&str],
    category: CardCategory,
) -> Card {
    Card {
        id: CardId(id.to_string()),
        name: format!("{id} card"),
        issuer: "Test Bank".to_string(),
        min_income,
        annual_fee,
        joining_fee: annual_fee,
        reward_type: reward_type.to_string(),
        reward_rate: "varies".to_string(),
        special_perks: perks.iter().map(|perk| perk.to_string()).collect(),
        eligibility: vec!["Age 21-60".to_string(), "Salaried".to_string()],
        category,
        apply_link: format!("https://example.com/{id}"),
    }
}

pub(super) fn catalog_cards() -> Vec<Card> {
    vec![
        card(
            "fuel-saver",
            25_000.0,
            500.0,
            "Fuel",
            &["Fuel surcharge waiver", "Dining discounts"],
            CardCategory::Lifestyle,
        ),
        card(
            "cashback-max",
            20_000.0,
            0.0,
            "Cashback",
            &["Shopping cashback"],
            CardCategory::EntryLevel,
        ),
        card(
            "sky-miles",
            150_000.0,
            10_000.0,
            "Travel",
            &["Airport lounge access"],
            CardCategory::Premium,
        ),
        card(
            "dine-plus",
            30_000.0,
            1_500.0,
            "Reward points",
            &["Dining privileges", "Airport lounge access"],
            CardCategory::Lifestyle,
        ),
    ]
}

/// Profile the scripted answers produce.
pub(super) fn answered_profile() -> UserProfile {
    UserProfile::default()
        .with_monthly_income(Some(50_000.0))
        .with_spending(SpendingCategory::Fuel, Some(4_000.0))
        .with_spending(SpendingCategory::Travel, Some(2_000.0))
        .with_spending(SpendingCategory::Groceries, Some(3_500.0))
        .with_spending(SpendingCategory::Dining, Some(2_500.0))
        .with_preferred_benefits(vec!["Cashback on all purchases".to_string()])
        .with_credit_score(Some(CreditScoreBand::Good))
}

pub(super) fn static_catalog() -> Arc<dyn CardCatalog> {
    Arc::new(StaticCatalog::new(catalog_cards()))
}

pub(super) fn build_service() -> (
    AdvisorService<MemoryRepository, MemorySink>,
    Arc<MemoryRepository>,
    Arc<MemorySink>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let sink = Arc::new(MemorySink::default());
    let service = AdvisorService::new(repository.clone(), sink.clone(), static_catalog());
    (service, repository, sink)
}

pub(super) fn build_assisted_service(
    assistant: ScriptedAssistant,
) -> (AdvisorService<MemoryRepository, MemorySink>, Arc<MemoryRepository>) {
    let (service, repository, _) = build_service();
    (service.with_assistant(Arc::new(assistant)), repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn set_awaiting_reply(&self, id: &SessionId, awaiting: bool) -> Result<bool, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        Ok(std::mem::replace(&mut record.awaiting_reply, awaiting))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySink {
    records: Arc<Mutex<Vec<RecommendationRecord>>>,
}

impl MemorySink {
    pub(super) fn records(&self) -> Vec<RecommendationRecord> {
        self.records.lock().expect("sink mutex poisoned").clone()
    }
}

impl RecommendationSink for MemorySink {
    fn record(&self, record: RecommendationRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .expect("sink mutex poisoned")
            .push(record);
        Ok(())
    }
}

pub(super) struct FailingSink;

impl RecommendationSink for FailingSink {
    fn record(&self, _record: RecommendationRecord) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("warehouse offline".to_string()))
    }
}

pub(super) struct UnavailableCatalog;

impl CardCatalog for UnavailableCatalog {
    fn active_cards(&self) -> Result<Vec<Card>, CatalogError> {
        Err(CatalogError::Unavailable("catalog store offline".to_string()))
    }
}

/// Counts catalog reads so tests can assert the once-per-session snapshot.
#[derive(Default)]
pub(super) struct CountingCatalog {
    pub(super) reads: AtomicUsize,
}

impl CardCatalog for CountingCatalog {
    fn active_cards(&self) -> Result<Vec<Card>, CatalogError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(catalog_cards())
    }
}

/// Assistant double replaying queued replies; an exhausted queue behaves like an outage.
#[derive(Default, Clone)]
pub(super) struct ScriptedAssistant {
    replies: Arc<Mutex<VecDeque<Result<TurnReply, String>>>>,
    requests: Arc<Mutex<Vec<TurnRequest>>>,
}

impl ScriptedAssistant {
    pub(super) fn reply(self, message: &str, next_step: Option<AssistantStep>) -> Self {
        self.replies
            .lock()
            .expect("assistant mutex poisoned")
            .push_back(Ok(TurnReply {
                message: message.to_string(),
                next_step,
                options: None,
            }));
        self
    }

    pub(super) fn failure(self, reason: &str) -> Self {
        self.replies
            .lock()
            .expect("assistant mutex poisoned")
            .push_back(Err(reason.to_string()));
        self
    }

    pub(super) fn requests(&self) -> Vec<TurnRequest> {
        self.requests.lock().expect("assistant mutex poisoned").clone()
    }
}

#[async_trait]
impl AssistantClient for ScriptedAssistant {
    async fn respond(&self, request: &TurnRequest) -> Result<TurnReply, AssistantError> {
        self.requests
            .lock()
            .expect("assistant mutex poisoned")
            .push(request.clone());
        let next = self
            .replies
            .lock()
            .expect("assistant mutex poisoned")
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(AssistantError::Transport(reason)),
            None => Err(AssistantError::Transport("no scripted reply".to_string())),
        }
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
