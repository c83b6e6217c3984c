use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use card_advisor::advisor::{
    AdvisorService, AssistantClient, CardCatalog, FileCatalog, HttpAssistantClient,
    RecommendationRecord, RecommendationSink, RepositoryError, SessionId, SessionRecord,
    SessionRepository, SinkError, StaticCatalog,
};
use card_advisor::config::{AssistantConfig, CatalogConfig};
use card_advisor::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

pub(crate) type Advisor = AdvisorService<InMemorySessionRepository, LoggingRecommendationSink>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    records: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
}

impl SessionRepository for InMemorySessionRepository {
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
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
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

/// Keeps finished runs in memory and logs a summary of each one.
#[derive(Default, Clone)]
pub(crate) struct LoggingRecommendationSink {
    records: Arc<Mutex<Vec<RecommendationRecord>>>,
}

impl RecommendationSink for LoggingRecommendationSink {
    fn record(&self, record: RecommendationRecord) -> Result<(), SinkError> {
        info!(
            user = %record.user_id,
            session = record.session_id.as_ref().map(|id| id.0.as_str()),
            matches = record.recommendations.len(),
            recorded_at = %record.recorded_at,
            "recommendations recorded"
        );
        let mut guard = self
            .records
            .lock()
            .map_err(|_| SinkError::Unavailable("sink mutex poisoned".to_string()))?;
        guard.push(record);
        Ok(())
    }
}

impl LoggingRecommendationSink {
    pub(crate) fn records(&self) -> Vec<RecommendationRecord> {
        self.records.lock().expect("sink mutex poisoned").clone()
    }
}

/// Configured catalog file, or the bundled sample catalog when none is set.
pub(crate) fn build_catalog(config: &CatalogConfig) -> Result<Arc<dyn CardCatalog>, AppError> {
    match &config.path {
        Some(path) => {
            let catalog = FileCatalog::new(path.clone());
            let cards = catalog.active_cards()?;
            info!(path = %path.display(), cards = cards.len(), "using catalog file");
            Ok(Arc::new(catalog))
        }
        None => {
            let catalog = StaticCatalog::builtin()?;
            info!(cards = catalog.cards().len(), "using bundled sample catalog");
            Ok(Arc::new(catalog))
        }
    }
}

pub(crate) fn build_assistant(
    config: &AssistantConfig,
) -> Result<Option<Arc<dyn AssistantClient>>, AppError> {
    let Some(endpoint) = &config.endpoint else {
        return Ok(None);
    };

    let client = HttpAssistantClient::new(endpoint.clone(), config.api_key.clone(), config.timeout)?;
    info!(endpoint = client.endpoint(), "assisted conversations enabled");
    Ok(Some(Arc::new(client)))
}

pub(crate) fn build_advisor(
    catalog: Arc<dyn CardCatalog>,
    assistant: Option<Arc<dyn AssistantClient>>,
) -> (Advisor, LoggingRecommendationSink) {
    let sink = LoggingRecommendationSink::default();
    let service = AdvisorService::new(
        Arc::new(InMemorySessionRepository::default()),
        Arc::new(sink.clone()),
        catalog,
    );
    let service = match assistant {
        Some(assistant) => service.with_assistant(assistant),
        None => service,
    };
    (service, sink)
}
