use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::assistant::{
    apply_assistant_input, AssistantClient, AssistantStep, HistoryEntry, Role, TurnRequest,
    FALLBACK_MESSAGE,
};
use super::catalog::{CardCatalog, CatalogError};
use super::collector::{CollectorError, CollectorEvent, CollectorStep};
use super::domain::{Card, CardId, ProfileError, UserProfile};
use super::presentation::{ComparisonError, ComparisonView, RecommendationResults};
use super::repository::{
    RecommendationRecord, RecommendationSink, RepositoryError, SessionRepository,
};
use super::scoring::{CardEvaluation, ScoredCard, ScoringEngine};
use super::session::{
    next_session_id, ChatMessage, Conversation, ConversationMode, SessionId, SessionRecord,
    SessionStage, SessionView,
};

/// One-shot recommendation request for a profile gathered elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSession {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub mode: ConversationMode,
}

/// Service composing the catalog, scoring engine, questionnaire and session storage.
pub struct AdvisorService<R, S> {
    sessions: Arc<R>,
    sink: Arc<S>,
    catalog: Arc<dyn CardCatalog>,
    assistant: Option<Arc<dyn AssistantClient>>,
    engine: ScoringEngine,
}

impl<R, S> AdvisorService<R, S>
where
    R: SessionRepository + 'static,
    S: RecommendationSink + 'static,
{
    pub fn new(sessions: Arc<R>, sink: Arc<S>, catalog: Arc<dyn CardCatalog>) -> Self {
        Self {
            sessions,
            sink,
            catalog,
            assistant: None,
            engine: ScoringEngine::new(),
        }
    }

    pub fn with_assistant(mut self, assistant: Arc<dyn AssistantClient>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn has_assistant(&self) -> bool {
        self.assistant.is_some()
    }

    /// Active catalog cards.
    pub fn catalog(&self) -> Result<Vec<Card>, AdvisorServiceError> {
        Ok(self.catalog.active_cards()?)
    }

    /// Ranks the catalog for a complete profile and builds the results view.
    pub fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationResults, AdvisorServiceError> {
        request.profile.validate()?;
        let cards = self.catalog.active_cards()?;
        let ranked = self.engine.rank(&cards, &request.profile);
        info!(
            catalog = cards.len(),
            matches = ranked.len(),
            "ranked recommendations"
        );

        if let Some(user_id) = request.user_id {
            self.persist(user_id, None, &request.profile, &ranked);
        }

        Ok(RecommendationResults::build(ranked, &request.profile))
    }

    /// Per-card score breakdown, including cards the income gate rejected.
    pub fn explain(&self, profile: &UserProfile) -> Result<Vec<CardEvaluation>, AdvisorServiceError> {
        profile.validate()?;
        let cards = self.catalog.active_cards()?;
        Ok(cards
            .iter()
            .map(|card| self.engine.evaluate(card, profile))
            .collect())
    }

    /// Opens a session with a catalog snapshot and the opening question.
    pub fn start_session(&self, request: StartSession) -> Result<SessionView, AdvisorServiceError> {
        if request.mode == ConversationMode::Assisted && self.assistant.is_none() {
            return Err(AdvisorServiceError::AssistantUnavailable);
        }

        let cards = self.catalog.active_cards()?;
        let record = SessionRecord::new(next_session_id(), request.user_id, request.mode, cards);
        let stored = self.sessions.insert(record)?;
        info!(
            session = %stored.id,
            mode = ?stored.mode,
            catalog = stored.catalog.len(),
            "session started"
        );
        Ok(stored.view())
    }

    pub fn session(&self, id: &SessionId) -> Result<SessionView, AdvisorServiceError> {
        Ok(self.fetch(id)?.view())
    }

    /// Processes one user turn. Only one turn per session may be in flight.
    pub async fn handle_message(
        &self,
        id: &SessionId,
        text: &str,
    ) -> Result<SessionView, AdvisorServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CollectorError::EmptyInput.into());
        }

        let _turn = TurnClaim::acquire(self.sessions.as_ref(), id)?;
        let mut record = self.fetch(id)?;
        if record.stage != SessionStage::Chat {
            return Err(CollectorError::AlreadyComplete.into());
        }

        record.transcript.push(ChatMessage::user(text));

        let finished = match record.conversation.clone() {
            Conversation::Scripted(collector) => {
                let (next, event) = collector.submit(text)?;
                record.conversation = Conversation::Scripted(next);
                match event {
                    CollectorEvent::Prompt(prompt) => {
                        record
                            .transcript
                            .push(ChatMessage::bot(prompt.message, prompt.options));
                        None
                    }
                    CollectorEvent::Completed(profile) => {
                        record
                            .transcript
                            .push(ChatMessage::bot(CollectorStep::Complete.prompt(), Vec::new()));
                        Some(profile)
                    }
                }
            }
            Conversation::Assisted {
                step,
                profile,
                history,
            } => self.assisted_turn(&mut record, step, profile, history, text).await?,
        };

        if let Some(profile) = finished {
            let ranked = self.engine.rank(&record.catalog, &profile);
            info!(
                session = %record.id,
                matches = ranked.len(),
                "questionnaire complete"
            );
            if let Some(user_id) = record.user_id.clone() {
                self.persist(user_id, Some(record.id.clone()), &profile, &ranked);
            }
            let results = RecommendationResults::build(ranked, &profile);
            record
                .transcript
                .push(ChatMessage::bot(results.completion_message(), Vec::new()));
            record.results = Some(results);
            record.stage = SessionStage::Results;
        }

        record.awaiting_reply = false;
        self.sessions.update(record.clone())?;
        Ok(record.view())
    }

    async fn assisted_turn(
        &self,
        record: &mut SessionRecord,
        step: AssistantStep,
        profile: UserProfile,
        mut history: Vec<HistoryEntry>,
        text: &str,
    ) -> Result<Option<UserProfile>, AdvisorServiceError> {
        let assistant = self
            .assistant
            .as_ref()
            .ok_or(AdvisorServiceError::AssistantUnavailable)?;

        let profile = apply_assistant_input(&profile, step, text);
        let request = TurnRequest {
            message: text.to_string(),
            conversation_history: history.clone(),
        };

        match assistant.respond(&request).await {
            Ok(reply) => {
                history.push(HistoryEntry {
                    role: Role::User,
                    content: text.to_string(),
                });
                history.push(HistoryEntry {
                    role: Role::Assistant,
                    content: reply.message.clone(),
                });
                record.transcript.push(ChatMessage::bot(
                    reply.message,
                    reply.options.unwrap_or_default(),
                ));

                let next = reply.next_step.unwrap_or(step);
                debug!(session = %record.id, step = next.label(), "assistant advanced");
                let finished = next.finishes().then(|| profile.clone());
                record.conversation = Conversation::Assisted {
                    step: next,
                    profile,
                    history,
                };
                Ok(finished)
            }
            Err(err) => {
                warn!(session = %record.id, error = %err, "assistant turn failed; using fallback reply");
                record
                    .transcript
                    .push(ChatMessage::bot(FALLBACK_MESSAGE, Vec::new()));
                record.conversation = Conversation::Assisted {
                    step,
                    profile,
                    history,
                };
                Ok(None)
            }
        }
    }

    /// Builds the comparison view for a subset of the session's recommendations.
    pub fn compare(
        &self,
        id: &SessionId,
        card_ids: &[CardId],
    ) -> Result<SessionView, AdvisorServiceError> {
        let mut record = self.fetch_idle(id)?;
        let results = record
            .results
            .as_ref()
            .ok_or(AdvisorServiceError::ResultsNotReady)?;

        let comparison = ComparisonView::build(results, card_ids)?;
        record.comparison = Some(comparison);
        record.stage = SessionStage::Comparison;
        self.sessions.update(record.clone())?;
        Ok(record.view())
    }

    pub fn back_to_results(&self, id: &SessionId) -> Result<SessionView, AdvisorServiceError> {
        let mut record = self.fetch_idle(id)?;
        if record.results.is_none() {
            return Err(AdvisorServiceError::ResultsNotReady);
        }

        record.comparison = None;
        record.stage = SessionStage::Results;
        self.sessions.update(record.clone())?;
        Ok(record.view())
    }

    /// Clears profile, transcript and results; keeps the session's catalog snapshot.
    pub fn restart(&self, id: &SessionId) -> Result<SessionView, AdvisorServiceError> {
        let record = self.fetch_idle(id)?.restarted();
        self.sessions.update(record.clone())?;
        info!(session = %record.id, stage = record.stage.label(), "session restarted");
        Ok(record.view())
    }

    fn fetch(&self, id: &SessionId) -> Result<SessionRecord, AdvisorServiceError> {
        let record = self
            .sessions
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    fn fetch_idle(&self, id: &SessionId) -> Result<SessionRecord, AdvisorServiceError> {
        let record = self.fetch(id)?;
        if record.awaiting_reply {
            return Err(AdvisorServiceError::TurnInFlight);
        }
        Ok(record)
    }

    /// Fire-and-forget: a failing sink is logged and never changes the ranking.
    fn persist(
        &self,
        user_id: String,
        session_id: Option<SessionId>,
        profile: &UserProfile,
        ranked: &[ScoredCard],
    ) {
        let record = RecommendationRecord {
            user_id,
            session_id,
            profile: profile.clone(),
            recommendations: ranked.to_vec(),
            recorded_at: Utc::now(),
        };

        if let Err(err) = self.sink.record(record) {
            warn!(error = %err, "failed to record recommendations");
        }
    }
}

/// Holds a session's busy flag for the duration of one turn.
struct TurnClaim<'a, R: SessionRepository> {
    sessions: &'a R,
    id: SessionId,
}

impl<'a, R: SessionRepository> TurnClaim<'a, R> {
    fn acquire(sessions: &'a R, id: &SessionId) -> Result<Self, AdvisorServiceError> {
        if sessions.set_awaiting_reply(id, true)? {
            return Err(AdvisorServiceError::TurnInFlight);
        }
        Ok(Self {
            sessions,
            id: id.clone(),
        })
    }
}

impl<R: SessionRepository> Drop for TurnClaim<'_, R> {
    fn drop(&mut self) {
        if let Err(err) = self.sessions.set_awaiting_reply(&self.id, false) {
            warn!(session = %self.id, error = %err, "failed to release session turn");
        }
    }
}

/// Error raised by the advisor service.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorServiceError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Collector(#[from] CollectorError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Comparison(#[from] ComparisonError),
    #[error("a reply is still being prepared for this session")]
    TurnInFlight,
    #[error("assisted conversations are not configured")]
    AssistantUnavailable,
    #[error("recommendations are not ready yet")]
    ResultsNotReady,
}
