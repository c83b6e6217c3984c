//! Credit card advisor: profile questionnaire, catalog, scoring and session flow.

pub mod assistant;
pub mod catalog;
pub mod collector;
pub mod domain;
pub mod presentation;
pub mod repository;
pub mod router;
pub(crate) mod scoring;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use assistant::{
    AssistantClient, AssistantError, AssistantStep, HistoryEntry, HttpAssistantClient, Role,
    TurnReply, TurnRequest, FALLBACK_MESSAGE,
};
pub use catalog::{CardCatalog, CatalogError, FileCatalog, StaticCatalog};
pub use collector::{
    CollectorError, CollectorEvent, CollectorStep, ProfileCollector, Prompt, BENEFIT_OPTIONS,
    CREDIT_SCORE_OPTIONS,
};
pub use domain::{
    Card, CardCategory, CardId, CreditScoreBand, ProfileError, SpendingCategory, SpendingHabits,
    UserProfile,
};
pub use presentation::{
    format_rupees, ComparedCard, ComparisonError, ComparisonRow, ComparisonView,
    RecommendationEntry, RecommendationResults,
};
pub use repository::{
    RecommendationRecord, RecommendationSink, RepositoryError, SessionRepository, SinkError,
};
pub use router::advisor_router;
pub use scoring::{
    Award, CardEvaluation, Eligibility, ScoreComponent, ScoredCard, ScoringEngine,
    RECOMMENDATION_LIMIT,
};
pub use service::{AdvisorService, AdvisorServiceError, RecommendationRequest, StartSession};
pub use session::{
    ChatMessage, Conversation, ConversationMode, SessionId, SessionRecord, SessionStage,
    SessionView, Speaker,
};
