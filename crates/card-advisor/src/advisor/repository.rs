use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::UserProfile;
use super::scoring::ScoredCard;
use super::session::{SessionId, SessionRecord};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError>;
    fn update(&self, record: SessionRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
    /// Sets the busy flag atomically and returns its previous value.
    fn set_awaiting_reply(&self, id: &SessionId, awaiting: bool) -> Result<bool, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for finished recommendation runs (analytics, user history).
pub trait RecommendationSink: Send + Sync {
    fn record(&self, record: RecommendationRecord) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    pub profile: UserProfile,
    pub recommendations: Vec<ScoredCard>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("recommendation sink unavailable: {0}")]
    Unavailable(String),
}
