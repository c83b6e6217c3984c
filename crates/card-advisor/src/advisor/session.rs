use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assistant::{AssistantStep, HistoryEntry, ASSISTED_GREETING};
use super::collector::ProfileCollector;
use super::domain::{Card, UserProfile};
use super::presentation::{ComparisonView, RecommendationResults};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

/// Who drives the questions: the built-in script or an external assistant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    #[default]
    Scripted,
    Assisted,
}

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    Chat,
    Results,
    Comparison,
}

impl SessionStage {
    pub const fn label(self) -> &'static str {
        match self {
            SessionStage::Chat => "chat",
            SessionStage::Results => "results",
            SessionStage::Comparison => "comparison",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Bot,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn bot(content: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            content: content.into(),
            options,
            sent_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            content: content.into(),
            options: Vec::new(),
            sent_at: Utc::now(),
        }
    }
}

/// Conversation state for either mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversation {
    Scripted(ProfileCollector),
    Assisted {
        step: AssistantStep,
        profile: UserProfile,
        history: Vec<HistoryEntry>,
    },
}

impl Conversation {
    pub fn start(mode: ConversationMode) -> Self {
        match mode {
            ConversationMode::Scripted => Conversation::Scripted(ProfileCollector::new()),
            ConversationMode::Assisted => Conversation::Assisted {
                step: AssistantStep::Income,
                profile: UserProfile::default(),
                history: Vec::new(),
            },
        }
    }

    pub fn profile(&self) -> &UserProfile {
        match self {
            Conversation::Scripted(collector) => collector.profile(),
            Conversation::Assisted { profile, .. } => profile,
        }
    }

    pub fn step_label(&self) -> &'static str {
        match self {
            Conversation::Scripted(collector) => collector.step().label(),
            Conversation::Assisted { step, .. } => step.label(),
        }
    }

    fn greeting(&self) -> ChatMessage {
        match self {
            Conversation::Scripted(collector) => {
                let prompt = collector.current_prompt();
                ChatMessage::bot(prompt.message, prompt.options)
            }
            Conversation::Assisted { .. } => ChatMessage::bot(ASSISTED_GREETING, Vec::new()),
        }
    }
}

/// Repository record for one user's advisor session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: Option<String>,
    pub mode: ConversationMode,
    pub stage: SessionStage,
    pub conversation: Conversation,
    pub transcript: Vec<ChatMessage>,
    pub results: Option<RecommendationResults>,
    pub comparison: Option<ComparisonView>,
    pub awaiting_reply: bool,
    /// Catalog snapshot read once when the session started.
    pub catalog: Arc<Vec<Card>>,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(
        id: SessionId,
        user_id: Option<String>,
        mode: ConversationMode,
        catalog: Vec<Card>,
    ) -> Self {
        let conversation = Conversation::start(mode);
        let transcript = vec![conversation.greeting()];
        Self {
            id,
            user_id,
            mode,
            stage: SessionStage::Chat,
            conversation,
            transcript,
            results: None,
            comparison: None,
            awaiting_reply: false,
            catalog: Arc::new(catalog),
            created_at: Utc::now(),
        }
    }

    /// Fresh conversation on the same session and catalog snapshot.
    pub fn restarted(&self) -> Self {
        let conversation = Conversation::start(self.mode);
        let transcript = vec![conversation.greeting()];
        Self {
            stage: SessionStage::Chat,
            conversation,
            transcript,
            results: None,
            comparison: None,
            awaiting_reply: false,
            ..self.clone()
        }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            mode: self.mode,
            stage: self.stage,
            step: self.conversation.step_label(),
            profile: self.conversation.profile().clone(),
            messages: self.transcript.clone(),
            results: self.results.clone(),
            comparison: self.comparison.clone(),
            awaiting_reply: self.awaiting_reply,
        }
    }
}

/// Sanitized representation of a session for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub mode: ConversationMode,
    pub stage: SessionStage,
    pub step: &'static str,
    pub profile: UserProfile,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<RecommendationResults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonView>,
    pub awaiting_reply: bool,
}
