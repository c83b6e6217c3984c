//! Optional conversational assistant seam.
//!
//! The assistant only ever contributes a reply message, a next-step label and quick-reply
//! options. Profile updates come from the user's own text, parsed the same way the scripted
//! questionnaire parses it.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::collector::parser;
use super::domain::{CreditScoreBand, UserProfile};

pub use http::HttpAssistantClient;

/// Shown in place of a reply whenever the assistant cannot be reached or understood.
pub const FALLBACK_MESSAGE: &str = "I'm sorry, I'm having trouble connecting to my AI brain right now. Could you please try again? Let's continue with your financial profile.";

pub const ASSISTED_GREETING: &str = "Hello! I'm your AI-powered credit card advisor. I'll help you find the perfect credit cards based on your financial profile. Let's start with your monthly income. What's your approximate monthly income in rupees?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Body sent to the assistant for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    #[serde(rename = "conversationHistory", default)]
    pub conversation_history: Vec<HistoryEntry>,
}

/// Conversation stage reported by the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssistantStep {
    Income,
    Spending,
    Benefits,
    CreditScore,
    Analysis,
    Complete,
}

impl AssistantStep {
    pub fn parse(label: &str) -> Option<Self> {
        let step = match label.trim() {
            "income" => AssistantStep::Income,
            "spending" => AssistantStep::Spending,
            "benefits" => AssistantStep::Benefits,
            "creditScore" | "credit_score" => AssistantStep::CreditScore,
            "analysis" => AssistantStep::Analysis,
            "complete" => AssistantStep::Complete,
            _ => return None,
        };
        Some(step)
    }

    pub const fn label(self) -> &'static str {
        match self {
            AssistantStep::Income => "income",
            AssistantStep::Spending => "spending",
            AssistantStep::Benefits => "benefits",
            AssistantStep::CreditScore => "credit_score",
            AssistantStep::Analysis => "analysis",
            AssistantStep::Complete => "complete",
        }
    }

    /// `analysis` and `complete` both end the conversation.
    pub fn finishes(self) -> bool {
        matches!(self, AssistantStep::Analysis | AssistantStep::Complete)
    }
}

/// Assistant reply. Unknown next-step labels are dropped rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawReply")]
pub struct TurnReply {
    pub message: String,
    #[serde(rename = "nextStep", skip_serializing_if = "Option::is_none")]
    pub next_step: Option<AssistantStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawReply {
    message: String,
    #[serde(default, rename = "nextStep", alias = "next_step")]
    next_step: Option<String>,
    #[serde(default)]
    options: Option<Vec<String>>,
}

impl From<RawReply> for TurnReply {
    fn from(raw: RawReply) -> Self {
        Self {
            message: raw.message,
            next_step: raw.next_step.as_deref().and_then(AssistantStep::parse),
            options: raw.options.filter(|options| !options.is_empty()),
        }
    }
}

impl TurnReply {
    /// Interprets raw model output: a reply document when it parses, otherwise the text
    /// itself with the conversation pointed back at income.
    pub fn from_model_text(text: &str) -> Result<Self, AssistantError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AssistantError::EmptyReply);
        }

        match serde_json::from_str::<TurnReply>(trimmed) {
            Ok(reply) => Ok(reply),
            Err(_) => Ok(Self {
                message: trimmed.to_string(),
                next_step: Some(AssistantStep::Income),
                options: None,
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Transport(String),
    #[error("assistant returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("assistant returned an empty reply")]
    EmptyReply,
}

/// One conversational turn against an external assistant.
#[async_trait]
pub trait AssistantClient: Send + Sync {
    async fn respond(&self, request: &TurnRequest) -> Result<TurnReply, AssistantError>;
}

/// Profile update for a user message received while the assistant is on `step`.
pub fn apply_assistant_input(profile: &UserProfile, step: AssistantStep, input: &str) -> UserProfile {
    match step {
        AssistantStep::Income => match parser::parse_income(input) {
            Some(income) => profile.with_monthly_income(Some(income)),
            None => profile.clone(),
        },
        AssistantStep::Spending => parser::spending_mentions(input)
            .into_iter()
            .fold(profile.clone(), |acc, (category, amount)| {
                acc.with_spending(category, Some(amount))
            }),
        AssistantStep::Benefits => {
            let benefits = parser::parse_benefits(input);
            if benefits.is_empty() {
                profile.clone()
            } else {
                profile.with_preferred_benefits(benefits)
            }
        }
        AssistantStep::CreditScore => match CreditScoreBand::parse_loose(input) {
            Some(band) => profile.with_credit_score(Some(band)),
            None => profile.clone(),
        },
        AssistantStep::Analysis | AssistantStep::Complete => profile.clone(),
    }
}
