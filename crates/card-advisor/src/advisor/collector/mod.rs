//! Scripted questionnaire that fills a [`UserProfile`] one answer at a time.
//!
//! The questionnaire is a finite-state machine. Steps and their order live in
//! [`TRANSITIONS`]; each answer produces a new collector value instead of mutating the old one.

pub(crate) mod parser;

use serde::{Deserialize, Serialize};

use super::domain::{CreditScoreBand, SpendingCategory, UserProfile};

pub const BENEFIT_OPTIONS: [&str; 6] = [
    "Cashback on all purchases",
    "Travel rewards & airline miles",
    "Fuel rewards",
    "Shopping rewards",
    "Airport lounge access",
    "Dining rewards",
];

pub const CREDIT_SCORE_OPTIONS: [&str; 5] = [
    "Excellent (750+)",
    "Good (700-749)",
    "Fair (650-699)",
    "Building credit (<650)",
    "Not sure",
];

pub const GREETING: &str = "Hi! I'm your credit card advisor. I'll ask you a few questions to find the best credit cards for you. Let's start with your monthly income. What's your approximate monthly income in rupees?";

/// Named states of the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorStep {
    Income,
    Fuel,
    Travel,
    Groceries,
    Dining,
    Benefits,
    CreditScore,
    Complete,
}

/// Transition table: the only way a step can advance.
pub const TRANSITIONS: [(CollectorStep, CollectorStep); 7] = [
    (CollectorStep::Income, CollectorStep::Fuel),
    (CollectorStep::Fuel, CollectorStep::Travel),
    (CollectorStep::Travel, CollectorStep::Groceries),
    (CollectorStep::Groceries, CollectorStep::Dining),
    (CollectorStep::Dining, CollectorStep::Benefits),
    (CollectorStep::Benefits, CollectorStep::CreditScore),
    (CollectorStep::CreditScore, CollectorStep::Complete),
];

impl CollectorStep {
    pub fn next(self) -> Option<CollectorStep> {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, to)| *to)
    }

    pub const fn label(self) -> &'static str {
        match self {
            CollectorStep::Income => "income",
            CollectorStep::Fuel => "fuel",
            CollectorStep::Travel => "travel",
            CollectorStep::Groceries => "groceries",
            CollectorStep::Dining => "dining",
            CollectorStep::Benefits => "benefits",
            CollectorStep::CreditScore => "credit_score",
            CollectorStep::Complete => "complete",
        }
    }

    /// Question asked when the conversation enters this step.
    pub const fn prompt(self) -> &'static str {
        match self {
            CollectorStep::Income => GREETING,
            CollectorStep::Fuel => "Great! Now let's talk about your spending habits. How much do you typically spend on fuel per month?",
            CollectorStep::Travel => "How much do you spend on travel (flights, hotels) per month on average?",
            CollectorStep::Groceries => "What about groceries and daily essentials? Monthly spending amount?",
            CollectorStep::Dining => "How much do you spend on dining out and food delivery per month?",
            CollectorStep::Benefits => "Perfect! Now, what benefits are you most interested in?",
            CollectorStep::CreditScore => "What's your approximate credit score range?",
            CollectorStep::Complete => "Excellent! I'm analyzing your profile to find the best credit cards for you.",
        }
    }

    pub fn options(self) -> &'static [&'static str] {
        match self {
            CollectorStep::Benefits => &BENEFIT_OPTIONS,
            CollectorStep::CreditScore => &CREDIT_SCORE_OPTIONS,
            _ => &[],
        }
    }

    fn spending_category(self) -> Option<SpendingCategory> {
        match self {
            CollectorStep::Fuel => Some(SpendingCategory::Fuel),
            CollectorStep::Travel => Some(SpendingCategory::Travel),
            CollectorStep::Groceries => Some(SpendingCategory::Groceries),
            CollectorStep::Dining => Some(SpendingCategory::Dining),
            _ => None,
        }
    }
}

/// A question to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub step: CollectorStep,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl Prompt {
    pub fn for_step(step: CollectorStep) -> Self {
        Self {
            step,
            message: step.prompt().to_string(),
            options: step.options().iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// What happened after an answer was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorEvent {
    Prompt(Prompt),
    Completed(UserProfile),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectorError {
    #[error("answer was empty")]
    EmptyInput,
    #[error("questionnaire is already complete")]
    AlreadyComplete,
}

/// Questionnaire state: the current step plus the profile gathered so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCollector {
    step: CollectorStep,
    profile: UserProfile,
}

impl Default for ProfileCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCollector {
    pub fn new() -> Self {
        Self::from_profile(UserProfile::default())
    }

    /// Starts the questionnaire on top of an existing profile.
    pub fn from_profile(profile: UserProfile) -> Self {
        Self {
            step: CollectorStep::Income,
            profile,
        }
    }

    pub fn step(&self) -> CollectorStep {
        self.step
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn is_complete(&self) -> bool {
        self.step == CollectorStep::Complete
    }

    pub fn current_prompt(&self) -> Prompt {
        Prompt::for_step(self.step)
    }

    /// Applies one answer and returns the successor collector with the resulting event.
    ///
    /// Answers that cannot be parsed leave their field unset and the flow still advances.
    /// [`CollectorEvent::Completed`] is produced exactly once, by the credit score answer.
    pub fn submit(&self, input: &str) -> Result<(ProfileCollector, CollectorEvent), CollectorError> {
        let input = input.trim();
        if self.is_complete() {
            return Err(CollectorError::AlreadyComplete);
        }
        if input.is_empty() {
            return Err(CollectorError::EmptyInput);
        }

        let profile = self.apply(input);
        let next = self.step.next().unwrap_or(CollectorStep::Complete);
        let collector = ProfileCollector {
            step: next,
            profile,
        };

        let event = if collector.is_complete() {
            CollectorEvent::Completed(collector.profile.clone())
        } else {
            CollectorEvent::Prompt(Prompt::for_step(next))
        };

        Ok((collector, event))
    }

    fn apply(&self, input: &str) -> UserProfile {
        if let Some(category) = self.step.spending_category() {
            return self
                .profile
                .with_spending(category, parser::first_number(input));
        }

        match self.step {
            CollectorStep::Income => self
                .profile
                .with_monthly_income(parser::parse_income(input)),
            CollectorStep::Benefits => self
                .profile
                .with_preferred_benefits(parser::parse_benefits(input)),
            CollectorStep::CreditScore => self
                .profile
                .with_credit_score(CreditScoreBand::parse_loose(input)),
            _ => self.profile.clone(),
        }
    }
}
