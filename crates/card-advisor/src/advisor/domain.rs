use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalog cards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub String);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Spending categories the questionnaire asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingCategory {
    Fuel,
    Travel,
    Groceries,
    Dining,
    Shopping,
}

impl SpendingCategory {
    pub const ALL: [SpendingCategory; 5] = [
        SpendingCategory::Fuel,
        SpendingCategory::Travel,
        SpendingCategory::Groceries,
        SpendingCategory::Dining,
        SpendingCategory::Shopping,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            SpendingCategory::Fuel => "fuel",
            SpendingCategory::Travel => "travel",
            SpendingCategory::Groceries => "groceries",
            SpendingCategory::Dining => "dining",
            SpendingCategory::Shopping => "shopping",
        }
    }
}

/// Monthly spend per category. An absent category counts as zero spend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpendingHabits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groceries: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dining: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shopping: Option<f64>,
}

impl SpendingHabits {
    pub fn get(&self, category: SpendingCategory) -> Option<f64> {
        match category {
            SpendingCategory::Fuel => self.fuel,
            SpendingCategory::Travel => self.travel,
            SpendingCategory::Groceries => self.groceries,
            SpendingCategory::Dining => self.dining,
            SpendingCategory::Shopping => self.shopping,
        }
    }

    /// Spend used for scoring: missing, negative or non-finite amounts count as zero.
    pub fn amount(&self, category: SpendingCategory) -> f64 {
        self.get(category)
            .filter(|value| value.is_finite() && *value >= 0.0)
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        SpendingCategory::ALL
            .iter()
            .map(|category| self.amount(*category))
            .sum()
    }

    pub fn with(&self, category: SpendingCategory, value: Option<f64>) -> Self {
        let mut next = self.clone();
        let slot = match category {
            SpendingCategory::Fuel => &mut next.fuel,
            SpendingCategory::Travel => &mut next.travel,
            SpendingCategory::Groceries => &mut next.groceries,
            SpendingCategory::Dining => &mut next.dining,
            SpendingCategory::Shopping => &mut next.shopping,
        };
        *slot = value;
        next
    }
}

/// Self-reported credit score band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditScoreBand {
    Excellent,
    Good,
    Fair,
    Building,
    Unknown,
}

impl CreditScoreBand {
    /// Loose match against free text such as "Good (700-749)" or "not sure".
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }

        let band = if lowered.contains("excellent") {
            CreditScoreBand::Excellent
        } else if lowered.contains("good") {
            CreditScoreBand::Good
        } else if lowered.contains("fair") {
            CreditScoreBand::Fair
        } else if lowered.contains("building") {
            CreditScoreBand::Building
        } else {
            CreditScoreBand::Unknown
        };

        Some(band)
    }

    pub const fn label(self) -> &'static str {
        match self {
            CreditScoreBand::Excellent => "Excellent",
            CreditScoreBand::Good => "Good",
            CreditScoreBand::Fair => "Fair",
            CreditScoreBand::Building => "Building",
            CreditScoreBand::Unknown => "Unknown",
        }
    }
}

/// Financial profile assembled by the questionnaire and consumed by the scoring engine.
///
/// Updates go through the `with_*` builders, each returning a new profile so a profile that
/// has been handed to the engine is never changed underneath it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(alias = "monthlyIncome", skip_serializing_if = "Option::is_none")]
    pub monthly_income: Option<f64>,
    #[serde(alias = "spendingHabits")]
    pub spending_habits: SpendingHabits,
    #[serde(alias = "preferredBenefits")]
    pub preferred_benefits: Vec<String>,
    #[serde(
        alias = "creditScore",
        deserialize_with = "loose_credit_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub credit_score: Option<CreditScoreBand>,
    #[serde(alias = "existingCards", skip_serializing_if = "Option::is_none")]
    pub existing_cards: Option<Vec<CardId>>,
}

/// Credit score labels arrive as free text ("Good (700-749)", "not sure"); blank means unset.
fn loose_credit_score<'de, D>(deserializer: D) -> Result<Option<CreditScoreBand>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(CreditScoreBand::parse_loose))
}

impl UserProfile {
    pub fn with_monthly_income(&self, monthly_income: Option<f64>) -> Self {
        Self {
            monthly_income,
            ..self.clone()
        }
    }

    pub fn with_spending(&self, category: SpendingCategory, amount: Option<f64>) -> Self {
        Self {
            spending_habits: self.spending_habits.with(category, amount),
            ..self.clone()
        }
    }

    pub fn with_preferred_benefits(&self, preferred_benefits: Vec<String>) -> Self {
        Self {
            preferred_benefits,
            ..self.clone()
        }
    }

    pub fn with_credit_score(&self, credit_score: Option<CreditScoreBand>) -> Self {
        Self {
            credit_score,
            ..self.clone()
        }
    }

    /// Income usable for the eligibility gate. Zero and malformed values count as
    /// "not provided".
    pub fn declared_income(&self) -> Option<f64> {
        self.monthly_income
            .filter(|value| value.is_finite() && *value > 0.0)
    }

    /// Boundary validation for profiles arriving from outside the questionnaire.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if let Some(income) = self.monthly_income {
            if !income.is_finite() || income < 0.0 {
                return Err(ProfileError::InvalidIncome(income));
            }
        }

        for category in SpendingCategory::ALL {
            if let Some(amount) = self.spending_habits.get(category) {
                if !amount.is_finite() || amount < 0.0 {
                    return Err(ProfileError::InvalidSpending { category, amount });
                }
            }
        }

        Ok(())
    }
}

/// Rejection raised for profiles that break the non-negative amount invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("monthly income must be a non-negative amount (got {0})")]
    InvalidIncome(f64),
    #[error("{} spend must be a non-negative amount (got {amount})", .category.label())]
    InvalidSpending {
        category: SpendingCategory,
        amount: f64,
    },
}

/// Product tier. Known tiers are named; anything else is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CardCategory {
    Premium,
    Lifestyle,
    EntryLevel,
    Other(String),
}

impl CardCategory {
    pub fn label(&self) -> &str {
        match self {
            CardCategory::Premium => "Premium",
            CardCategory::Lifestyle => "Lifestyle",
            CardCategory::EntryLevel => "Entry Level",
            CardCategory::Other(label) => label,
        }
    }
}

impl Default for CardCategory {
    fn default() -> Self {
        CardCategory::Other(String::new())
    }
}

impl From<String> for CardCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Premium" => CardCategory::Premium,
            "Lifestyle" => CardCategory::Lifestyle,
            "Entry Level" => CardCategory::EntryLevel,
            _ => CardCategory::Other(value),
        }
    }
}

impl From<CardCategory> for String {
    fn from(value: CardCategory) -> Self {
        match value {
            CardCategory::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

/// Catalog record for a single credit card product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub issuer: String,
    pub min_income: f64,
    pub annual_fee: f64,
    pub joining_fee: f64,
    pub reward_type: String,
    pub reward_rate: String,
    pub special_perks: Vec<String>,
    pub eligibility: Vec<String>,
    pub category: CardCategory,
    pub apply_link: String,
}

impl Card {
    pub(crate) fn reward_type_mentions(&self, needle: &str) -> bool {
        mentions(&self.reward_type, needle)
    }

    pub(crate) fn perks_mention(&self, needle: &str) -> bool {
        self.special_perks.iter().any(|perk| mentions(perk, needle))
    }
}

/// Case-insensitive substring containment.
pub(crate) fn mentions(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
