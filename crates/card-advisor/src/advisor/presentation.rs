use serde::{Deserialize, Serialize};

use super::domain::{Card, CardId, UserProfile};
use super::scoring::ScoredCard;

pub const NO_MATCHES_MESSAGE: &str = "We couldn't find any cards that match your profile right now. Try adjusting your answers or start over.";

pub const COMPARISON_DISCLAIMER: &str = "All information is subject to change. Please verify details on the bank's official website before applying.";

/// Flat reward rate used for the annual estimate shown next to the results.
const ESTIMATED_REWARD_RATE: f64 = 0.02;
const RESULT_PERK_PREVIEW: usize = 4;
const COMPARISON_PERK_PREVIEW: usize = 3;
const COMPARISON_ELIGIBILITY_PREVIEW: usize = 2;
const MIN_COMPARED_CARDS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub rank: usize,
    pub top_pick: bool,
    pub score: u8,
    pub card: Card,
    pub annual_fee_label: String,
    pub highlights: Vec<String>,
    pub perk_preview: Vec<String>,
    #[serde(default)]
    pub more_perks: usize,
}

/// Ranked recommendations as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResults {
    pub recommendations: Vec<RecommendationEntry>,
    pub estimated_annual_rewards: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_state: Option<String>,
}

impl RecommendationResults {
    pub fn build(ranked: Vec<ScoredCard>, profile: &UserProfile) -> Self {
        let highlights = highlights_for(profile);
        let recommendations: Vec<RecommendationEntry> = ranked
            .into_iter()
            .enumerate()
            .map(|(index, scored)| {
                let (perk_preview, more_perks) =
                    preview(&scored.card.special_perks, RESULT_PERK_PREVIEW);
                RecommendationEntry {
                    rank: index + 1,
                    top_pick: index == 0,
                    score: scored.score,
                    annual_fee_label: fee_label(scored.card.annual_fee),
                    highlights: highlights.clone(),
                    perk_preview,
                    more_perks,
                    card: scored.card,
                }
            })
            .collect();

        let empty_state = recommendations
            .is_empty()
            .then(|| NO_MATCHES_MESSAGE.to_string());

        Self {
            recommendations,
            estimated_annual_rewards: estimated_annual_rewards(profile),
            empty_state,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }

    /// Chat line posted once the questionnaire has been ranked.
    pub fn completion_message(&self) -> String {
        match self.recommendations.len() {
            0 => NO_MATCHES_MESSAGE.to_string(),
            1 => "Perfect! I've found 1 excellent credit card match for you based on your profile. Let me show you the recommendation with detailed analysis.".to_string(),
            count => format!(
                "Perfect! I've found {count} excellent credit card matches for you based on your profile. Let me show you the recommendations with detailed analysis."
            ),
        }
    }

    pub fn card_ids(&self) -> Vec<CardId> {
        self.recommendations
            .iter()
            .map(|entry| entry.card.id.clone())
            .collect()
    }
}

fn highlights_for(profile: &UserProfile) -> Vec<String> {
    let mut highlights = Vec::new();
    if let Some(income) = profile.declared_income() {
        highlights.push(format!(
            "Matches your {} monthly income",
            format_rupees(income)
        ));
    }
    highlights.push("Optimized rewards for your spending categories".to_string());
    if !profile.preferred_benefits.is_empty() {
        highlights.push("Aligns with your selected benefit preferences".to_string());
    }
    if profile.credit_score.is_some() {
        highlights.push("Suitable for your credit profile".to_string());
    }
    highlights
}

/// Yearly reward estimate: total monthly spend at a flat 2%, times twelve, rounded.
pub fn estimated_annual_rewards(profile: &UserProfile) -> u64 {
    let monthly = profile.spending_habits.total() * ESTIMATED_REWARD_RATE;
    (monthly * 12.0).round() as u64
}

/// Rupee amount with thousands separators, rounded to whole rupees.
pub fn format_rupees(amount: f64) -> String {
    let whole = if amount.is_finite() {
        amount.round().max(0.0) as u64
    } else {
        0
    };
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("₹{grouped}")
}

pub fn fee_label(fee: f64) -> String {
    if fee <= 0.0 {
        "Free".to_string()
    } else {
        format_rupees(fee)
    }
}

fn preview(items: &[String], limit: usize) -> (Vec<String>, usize) {
    let shown: Vec<String> = items.iter().take(limit).cloned().collect();
    let hidden = items.len().saturating_sub(limit);
    (shown, hidden)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub label: &'static str,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparedCard {
    pub id: CardId,
    pub name: String,
    pub issuer: String,
    pub perks: Vec<String>,
    pub more_perks: usize,
    pub eligibility: Vec<String>,
    pub apply_link: String,
}

/// Side-by-side view of a user-selected subset of the recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonView {
    pub cards: Vec<ComparedCard>,
    pub rows: Vec<ComparisonRow>,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComparisonError {
    #[error("select at least two recommended cards to compare (got {selected})")]
    NotEnoughCards { selected: usize },
}

impl ComparisonView {
    /// Builds the comparison in recommendation order. Ids that are not among the
    /// recommendations are ignored.
    pub fn build(
        results: &RecommendationResults,
        selected: &[CardId],
    ) -> Result<Self, ComparisonError> {
        let cards: Vec<&Card> = results
            .recommendations
            .iter()
            .map(|entry| &entry.card)
            .filter(|card| selected.contains(&card.id))
            .collect();

        if cards.len() < MIN_COMPARED_CARDS {
            return Err(ComparisonError::NotEnoughCards {
                selected: cards.len(),
            });
        }

        let row = |label: &'static str, value: fn(&Card) -> String| ComparisonRow {
            label,
            values: cards.iter().map(|card| value(card)).collect(),
        };

        let rows = vec![
            row("Annual Fee", |card| fee_label(card.annual_fee)),
            row("Joining Fee", |card| fee_label(card.joining_fee)),
            row("Reward Type", |card| card.reward_type.clone()),
            row("Reward Rate", |card| card.reward_rate.clone()),
            row("Min Income", |card| {
                format!("{}/month", format_rupees(card.min_income))
            }),
        ];

        let compared = cards
            .iter()
            .map(|card| {
                let (perks, more_perks) = preview(&card.special_perks, COMPARISON_PERK_PREVIEW);
                let (eligibility, _) = preview(&card.eligibility, COMPARISON_ELIGIBILITY_PREVIEW);
                ComparedCard {
                    id: card.id.clone(),
                    name: card.name.clone(),
                    issuer: card.issuer.clone(),
                    perks,
                    more_perks,
                    eligibility,
                    apply_link: card.apply_link.clone(),
                }
            })
            .collect();

        Ok(Self {
            cards: compared,
            rows,
            disclaimer: COMPARISON_DISCLAIMER.to_string(),
        })
    }
}
