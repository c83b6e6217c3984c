mod rules;

use super::domain::{Card, CardId, UserProfile};
use serde::{Deserialize, Serialize};

/// Upper bound on the number of cards returned by [`ScoringEngine::rank`].
pub const RECOMMENDATION_LIMIT: usize = 5;

/// Stateless scorer matching catalog cards against a user profile.
///
/// The engine holds no state between calls, so one instance can be shared freely and
/// invoked again after a session restart with no residue from earlier runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Fit between one card and one profile, in `0..=100`.
    pub fn score(&self, card: &Card, profile: &UserProfile) -> u8 {
        self.evaluate(card, profile).score
    }

    /// Score together with the eligibility verdict and every award that fired.
    pub fn evaluate(&self, card: &Card, profile: &UserProfile) -> CardEvaluation {
        let eligibility = rules::check_eligibility(card, profile);
        let (components, score) = match eligibility {
            Eligibility::Eligible => rules::score_card(card, profile),
            Eligibility::IncomeBelowMinimum { .. } => (Vec::new(), 0),
        };

        CardEvaluation {
            card_id: card.id.clone(),
            eligibility,
            score,
            components,
        }
    }

    /// Ranked recommendations: zero scores dropped, highest first, catalog order kept on
    /// ties, at most [`RECOMMENDATION_LIMIT`] entries.
    pub fn rank(&self, cards: &[Card], profile: &UserProfile) -> Vec<ScoredCard> {
        let mut scored: Vec<ScoredCard> = cards
            .iter()
            .map(|card| ScoredCard {
                score: self.score(card, profile),
                card: card.clone(),
            })
            .filter(|scored| scored.score > 0)
            .collect();

        // `sort_by` is stable, which is what keeps catalog order among equal scores.
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(RECOMMENDATION_LIMIT);
        scored
    }
}

/// Outcome of the income gate for a single card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    IncomeBelowMinimum { required: f64, declared: f64 },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Named point awards that make up a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Award {
    BaseEligibility,
    FeeTier,
    FuelSpend,
    TravelSpend,
    GrocerySpend,
    DiningSpend,
    CashbackPreference,
    TravelPreference,
    LoungePreference,
    CreditTier,
}

/// Discrete contribution to a score, kept so results can be explained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub award: Award,
    pub points: u8,
    pub notes: String,
}

/// Audit trail for one card: verdict, capped score and the awards behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEvaluation {
    pub card_id: CardId,
    pub eligibility: Eligibility,
    pub score: u8,
    pub components: Vec<ScoreComponent>,
}

/// A catalog card paired with its score for a single ranking call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCard {
    pub card: Card,
    pub score: u8,
}
