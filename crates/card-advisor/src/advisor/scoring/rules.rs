use super::super::domain::{Card, CardCategory, CreditScoreBand, SpendingCategory, UserProfile};
use super::{Award, Eligibility, ScoreComponent};

pub(crate) const MAX_SCORE: u8 = 100;

const BASE_POINTS: u8 = 20;
const FUEL_SPEND_THRESHOLD: f64 = 3000.0;
const TRAVEL_SPEND_THRESHOLD: f64 = 5000.0;
const GROCERY_SPEND_THRESHOLD: f64 = 3000.0;
const DINING_SPEND_THRESHOLD: f64 = 2000.0;

pub(crate) fn check_eligibility(card: &Card, profile: &UserProfile) -> Eligibility {
    match profile.declared_income() {
        Some(declared) if card.min_income > declared => Eligibility::IncomeBelowMinimum {
            required: card.min_income,
            declared,
        },
        _ => Eligibility::Eligible,
    }
}

/// Applies every award to a card that already passed the eligibility gate.
pub(crate) fn score_card(card: &Card, profile: &UserProfile) -> (Vec<ScoreComponent>, u8) {
    let mut components = vec![ScoreComponent {
        award: Award::BaseEligibility,
        points: BASE_POINTS,
        notes: "meets the minimum income requirement".to_string(),
    }];

    components.push(fee_tier(card.annual_fee));

    let spending = &profile.spending_habits;

    let fuel = spending.amount(SpendingCategory::Fuel);
    if fuel > FUEL_SPEND_THRESHOLD && (card.reward_type_mentions("fuel") || card.perks_mention("fuel"))
    {
        components.push(ScoreComponent {
            award: Award::FuelSpend,
            points: 15,
            notes: format!("fuel spend {fuel:.0} pairs with fuel rewards"),
        });
    }

    let travel = spending.amount(SpendingCategory::Travel);
    if travel > TRAVEL_SPEND_THRESHOLD
        && (card.reward_type_mentions("travel")
            || card.perks_mention("travel")
            || card.perks_mention("lounge"))
    {
        components.push(ScoreComponent {
            award: Award::TravelSpend,
            points: 15,
            notes: format!("travel spend {travel:.0} pairs with travel benefits"),
        });
    }

    let groceries = spending.amount(SpendingCategory::Groceries);
    if groceries > GROCERY_SPEND_THRESHOLD && card.reward_type_mentions("cashback") {
        components.push(ScoreComponent {
            award: Award::GrocerySpend,
            points: 12,
            notes: format!("grocery spend {groceries:.0} earns cashback"),
        });
    }

    let dining = spending.amount(SpendingCategory::Dining);
    if dining > DINING_SPEND_THRESHOLD && card.perks_mention("dining") {
        components.push(ScoreComponent {
            award: Award::DiningSpend,
            points: 10,
            notes: format!("dining spend {dining:.0} pairs with dining perks"),
        });
    }

    if prefers(profile, "cashback") && card.reward_type_mentions("cashback") {
        components.push(ScoreComponent {
            award: Award::CashbackPreference,
            points: 12,
            notes: "cashback preference matched".to_string(),
        });
    }

    if prefers(profile, "travel")
        && (card.reward_type_mentions("travel") || card.perks_mention("travel"))
    {
        components.push(ScoreComponent {
            award: Award::TravelPreference,
            points: 12,
            notes: "travel preference matched".to_string(),
        });
    }

    if prefers(profile, "lounge") && card.perks_mention("lounge") {
        components.push(ScoreComponent {
            award: Award::LoungePreference,
            points: 10,
            notes: "lounge access preference matched".to_string(),
        });
    }

    if let Some(component) = credit_tier(profile.credit_score, &card.category) {
        components.push(component);
    }

    let total: u32 = components
        .iter()
        .map(|component| u32::from(component.points))
        .sum();
    let capped = total.min(u32::from(MAX_SCORE)) as u8;

    (components, capped)
}

fn fee_tier(annual_fee: f64) -> ScoreComponent {
    let (points, notes) = if annual_fee <= 0.0 {
        (15, "no annual fee".to_string())
    } else if annual_fee <= 1000.0 {
        (10, format!("low annual fee {annual_fee:.0}"))
    } else if annual_fee <= 5000.0 {
        (5, format!("moderate annual fee {annual_fee:.0}"))
    } else {
        (0, format!("high annual fee {annual_fee:.0}"))
    };

    ScoreComponent {
        award: Award::FeeTier,
        points,
        notes,
    }
}

fn prefers(profile: &UserProfile, needle: &str) -> bool {
    profile
        .preferred_benefits
        .iter()
        .any(|benefit| super::super::domain::mentions(benefit, needle))
}

fn credit_tier(band: Option<CreditScoreBand>, category: &CardCategory) -> Option<ScoreComponent> {
    let band = band?;
    let points = match (band, category) {
        (CreditScoreBand::Excellent, CardCategory::Premium) => 8,
        (CreditScoreBand::Good, CardCategory::Premium | CardCategory::Lifestyle) => 5,
        (CreditScoreBand::Fair, CardCategory::EntryLevel | CardCategory::Lifestyle) => 5,
        _ => return None,
    };

    Some(ScoreComponent {
        award: Award::CreditTier,
        points,
        notes: format!("{} credit suits a {} card", band.label(), category.label()),
    })
}
