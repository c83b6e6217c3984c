use std::sync::OnceLock;

use regex::Regex;

use super::super::domain::SpendingCategory;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("number pattern is valid")
    })
}

fn spending_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(fuel|petrol|diesel|travel|flights?|hotels?|groceries|grocery|dining|food|restaurants?|shopping)\b\D{0,24}?(\d[\d,]*(?:\.\d+)?)",
        )
        .expect("spending pattern is valid")
    })
}

/// First decimal number in the text, with thousands separators dropped ("₹50,000" -> 50000).
pub(crate) fn first_number(input: &str) -> Option<f64> {
    let matched = number_pattern().find(input)?;
    parse_amount(matched.as_str())
}

/// Income answer policy: anything that is not a positive amount is left unset.
pub(crate) fn parse_income(input: &str) -> Option<f64> {
    first_number(input).filter(|value| *value > 0.0)
}

pub(crate) fn parse_benefits(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|benefit| !benefit.is_empty())
        .map(str::to_string)
        .collect()
}

/// Category amounts mentioned in free text, e.g. "petrol 4000 and dining about 2,500".
pub(crate) fn spending_mentions(input: &str) -> Vec<(SpendingCategory, f64)> {
    spending_pattern()
        .captures_iter(input)
        .filter_map(|captures| {
            let category = category_for(&captures[1])?;
            let amount = parse_amount(&captures[2])?;
            Some((category, amount))
        })
        .collect()
}

fn category_for(keyword: &str) -> Option<SpendingCategory> {
    let keyword = keyword.to_lowercase();
    let category = match keyword.as_str() {
        "fuel" | "petrol" | "diesel" => SpendingCategory::Fuel,
        "travel" | "flight" | "flights" | "hotel" | "hotels" => SpendingCategory::Travel,
        "groceries" | "grocery" => SpendingCategory::Groceries,
        "dining" | "food" | "restaurant" | "restaurants" => SpendingCategory::Dining,
        "shopping" => SpendingCategory::Shopping,
        _ => return None,
    };
    Some(category)
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_number_with_separators() {
        assert_eq!(first_number("About ₹50,000 a month"), Some(50_000.0));
        assert_eq!(first_number("1,00,000"), Some(100_000.0));
        assert_eq!(first_number("roughly 2500.50 or 3000"), Some(2_500.5));
        assert_eq!(first_number("no idea"), None);
    }

    #[test]
    fn income_policy_treats_zero_and_text_as_unset() {
        assert_eq!(parse_income("0"), None);
        assert_eq!(parse_income("prefer not to say"), None);
        assert_eq!(parse_income("75000"), Some(75_000.0));
    }

    #[test]
    fn splits_benefits_on_commas() {
        assert_eq!(
            parse_benefits("Cashback on all purchases, Airport lounge access ,,"),
            vec![
                "Cashback on all purchases".to_string(),
                "Airport lounge access".to_string()
            ]
        );
        assert_eq!(
            parse_benefits("Fuel rewards"),
            vec!["Fuel rewards".to_string()]
        );
    }

    #[test]
    fn finds_category_amounts_in_free_text() {
        let mentions = spending_mentions("Petrol is 4,000, flights around 6000 and food 2500");
        assert_eq!(
            mentions,
            vec![
                (SpendingCategory::Fuel, 4_000.0),
                (SpendingCategory::Travel, 6_000.0),
                (SpendingCategory::Dining, 2_500.0),
            ]
        );
        assert!(spending_mentions("I spend a lot").is_empty());
    }
}
