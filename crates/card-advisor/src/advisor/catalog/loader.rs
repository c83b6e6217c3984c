use std::collections::HashSet;
use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::super::domain::{Card, CardCategory, CardId};
use super::CatalogError;

/// Raw catalog row as stored upstream. Every field except the id may be missing.
#[derive(Debug, Deserialize)]
pub(crate) struct CatalogRecord {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default, alias = "minIncome")]
    min_income: Option<f64>,
    #[serde(default, alias = "annualFee")]
    annual_fee: Option<f64>,
    #[serde(default, alias = "joiningFee")]
    joining_fee: Option<f64>,
    #[serde(default, alias = "rewardType")]
    reward_type: Option<String>,
    #[serde(default, alias = "rewardRate")]
    reward_rate: Option<String>,
    #[serde(default, alias = "specialPerks")]
    special_perks: Option<Vec<String>>,
    #[serde(default)]
    eligibility: Option<Vec<String>>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "applyLink")]
    apply_link: Option<String>,
    #[serde(default)]
    active: Option<bool>,
}

impl CatalogRecord {
    fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }

    fn into_card(self, index: usize) -> Result<Card, CatalogError> {
        let id = self.id.ok_or(CatalogError::MissingId { index })?;

        let min_income = amount(&id, "min_income", self.min_income)?;
        let annual_fee = amount(&id, "annual_fee", self.annual_fee)?;
        let joining_fee = amount(&id, "joining_fee", self.joining_fee)?;

        Ok(Card {
            id: CardId(id),
            name: self.name.unwrap_or_default(),
            issuer: self.issuer.unwrap_or_default(),
            min_income,
            annual_fee,
            joining_fee,
            reward_type: self.reward_type.unwrap_or_default(),
            reward_rate: self.reward_rate.unwrap_or_default(),
            special_perks: self.special_perks.unwrap_or_default(),
            eligibility: self.eligibility.unwrap_or_default(),
            category: self
                .category
                .map(CardCategory::from)
                .unwrap_or_default(),
            apply_link: self.apply_link.unwrap_or_default(),
        })
    }
}

fn amount(id: &str, field: &'static str, value: Option<f64>) -> Result<f64, CatalogError> {
    match value {
        None => Ok(0.0),
        Some(value) if value.is_finite() && value >= 0.0 => Ok(value),
        Some(value) => Err(CatalogError::InvalidAmount {
            id: id.to_string(),
            field,
            value,
        }),
    }
}

/// Converts raw records into cards, skipping inactive rows and rejecting duplicate ids.
pub(crate) fn cards_from_records(records: Vec<CatalogRecord>) -> Result<Vec<Card>, CatalogError> {
    let mut seen = HashSet::new();
    let mut cards = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        if !record.is_active() {
            continue;
        }
        let card = record.into_card(index)?;
        if !seen.insert(card.id.clone()) {
            return Err(CatalogError::DuplicateId(card.id.0));
        }
        cards.push(card);
    }

    Ok(cards)
}

pub(crate) fn parse_json<R: Read>(reader: R) -> Result<Vec<Card>, CatalogError> {
    let records: Vec<CatalogRecord> = serde_json::from_reader(reader)?;
    cards_from_records(records)
}

/// CSV catalogs carry list columns as `|`-separated text.
pub(crate) fn parse_csv<R: Read>(reader: R) -> Result<Vec<Card>, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        records.push(row?.into_record(index)?);
    }

    cards_from_records(records)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    issuer: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    min_income: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    annual_fee: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    joining_fee: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    reward_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    reward_rate: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    special_perks: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    eligibility: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    category: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    apply_link: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    active: Option<String>,
}

impl CsvRow {
    fn into_record(self, index: usize) -> Result<CatalogRecord, CatalogError> {
        let number = |field: &'static str, raw: Option<&str>| match raw {
            None => Ok(None),
            Some(raw) => parse_number(raw)
                .map(Some)
                .ok_or_else(|| CatalogError::UnparsableAmount {
                    index,
                    field,
                    raw: raw.to_string(),
                }),
        };

        Ok(CatalogRecord {
            min_income: number("min_income", self.min_income.as_deref())?,
            annual_fee: number("annual_fee", self.annual_fee.as_deref())?,
            joining_fee: number("joining_fee", self.joining_fee.as_deref())?,
            id: self.id,
            name: self.name,
            issuer: self.issuer,
            reward_type: self.reward_type,
            reward_rate: self.reward_rate,
            special_perks: self.special_perks.as_deref().map(split_list),
            eligibility: self.eligibility.as_deref().map(split_list),
            category: self.category,
            apply_link: self.apply_link,
            active: self.active.as_deref().map(parse_flag),
        })
    }
}

/// Accepts rupee-formatted cells such as `₹1,50,000`.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('₹')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse().ok()
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "false" | "no" | "0" | "inactive"
    )
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
