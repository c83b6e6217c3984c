mod loader;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::domain::Card;

const BUILTIN_CATALOG: &str = include_str!("../../../data/cards.json");

/// Read contract for the card catalog.
pub trait CardCatalog: Send + Sync {
    /// All active cards, in catalog order.
    fn active_cards(&self) -> Result<Vec<Card>, CatalogError>;
}

/// Error raised while reading or normalizing catalog records.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("catalog record {index} has no id")]
    MissingId { index: usize },
    #[error("card id '{0}' appears more than once")]
    DuplicateId(String),
    #[error("card '{id}' has an invalid {field} ({value})")]
    InvalidAmount {
        id: String,
        field: &'static str,
        value: f64,
    },
    #[error("catalog row {index} has an unreadable {field} ({raw:?})")]
    UnparsableAmount {
        index: usize,
        field: &'static str,
        raw: String,
    },
    #[error("unsupported catalog format for {0}; expected .json or .csv")]
    UnsupportedFormat(PathBuf),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    cards: Vec<Card>,
}

impl StaticCatalog {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Sample catalog of Indian credit cards bundled with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        let cards = loader::parse_json(BUILTIN_CATALOG.as_bytes())?;
        Ok(Self::new(cards))
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl CardCatalog for StaticCatalog {
    fn active_cards(&self) -> Result<Vec<Card>, CatalogError> {
        Ok(self.cards.clone())
    }
}

/// Catalog read from a `.json` or `.csv` export on every call.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CardCatalog for FileCatalog {
    fn active_cards(&self) -> Result<Vec<Card>, CatalogError> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let reader = || -> Result<BufReader<File>, CatalogError> {
            Ok(BufReader::new(File::open(&self.path)?))
        };

        let cards = match extension.as_deref() {
            Some("json") => loader::parse_json(reader()?)?,
            Some("csv") => loader::parse_csv(reader()?)?,
            _ => return Err(CatalogError::UnsupportedFormat(self.path.clone())),
        };

        debug!(path = %self.path.display(), cards = cards.len(), "loaded card catalog");
        Ok(cards)
    }
}
