//! Normalized records and their natural identity.

use serde::{Deserialize, Serialize};

/// Production or commercialization row for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub control: String,
    pub produto: String,
    pub ano: i32,
    pub quantidade: f64,
}

/// Processing row for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultivarRecord {
    pub id: i64,
    pub control: String,
    pub cultivar: String,
    pub ano: i32,
    pub quantidade: f64,
}

/// Import or export row for one (country, year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub pais: String,
    pub ano: i32,
    pub quantidade: f64,
    pub valor_usd: f64,
}

/// A reshaped, sanitized record ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Product(ProductRecord),
    Cultivar(CultivarRecord),
    Trade(TradeRecord),
}

/// Composite uniqueness key within one dataset kind's table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Item { original_id: i64, year: i32 },
    Country { country: String, year: i32 },
}

impl NormalizedRecord {
    pub fn key(&self) -> RecordKey {
        match self {
            NormalizedRecord::Product(r) => RecordKey::Item {
                original_id: r.id,
                year: r.ano,
            },
            NormalizedRecord::Cultivar(r) => RecordKey::Item {
                original_id: r.id,
                year: r.ano,
            },
            NormalizedRecord::Trade(r) => RecordKey::Country {
                country: r.pais.clone(),
                year: r.ano,
            },
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            NormalizedRecord::Product(r) => r.ano,
            NormalizedRecord::Cultivar(r) => r.ano,
            NormalizedRecord::Trade(r) => r.ano,
        }
    }
}
