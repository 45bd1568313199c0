//! Dataset kinds published by the portal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowest year accepted from a header.
pub const MIN_YEAR: i32 = 1970;
/// Highest year accepted from a header.
pub const MAX_YEAR: i32 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetKind {
    #[serde(rename = "producao")]
    Production,
    #[serde(rename = "comercializacao")]
    Commercialization,
    #[serde(rename = "processamento")]
    Processing,
    #[serde(rename = "importacao")]
    Import,
    #[serde(rename = "exportacao")]
    Export,
}

/// Reshape family a kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// One column per year, melted into one record per (row, year).
    Simple,
    /// Two adjacent columns per year: quantity then value.
    Trade,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown dataset kind '{0}' (expected one of: producao, comercializacao, processamento, importacao, exportacao)")]
pub struct UnknownKind(pub String);

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::Production,
        DatasetKind::Commercialization,
        DatasetKind::Processing,
        DatasetKind::Import,
        DatasetKind::Export,
    ];

    /// Portal slug, also used as the storage table name.
    pub fn slug(self) -> &'static str {
        match self {
            DatasetKind::Production => "producao",
            DatasetKind::Commercialization => "comercializacao",
            DatasetKind::Processing => "processamento",
            DatasetKind::Import => "importacao",
            DatasetKind::Export => "exportacao",
        }
    }

    pub fn family(self) -> Family {
        match self {
            DatasetKind::Production | DatasetKind::Commercialization | DatasetKind::Processing => {
                Family::Simple
            }
            DatasetKind::Import | DatasetKind::Export => Family::Trade,
        }
    }

    /// Value of the `opcao` query parameter selecting the kind's listing tab.
    pub fn listing_option(self) -> &'static str {
        match self {
            DatasetKind::Production => "opt_02",
            DatasetKind::Processing => "opt_03",
            DatasetKind::Commercialization => "opt_04",
            DatasetKind::Import => "opt_05",
            DatasetKind::Export => "opt_06",
        }
    }

    pub fn table_name(self) -> &'static str {
        self.slug()
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DatasetKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "producao" | "production" => Ok(DatasetKind::Production),
            "comercializacao" | "commercialization" => Ok(DatasetKind::Commercialization),
            "processamento" | "processing" => Ok(DatasetKind::Processing),
            "importacao" | "import" => Ok(DatasetKind::Import),
            "exportacao" | "export" => Ok(DatasetKind::Export),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}
