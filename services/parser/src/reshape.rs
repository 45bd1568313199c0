//! Wide-to-long reshaping.
//!
//! The portal publishes one column per year (or one column pair per year for
//! import/export). Both strategies emit exactly one candidate per
//! (input row, year column or pair), year-major, with no deduplication; cells
//! stay as raw text until the sanitizer coerces them.
//!
//! A header that cannot be read as a year, or a missing identity column, is a
//! structural problem and fails the whole file.

use common::{DatasetKind, IngestError, Result, MAX_YEAR, MIN_YEAR};
use tracing::debug;

use crate::table::RawTable;

pub const ID_COLUMN: &str = "id";
pub const CONTROL_COLUMN: &str = "control";
/// Accepted spellings of the product header, in preference order.
pub const PRODUCT_COLUMNS: &[&str] = &["produto", "Produto"];
pub const CULTIVAR_COLUMN: &str = "cultivar";

/// Offset of the first quantity column in paired-year tables.
const FIRST_PAIR_OFFSET: usize = 2;
const COUNTRY_COLUMN_INDEX: usize = 1;

/// Who a candidate row describes, copied verbatim from the identity cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Product {
        id: String,
        control: String,
        produto: String,
    },
    Cultivar {
        id: String,
        control: String,
        cultivar: String,
    },
    Country(String),
}

/// One (row, year) cell pair before numeric coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub identity: Identity,
    pub year: i32,
    pub quantity: String,
    /// Monetary value; present only for import/export.
    pub value: Option<String>,
}

/// Which name column a melt-shaped table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameColumn {
    /// Chosen from [`PRODUCT_COLUMNS`]; absence fails the file.
    Product,
    /// Always [`CULTIVAR_COLUMN`].
    Cultivar,
}

/// Reads a year from the leading digits of a header (`"2019_qtd"` → 2019).
pub fn parse_year_header(header: &str) -> Result<i32> {
    let trimmed = header.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(IngestError::SchemaMismatch(format!(
            "column '{}' is not a year",
            header
        )));
    }

    let year: i32 = digits.parse().map_err(|_| {
        IngestError::SchemaMismatch(format!("column '{}' is not a year", header))
    })?;

    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(IngestError::SchemaMismatch(format!(
            "column '{}' is outside {}-{}",
            header, MIN_YEAR, MAX_YEAR
        )));
    }
    Ok(year)
}

/// Reshapes `table` with the strategy `kind` calls for.
pub fn reshape(kind: DatasetKind, table: &RawTable) -> Result<Vec<CandidateRecord>> {
    match kind {
        DatasetKind::Production | DatasetKind::Commercialization => {
            melt(table, NameColumn::Product)
        }
        DatasetKind::Processing => melt(table, NameColumn::Cultivar),
        DatasetKind::Import | DatasetKind::Export => paired_years(table),
    }
}

fn require_column(table: &RawTable, name: &str) -> Result<usize> {
    table
        .find_column(&[name])
        .map(|(idx, _)| idx)
        .ok_or_else(|| IngestError::SchemaMismatch(format!("missing '{}' column", name)))
}

/// Melt strategy: identity columns are copied, every other column is a year.
pub fn melt(table: &RawTable, name_column: NameColumn) -> Result<Vec<CandidateRecord>> {
    let id_col = require_column(table, ID_COLUMN)?;
    let control_col = require_column(table, CONTROL_COLUMN)?;
    let name_col = match name_column {
        NameColumn::Product => table
            .find_column(PRODUCT_COLUMNS)
            .map(|(idx, _)| idx)
            .ok_or_else(|| {
                IngestError::SchemaMismatch(format!(
                    "no product column found (expected one of {:?})",
                    PRODUCT_COLUMNS
                ))
            })?,
        NameColumn::Cultivar => require_column(table, CULTIVAR_COLUMN)?,
    };

    let identity_cols = [id_col, control_col, name_col];
    let year_cols = table
        .columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| !identity_cols.contains(idx))
        .map(|(idx, header)| parse_year_header(header).map(|year| (idx, year)))
        .collect::<Result<Vec<_>>>()?;

    let mut candidates = Vec::with_capacity(table.row_count() * year_cols.len());
    for &(col, year) in &year_cols {
        for row in 0..table.row_count() {
            let id = table.cell(row, id_col).to_string();
            let control = table.cell(row, control_col).to_string();
            let name = table.cell(row, name_col).to_string();
            let identity = match name_column {
                NameColumn::Product => Identity::Product {
                    id,
                    control,
                    produto: name,
                },
                NameColumn::Cultivar => Identity::Cultivar {
                    id,
                    control,
                    cultivar: name,
                },
            };

            candidates.push(CandidateRecord {
                identity,
                year,
                quantity: table.cell(row, col).to_string(),
                value: None,
            });
        }
    }

    debug!(
        rows = table.row_count(),
        years = year_cols.len(),
        candidates = candidates.len(),
        "melted table"
    );
    Ok(candidates)
}

/// Paired-year strategy: `[index, country, q1, v1, q2, v2, ...]`.
///
/// A trailing quantity column without its value column is skipped.
pub fn paired_years(table: &RawTable) -> Result<Vec<CandidateRecord>> {
    let n = table.column_count();
    if n < FIRST_PAIR_OFFSET {
        return Err(IngestError::SchemaMismatch(format!(
            "expected index and country columns, found {} column(s)",
            n
        )));
    }

    let mut pairs = Vec::new();
    let mut col = FIRST_PAIR_OFFSET;
    while col + 1 < n {
        pairs.push((col, parse_year_header(&table.columns[col])?));
        col += 2;
    }
    if col < n {
        debug!(column = %table.columns[col], "skipping unpaired trailing column");
    }

    let mut candidates = Vec::with_capacity(table.row_count() * pairs.len());
    for &(qty_col, year) in &pairs {
        for row in 0..table.row_count() {
            candidates.push(CandidateRecord {
                identity: Identity::Country(table.cell(row, COUNTRY_COLUMN_INDEX).to_string()),
                year,
                quantity: table.cell(row, qty_col).to_string(),
                value: Some(table.cell(row, qty_col + 1).to_string()),
            });
        }
    }

    debug!(
        rows = table.row_count(),
        pairs = pairs.len(),
        candidates = candidates.len(),
        "reshaped paired-year table"
    );
    Ok(candidates)
}
