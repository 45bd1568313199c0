//! Tabular decoding of downloaded files.
//!
//! The portal exports single-byte legacy text. Semicolon-delimited files carry the
//! melt-shaped datasets, tab-delimited files the import/export ones.

use common::{DatasetKind, Family, IngestError, Result};
use std::borrow::Cow;
use tracing::debug;

use crate::table::RawTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
    Windows1252,
    Utf8,
}

impl std::str::FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "windows-1252" | "cp1252" => Ok(TextEncoding::Windows1252),
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            other => Err(format!(
                "unknown encoding '{}' (expected latin1, windows-1252 or utf-8)",
                other
            )),
        }
    }
}

/// Encoding and delimiter used for one dataset family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodePolicy {
    pub encoding: TextEncoding,
    pub delimiter: u8,
}

impl DecodePolicy {
    pub const SEMICOLON_LATIN1: DecodePolicy = DecodePolicy {
        encoding: TextEncoding::Latin1,
        delimiter: b';',
    };

    pub const TAB_LATIN1: DecodePolicy = DecodePolicy {
        encoding: TextEncoding::Latin1,
        delimiter: b'\t',
    };

    pub fn for_kind(kind: DatasetKind) -> Self {
        match kind.family() {
            Family::Simple => Self::SEMICOLON_LATIN1,
            Family::Trade => Self::TAB_LATIN1,
        }
    }

    /// Same delimiter, different encoding; for files re-saved outside the portal.
    pub fn with_encoding(self, encoding: TextEncoding) -> Self {
        Self { encoding, ..self }
    }
}

/// Decodes bytes under `encoding` without ever substituting replacement characters.
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<Cow<'_, str>> {
    match encoding {
        TextEncoding::Latin1 => Ok(encoding_rs::mem::decode_latin1(bytes)),
        TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| IngestError::Decode("malformed windows-1252 input".to_string())),
        TextEncoding::Utf8 => {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                IngestError::Decode(format!("invalid UTF-8 at byte {}", e.valid_up_to()))
            })?;
            Ok(Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)))
        }
    }
}

/// Decodes a delimited file into a [`RawTable`] with trimmed column names.
pub fn decode_table(bytes: &[u8], policy: DecodePolicy) -> Result<RawTable> {
    let text = decode_text(bytes, policy.encoding)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(policy.delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::Decode(format!("failed to read header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if columns.iter().all(|c| c.is_empty()) {
        return Err(IngestError::Decode("file has no columns".to_string()));
    }

    let mut rows = Vec::new();
    for (line_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            IngestError::Decode(format!("line {}: {}", line_idx + 2, e))
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(
        columns = columns.len(),
        rows = rows.len(),
        delimiter = %(policy.delimiter as char).escape_default(),
        "decoded table"
    );

    Ok(RawTable::new(columns, rows))
}
