//! Parser - Turns downloaded portal files into normalized records
//!
//! Responsibilities:
//! - Decode legacy single-byte text into a table of named columns
//! - Reshape one-column-per-year layouts into one record per year
//! - Coerce metrics and drop records that are not safe to persist
//!
//! Every step is pure and DETERMINISTIC: same bytes = same records, same order.

pub mod decode;
pub mod reshape;
pub mod sanitize;
pub mod table;

use common::{DatasetKind, NormalizedRecord, Result};

pub use decode::{decode_table, DecodePolicy, TextEncoding};
pub use reshape::{reshape, CandidateRecord, Identity};
pub use sanitize::sanitize;
pub use table::RawTable;

/// Counts from one parse, reported alongside the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub rows: usize,
    pub candidates: usize,
    pub kept: usize,
}

/// Decode, reshape and sanitize a downloaded file for `kind`.
pub fn parse_file(kind: DatasetKind, bytes: &[u8]) -> Result<(Vec<NormalizedRecord>, ParseStats)> {
    parse_with_policy(kind, bytes, DecodePolicy::for_kind(kind))
}

/// [`parse_file`] with an explicit decode policy.
pub fn parse_with_policy(
    kind: DatasetKind,
    bytes: &[u8],
    policy: DecodePolicy,
) -> Result<(Vec<NormalizedRecord>, ParseStats)> {
    let table = decode_table(bytes, policy)?;
    let candidates = reshape(kind, &table)?;
    let stats_candidates = candidates.len();
    let records = sanitize(candidates);

    let stats = ParseStats {
        rows: table.row_count(),
        candidates: stats_candidates,
        kept: records.len(),
    };
    Ok((records, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_production_latin1() {
        let bytes = b"id;control;produto;2020;2021\n\
                      1;VINHO DE MESA;VINHO DE MESA;100;200\n\
                      2;vm_Tinto;Tinto;50;\n";
        let (records, stats) = parse_file(DatasetKind::Production, bytes).unwrap();
        assert_eq!(stats, ParseStats { rows: 2, candidates: 4, kept: 3 });
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_parse_file_is_deterministic() {
        let bytes = b"Id\tPa\xeds\t2020\t2020\t2021\t2021\n1\tChile\t1\t2\t3\t4\n2\tPeru\t5\t6\t7\t8\n";
        let a = parse_file(DatasetKind::Import, bytes).unwrap();
        let b = parse_file(DatasetKind::Import, bytes).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.1.kept, 4);
    }

    #[test]
    fn test_parse_with_utf8_policy_strips_bom() {
        let bytes = "\u{feff}Id\tPaís\t2020\t2020\n1\tÁfrica do Sul\t3\t4\n".as_bytes();
        let policy = DecodePolicy::for_kind(DatasetKind::Import).with_encoding(TextEncoding::Utf8);
        let (records, _) = parse_with_policy(DatasetKind::Import, bytes, policy).unwrap();
        assert_eq!(
            records,
            vec![NormalizedRecord::Trade(common::TradeRecord {
                pais: "África do Sul".into(),
                ano: 2020,
                quantidade: 3.0,
                valor_usd: 4.0,
            })]
        );
    }

    #[test]
    fn test_utf8_file_read_as_latin1_is_mojibake_not_error() {
        let bytes = "Id\tPaís\t2020\t2020\n1\tÁfrica\t3\t4\n".as_bytes();
        let utf8 = DecodePolicy::TAB_LATIN1.with_encoding(TextEncoding::Utf8);

        let (as_latin1, _) = parse_file(DatasetKind::Import, bytes).unwrap();
        let (as_utf8, _) = parse_with_policy(DatasetKind::Import, bytes, utf8).unwrap();

        assert_eq!(as_latin1.len(), 1);
        assert_ne!(as_latin1, as_utf8);
    }

    #[test]
    fn test_parse_file_wrong_delimiter_is_schema_mismatch() {
        // A tab file read as semicolon-delimited has a single unparseable header.
        let bytes = b"id\tcontrol\tproduto\t2020\n1\tc\tp\t1\n";
        let err = parse_file(DatasetKind::Production, bytes).unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::SchemaMismatch);
    }
}
