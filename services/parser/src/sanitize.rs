//! Numeric coercion and validity filtering.
//!
//! Policy: a candidate is kept only if every required field coerces. Quantity is
//! always required, value only for trade rows. Anything unparseable or non-finite
//! drops that record alone; siblings from the same row survive. Input order is
//! preserved.

use common::{CultivarRecord, NormalizedRecord, ProductRecord, TradeRecord};
use tracing::debug;

use crate::reshape::{CandidateRecord, Identity};

/// Parses a metric cell; `None` for text, blanks, NaN and infinities.
pub fn parse_metric(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

fn parse_original_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Coerces one candidate, or `None` if it must be dropped.
pub fn sanitize_record(candidate: CandidateRecord) -> Option<NormalizedRecord> {
    let quantidade = parse_metric(&candidate.quantity)?;
    let ano = candidate.year;

    match candidate.identity {
        Identity::Product {
            id,
            control,
            produto,
        } => Some(NormalizedRecord::Product(ProductRecord {
            id: parse_original_id(&id)?,
            control,
            produto,
            ano,
            quantidade,
        })),
        Identity::Cultivar {
            id,
            control,
            cultivar,
        } => Some(NormalizedRecord::Cultivar(CultivarRecord {
            id: parse_original_id(&id)?,
            control,
            cultivar,
            ano,
            quantidade,
        })),
        Identity::Country(country) => {
            let pais = country.trim();
            if pais.is_empty() {
                return None;
            }
            let valor_usd = parse_metric(candidate.value.as_deref()?)?;
            Some(NormalizedRecord::Trade(TradeRecord {
                pais: pais.to_string(),
                ano,
                quantidade,
                valor_usd,
            }))
        }
    }
}

/// Keeps the candidates that are safe to persist, in input order.
pub fn sanitize(candidates: Vec<CandidateRecord>) -> Vec<NormalizedRecord> {
    let total = candidates.len();
    let records: Vec<NormalizedRecord> = candidates.into_iter().filter_map(sanitize_record).collect();
    debug!(kept = records.len(), dropped = total - records.len(), "sanitized candidates");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reshape::reshape;
    use crate::table::RawTable;
    use common::DatasetKind;

    fn product(id: &str, year: i32, qty: &str) -> CandidateRecord {
        CandidateRecord {
            identity: Identity::Product {
                id: id.into(),
                control: "C1".into(),
                produto: "Tinto".into(),
            },
            year,
            quantity: qty.into(),
            value: None,
        }
    }

    fn trade(country: &str, qty: &str, value: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            identity: Identity::Country(country.into()),
            year: 2019,
            quantity: qty.into(),
            value: value.map(String::from),
        }
    }

    // -------------------------------------------------------------------------
    // METRIC COERCION
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_metric() {
        assert_eq!(parse_metric("100"), Some(100.0));
        assert_eq!(parse_metric(" 12.5 "), Some(12.5));
        assert_eq!(parse_metric("-3"), Some(-3.0));
        assert_eq!(parse_metric("abc"), None);
        assert_eq!(parse_metric(""), None);
        assert_eq!(parse_metric("inf"), None);
        assert_eq!(parse_metric("-Infinity"), None);
        assert_eq!(parse_metric("NaN"), None);
    }

    // -------------------------------------------------------------------------
    // DROP POLICY
    // -------------------------------------------------------------------------

    #[test]
    fn test_bad_cell_drops_only_its_record() {
        let out = sanitize(vec![
            product("1", 2019, "10"),
            product("1", 2020, "abc"),
            product("1", 2021, "inf"),
            product("1", 2022, "30"),
        ]);
        let years: Vec<i32> = out.iter().map(|r| r.year()).collect();
        assert_eq!(years, vec![2019, 2022]);
    }

    #[test]
    fn test_unparseable_id_drops_record() {
        let out = sanitize(vec![product("", 2020, "1"), product("x1", 2020, "1")]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_trade_requires_value() {
        let out = sanitize(vec![
            trade("Chile", "50", Some("500")),
            trade("Peru", "50", Some("")),
            trade("Uruguai", "50", None),
            trade("Bolivia", "NaN", Some("1")),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0],
            NormalizedRecord::Trade(TradeRecord {
                pais: "Chile".into(),
                ano: 2019,
                quantidade: 50.0,
                valor_usd: 500.0
            })
        );
    }

    #[test]
    fn test_trade_country_is_trimmed_and_required() {
        let out = sanitize(vec![trade("  Chile ", "1", Some("2")), trade("  ", "1", Some("2"))]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].key(),
            common::RecordKey::Country {
                country: "Chile".into(),
                year: 2019
            }
        );
    }

    // -------------------------------------------------------------------------
    // END-TO-END SCENARIOS (reshape + sanitize)
    // -------------------------------------------------------------------------

    #[test]
    fn test_melt_scenario_drops_non_numeric_year() {
        let table = RawTable::new(
            vec!["id", "control", "produto", "2020", "2021"]
                .into_iter()
                .map(String::from)
                .collect(),
            vec![vec!["1", "C1", "Tinto", "100", "abc"]
                .into_iter()
                .map(String::from)
                .collect()],
        );
        let out = sanitize(reshape(DatasetKind::Production, &table).unwrap());
        assert_eq!(
            out,
            vec![NormalizedRecord::Product(ProductRecord {
                id: 1,
                control: "C1".into(),
                produto: "Tinto".into(),
                ano: 2020,
                quantidade: 100.0
            })]
        );
    }

    #[test]
    fn test_paired_scenario_skips_trailing_column() {
        let table = RawTable::new(
            vec!["idx", "pais", "2019_qtd", "2019_val", "2020_qtd"]
                .into_iter()
                .map(String::from)
                .collect(),
            vec![vec!["0", "Chile", "50", "500"]
                .into_iter()
                .map(String::from)
                .collect()],
        );
        let out = sanitize(reshape(DatasetKind::Export, &table).unwrap());
        assert_eq!(
            out,
            vec![NormalizedRecord::Trade(TradeRecord {
                pais: "Chile".into(),
                ano: 2019,
                quantidade: 50.0,
                valor_usd: 500.0
            })]
        );
    }
}
