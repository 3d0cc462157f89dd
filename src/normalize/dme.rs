// src/normalize/dme.rs
//! Durable-equipment rates: one row per (code, modifiers), one column per state
//! and rural/non-rural flag. Reshaped to one row per (code, modifiers, state).
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use super::{normalize_modifier, parse_rate, Partitioned};
use crate::error::{FeeScheduleError, Result};
use crate::reader::clean_str;
use crate::table::{cell, RawTable, RejectedStateRate, StateRate};

/// Columns with no bearing on the rate itself.
pub const DME_ADMIN_COLUMNS: [&str; 5] = ["JURIS", "CATG", "Ceiling", "Floor", "Description"];

static NON_RURAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]{2})\s*\(NR\)$").expect("valid non-rural regex"));
static RURAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(R\)$").expect("valid rural regex"));

/// A retained non-rural column and the state it prices.
#[derive(Debug, Clone, PartialEq)]
struct StateColumn {
    index: usize,
    state: String,
}

/// Pick out the non-rural state columns, rejecting anything unrecognized.
fn state_columns(source_name: &str, raw: &RawTable, id_columns: &[usize]) -> Result<Vec<StateColumn>> {
    let mut admin = Vec::with_capacity(DME_ADMIN_COLUMNS.len());
    for name in DME_ADMIN_COLUMNS {
        admin.push(raw.require_column(source_name, name)?);
    }

    let mut columns = Vec::new();
    let mut rural = 0usize;
    for (index, header) in raw.headers.iter().enumerate() {
        if admin.contains(&index) || id_columns.contains(&index) {
            continue;
        }
        let name = clean_str(header);
        if RURAL.is_match(&name) {
            rural += 1;
            continue;
        }
        match NON_RURAL.captures(&name) {
            Some(caps) => columns.push(StateColumn {
                index,
                state: caps[1].to_ascii_uppercase(),
            }),
            None => {
                return Err(FeeScheduleError::UnexpectedColumn {
                    source_name: source_name.to_string(),
                    column: name,
                })
            }
        }
    }

    debug!(non_rural = columns.len(), rural, "selected DME state columns");
    Ok(columns)
}

/// Normalize the DME sheet into per-state rates, split by rate validity.
///
/// Every (row, non-rural state column) pair yields exactly one output row:
/// either a valid rate, a zero rate (counted, then dropped) or a rejected cell.
/// Cells of a row with no HCPCS code are always rejected.
/// Output is grouped by state column, then by source row.
#[instrument(level = "info", skip(raw), fields(rows = raw.len()))]
pub fn normalize_dme(
    source_name: &str,
    raw: &RawTable,
) -> Result<Partitioned<StateRate, RejectedStateRate>> {
    let cpt_ix = raw.require_column(source_name, "HCPCS")?;
    let mod1_ix = raw.require_column(source_name, "Mod")?;
    let mod2_ix = raw.require_column(source_name, "Mod2")?;
    let columns = state_columns(source_name, raw, &[cpt_ix, mod1_ix, mod2_ix])?;

    let keys: Vec<(String, Option<String>, Option<String>)> = raw
        .rows
        .iter()
        .map(|row| {
            (
                clean_str(cell(row, cpt_ix)),
                normalize_modifier(cell(row, mod1_ix)),
                normalize_modifier(cell(row, mod2_ix)),
            )
        })
        .collect();

    let mut out = Partitioned::default();
    let mut blank_codes = 0usize;
    for column in &columns {
        for (row, (cpt, mod1, mod2)) in raw.rows.iter().zip(&keys) {
            let raw_rate = cell(row, column.index);
            let rate = if cpt.is_empty() {
                blank_codes += 1;
                debug!(state = %column.state, raw_rate, "DME row without an HCPCS code");
                None
            } else {
                parse_rate(raw_rate)
            };
            match rate {
                Some(rate) if rate == 0.0 => out.zero_rated += 1,
                Some(rate) => out.valid.push(StateRate {
                    state: column.state.clone(),
                    cpt: cpt.clone(),
                    mod1: mod1.clone(),
                    mod2: mod2.clone(),
                    rate,
                }),
                None => {
                    debug!(state = %column.state, cpt = %cpt, raw_rate, "rejected DME rate");
                    out.rejected.push(RejectedStateRate {
                        cpt: cpt.clone(),
                        mod1: mod1.clone(),
                        mod2: mod2.clone(),
                        state: column.state.clone(),
                        raw_rate: raw_rate.to_string(),
                    });
                }
            }
        }
    }

    if blank_codes > 0 {
        warn!(blank_codes, "DME cells rejected for a missing HCPCS code");
    }
    if out.rejected.len() > blank_codes {
        warn!(
            rejected = out.rejected.len() - blank_codes,
            "DME rows with non-numeric rates"
        );
    }
    info!(
        states = columns.len(),
        valid = out.valid.len(),
        zero_rated = out.zero_rated,
        rejected = out.rejected.len(),
        "normalized DME sheet"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::init_test_logging;
    use anyhow::Result;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sample() -> RawTable {
        RawTable::new(
            strings(&[
                "HCPCS", "Mod", "Mod2", "JURIS", "CATG", "Ceiling", "Floor", "AL (NR)", "AL (R)",
                " VA (NR) ", "VA (R)", "Description",
            ]),
            vec![
                strings(&["A4216", "", " ", "D", "SU", "1", "0", "1.25", "1.40", "0.00", "1.10", "Water"]),
                strings(&["E0100", "NU", "", "D", "IN", "30", "20", "Not Separately Priced", "9", "22.75", "9", "Cane"]),
            ],
        )
    }

    #[test]
    fn reshapes_every_row_against_every_non_rural_state() -> Result<()> {
        init_test_logging();
        let raw = sample();
        let out = normalize_dme("DMEPOS.csv", &raw)?;

        // 2 rows x 2 non-rural columns
        assert_eq!(out.total(), 4);
        assert_eq!(out.zero_rated, 1);
        assert_eq!(
            out.valid,
            vec![
                StateRate {
                    state: "AL".into(),
                    cpt: "A4216".into(),
                    mod1: None,
                    mod2: None,
                    rate: 1.25,
                },
                StateRate {
                    state: "VA".into(),
                    cpt: "E0100".into(),
                    mod1: Some("NU".into()),
                    mod2: None,
                    rate: 22.75,
                },
            ]
        );
        assert_eq!(
            out.rejected,
            vec![RejectedStateRate {
                cpt: "E0100".into(),
                mod1: Some("NU".into()),
                mod2: None,
                state: "AL".into(),
                raw_rate: "Not Separately Priced".into(),
            }]
        );
        Ok(())
    }

    #[test]
    fn states_never_carry_the_suffix() -> Result<()> {
        let out = normalize_dme("DMEPOS.csv", &sample())?;
        for state in out.valid.iter().map(|r| &r.state).chain(out.rejected.iter().map(|r| &r.state)) {
            assert_eq!(state.len(), 2);
            assert!(!state.contains("NR"));
        }
        Ok(())
    }

    #[test]
    fn rows_without_a_code_go_to_the_error_table() -> Result<()> {
        let mut raw = sample();
        raw.rows[0][0] = " ".into();
        let out = normalize_dme("DMEPOS.csv", &raw)?;

        // both state cells of the codeless row, including the numeric 1.25
        let codeless: Vec<_> = out
            .rejected
            .iter()
            .filter(|r| r.cpt.is_empty())
            .map(|r| (r.state.as_str(), r.raw_rate.as_str()))
            .collect();
        assert_eq!(codeless, vec![("AL", "1.25"), ("VA", "0.00")]);
        assert!(out.valid.iter().all(|r| !r.cpt.is_empty()));
        assert_eq!(out.total(), 4);
        Ok(())
    }

    #[test]
    fn missing_admin_column_is_a_shape_error() {
        let mut raw = sample();
        raw.headers[3] = "JURISDICTION".into();
        assert!(matches!(
            normalize_dme("DMEPOS.csv", &raw),
            Err(FeeScheduleError::MissingColumn { .. })
        ));
    }

    #[test]
    fn unrecognized_column_is_rejected() {
        let mut raw = sample();
        raw.headers[7] = "Alabama".into();
        assert!(matches!(
            normalize_dme("DMEPOS.csv", &raw),
            Err(FeeScheduleError::UnexpectedColumn { .. })
        ));
    }
}
