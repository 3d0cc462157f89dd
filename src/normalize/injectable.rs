// src/normalize/injectable.rs
use tracing::{debug, info, instrument, warn};

use super::{parse_rate, Partitioned};
use crate::error::Result;
use crate::reader::clean_str;
use crate::table::{cell, NationalRate, RawTable, RejectedNationalRate};

/// Header names imposed on the injectable payment-limit sheet.
pub const INJECTABLE_COLUMNS: [&str; 11] = [
    "HCPCS Code",
    "Short Description",
    "HCPCS Code Dosage",
    "Payment Limit",
    "Co-insurance Percentage",
    "Vaccine AWP%",
    "Vaccine Limit",
    "Blood AWP%",
    "Blood limit",
    "Clotting Factor",
    "Notes",
];

/// Normalize the injectable sheet into nationwide rates, split by rate validity.
/// Injectables carry no modifiers, so MOD1/MOD2 are always absent. A row with
/// no HCPCS code is rejected whatever its rate.
#[instrument(level = "info", skip(raw), fields(rows = raw.len()))]
pub fn normalize_injectables(
    source_name: &str,
    raw: &RawTable,
) -> Result<Partitioned<NationalRate, RejectedNationalRate>> {
    let cpt_ix = raw.require_column(source_name, "HCPCS Code")?;
    let rate_ix = raw.require_column(source_name, "Payment Limit")?;

    let mut out = Partitioned::default();
    let mut blank_codes = 0usize;
    for row in &raw.rows {
        let cpt = clean_str(cell(row, cpt_ix));
        let raw_rate = cell(row, rate_ix);
        if cpt.is_empty() {
            blank_codes += 1;
            debug!(raw_rate, "injectable row without an HCPCS code");
            out.rejected.push(RejectedNationalRate {
                cpt,
                raw_rate: raw_rate.to_string(),
                mod1: None,
                mod2: None,
            });
            continue;
        }
        match parse_rate(raw_rate) {
            Some(rate) if rate == 0.0 => out.zero_rated += 1,
            Some(rate) => out.valid.push(NationalRate {
                cpt,
                mod1: None,
                mod2: None,
                rate,
            }),
            None => {
                debug!(cpt = %cpt, raw_rate, "rejected injectable rate");
                out.rejected.push(RejectedNationalRate {
                    cpt,
                    raw_rate: raw_rate.to_string(),
                    mod1: None,
                    mod2: None,
                });
            }
        }
    }

    if blank_codes > 0 {
        warn!(blank_codes, "injectable rows without an HCPCS code");
    }
    if out.rejected.len() > blank_codes {
        warn!(
            rejected = out.rejected.len() - blank_codes,
            "injectable rows with non-numeric rates"
        );
    }
    info!(
        valid = out.valid.len(),
        zero_rated = out.zero_rated,
        rejected = out.rejected.len(),
        "normalized injectable sheet"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeeScheduleError;
    use crate::normalize::init_test_logging;
    use anyhow::Result;

    fn row(code: &str, limit: &str) -> Vec<String> {
        let mut cells = vec![String::new(); INJECTABLE_COLUMNS.len()];
        cells[0] = code.to_string();
        cells[1] = "Injection".to_string();
        cells[3] = limit.to_string();
        cells
    }

    #[test]
    fn partitions_and_drops_zero_rates() -> Result<()> {
        init_test_logging();
        let raw = RawTable::new(
            INJECTABLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            vec![
                row("J0129", "22.512"),
                row("J0131", "0"),
                row("J0132", "see notes"),
                row("J0133", ""),
                row("J0135", " 1.005 "),
            ],
        );

        let out = normalize_injectables("asp.csv", &raw)?;
        assert_eq!(out.total(), raw.len());
        assert_eq!(out.zero_rated, 1);
        assert_eq!(
            out.valid,
            vec![
                NationalRate { cpt: "J0129".into(), mod1: None, mod2: None, rate: 22.512 },
                NationalRate { cpt: "J0135".into(), mod1: None, mod2: None, rate: 1.005 },
            ]
        );
        let rejected: Vec<_> = out.rejected.iter().map(|r| (r.cpt.as_str(), r.raw_rate.as_str())).collect();
        assert_eq!(rejected, vec![("J0132", "see notes"), ("J0133", "")]);
        assert!(out.rejected.iter().all(|r| r.mod1.is_none() && r.mod2.is_none()));
        Ok(())
    }

    #[test]
    fn rows_without_a_code_go_to_the_error_table() -> Result<()> {
        let raw = RawTable::new(
            INJECTABLE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            vec![row("J0129", "22.512"), row("  ", "4.5")],
        );

        let out = normalize_injectables("asp.csv", &raw)?;
        assert_eq!(out.valid.len(), 1);
        assert_eq!(
            out.rejected,
            vec![RejectedNationalRate {
                cpt: String::new(),
                raw_rate: "4.5".into(),
                mod1: None,
                mod2: None,
            }]
        );
        assert_eq!(out.total(), raw.len());
        Ok(())
    }

    #[test]
    fn payment_limit_column_is_required() {
        let raw = RawTable::new(vec!["HCPCS Code".into()], vec![]);
        assert!(matches!(
            normalize_injectables("asp.csv", &raw),
            Err(FeeScheduleError::MissingColumn { .. })
        ));
    }
}
