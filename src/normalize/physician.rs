// src/normalize/physician.rs
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument};

use super::{normalize_modifier, parse_rate};
use crate::error::{FeeScheduleError, Result};
use crate::reader::{clean_str, read_headerless, source_name};
use crate::table::{cell, PhysicianRate, RawTable};

/// Positional layout of a physician rate file, named so columns are picked by name.
pub const PHYSICIAN_FIELDS: [&str; 18] = [
    "Year",
    "Carrier Number",
    "LOCALITY",
    "CPT",
    "MOD1",
    "PHYSICIANS-RATES",
    "FACILITY-RATES",
    "Filler",
    "PCTC Indicator",
    "Status Code",
    "Multiple Surgery Indicator",
    "50% Therapy Reduction Amount",
    "OPPS Indicator",
    "OPPS Non Facility Fee Amount",
    "TRAILER RECORD",
    "Trailer Indicator",
    "MOD2",
    "STATE",
];

/// Physician files that were read, plus the ones that failed their shape check.
#[derive(Debug, Default)]
pub struct PhysicianIngest {
    pub records: Vec<PhysicianRate>,
    pub failures: Vec<(PathBuf, FeeScheduleError)>,
}

/// Two-letter state taken from characters 2..4 of the file stem, e.g. `PFVA11.txt` → `VA`.
pub fn state_from_source(source_name: &str) -> Result<String> {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let state: String = stem.chars().skip(2).take(2).collect();
    if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(FeeScheduleError::shape(
            source_name,
            format!("cannot derive a state code from file stem {stem:?}"),
        ));
    }
    Ok(state.to_ascii_uppercase())
}

/// Normalize one physician file already split into rows (footer removed).
#[instrument(level = "info", skip(raw), fields(rows = raw.len()))]
pub fn normalize_physician_table(source_name: &str, raw: &RawTable) -> Result<Vec<PhysicianRate>> {
    let state = state_from_source(source_name)?;

    if let Some((idx, row)) = raw
        .rows
        .iter()
        .enumerate()
        .find(|(_, r)| r.len() != PHYSICIAN_FIELDS.len())
    {
        return Err(FeeScheduleError::shape(
            source_name,
            format!(
                "row {idx} has {} fields, expected {}",
                row.len(),
                PHYSICIAN_FIELDS.len()
            ),
        ));
    }

    let layout = RawTable::new(
        PHYSICIAN_FIELDS.iter().map(|f| f.to_string()).collect(),
        Vec::new(),
    );
    let locality_ix = layout.require_column(source_name, "LOCALITY")?;
    let cpt_ix = layout.require_column(source_name, "CPT")?;
    let phys_ix = layout.require_column(source_name, "PHYSICIANS-RATES")?;
    let fac_ix = layout.require_column(source_name, "FACILITY-RATES")?;
    let mod1_ix = layout.require_column(source_name, "MOD1")?;
    let mod2_ix = layout.require_column(source_name, "MOD2")?;

    let mut out = Vec::with_capacity(raw.len());
    let mut unpriced = 0usize;
    for (idx, row) in raw.rows.iter().enumerate() {
        let locality_raw = clean_str(cell(row, locality_ix));
        let locality: u32 = locality_raw.parse().map_err(|_| {
            FeeScheduleError::shape(
                source_name,
                format!("row {idx}: locality {locality_raw:?} is not an integer"),
            )
        })?;
        let cpt = clean_str(cell(row, cpt_ix));
        if cpt.is_empty() {
            return Err(FeeScheduleError::shape(
                source_name,
                format!("row {idx}: empty CPT code"),
            ));
        }

        let physician_rate = parse_rate(cell(row, phys_ix));
        let facility_rate = parse_rate(cell(row, fac_ix));
        if physician_rate.is_none() || facility_rate.is_none() {
            unpriced += 1;
            debug!(row = idx, cpt = %cpt, "non-numeric physician or facility rate");
        }

        out.push(PhysicianRate {
            locality,
            cpt,
            physician_rate,
            facility_rate,
            mod1: normalize_modifier(cell(row, mod1_ix)),
            mod2: normalize_modifier(cell(row, mod2_ix)),
            // the file name wins over the STATE field carried in the row
            state: state.clone(),
        });
    }

    info!(state = %state, rows = out.len(), unpriced, "normalized physician file");
    Ok(out)
}

/// Read and normalize every physician file, concatenated in the order given.
///
/// A file with the wrong shape is logged and recorded in `failures`; the
/// remaining files are still processed.
pub fn normalize_physician_files(paths: &[PathBuf], footer_lines: usize) -> PhysicianIngest {
    let mut ingest = PhysicianIngest::default();

    for path in paths {
        let name = source_name(path);

        let result = read_headerless(path, footer_lines)
            .and_then(|raw| normalize_physician_table(&name, &raw));
        match result {
            Ok(records) => ingest.records.extend(records),
            Err(e) => {
                error!("physician file {} failed: {}", path.display(), e);
                ingest.failures.push((path.clone(), e));
            }
        }
    }

    ingest
}
