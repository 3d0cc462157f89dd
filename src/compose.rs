// src/compose.rs
//! Builds one priced fee schedule from the canonical tables.
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

use crate::error::{FeeScheduleError, Result};
use crate::selector::RateType;
use crate::store::{write_table, CanonicalStore};
use crate::table::{FeeScheduleRow, NationalRate, PhysicianRate, StateRate};

/// Percentage that leaves rates as they are.
pub const DEFAULT_PERCENTAGE: u32 = 100;

/// The three normalized inputs to composition.
#[derive(Debug, Clone, Default)]
pub struct CanonicalTables {
    pub physician: Vec<PhysicianRate>,
    pub dme: Vec<StateRate>,
    pub injectables: Vec<NationalRate>,
}

impl CanonicalTables {
    pub fn load(store: &CanonicalStore) -> Result<Self> {
        Ok(Self {
            physician: store.read_physician()?,
            dme: store.read_dme()?,
            injectables: store.read_injectables()?,
        })
    }
}

/// Everything the operator chooses for one schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeScheduleRequest {
    pub state: String,
    pub locality: u32,
    pub rate_type: RateType,
    pub percentage: u32,
    pub schedule_number: String,
    pub year: i32,
}

/// A composed schedule, its file name, and how many rows each source contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    pub file_name: String,
    pub rows: Vec<FeeScheduleRow>,
    pub physician_rows: usize,
    pub dme_rows: usize,
    pub injectable_rows: usize,
    /// Physician rows dropped because the selected rate was not numeric.
    pub unpriced_physician_rows: usize,
}

/// How rates are rescaled for a given percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scaling {
    Unchanged,
    Factor(f64),
}

impl Scaling {
    pub fn for_percentage(percentage: u32) -> Self {
        if percentage == DEFAULT_PERCENTAGE {
            Self::Unchanged
        } else {
            Self::Factor(f64::from(percentage) / 100.0)
        }
    }

    pub fn apply(self, rate: f64) -> f64 {
        match self {
            Self::Unchanged => round6(rate),
            Self::Factor(factor) => round6(rate * factor),
        }
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Distinct localities observed for `state`, ascending.
pub fn localities_for_state(physician: &[PhysicianRate], state: &str) -> BTreeSet<u32> {
    physician
        .iter()
        .filter(|r| r.state == state)
        .map(|r| r.locality)
        .collect()
}

pub fn is_valid_locality(physician: &[PhysicianRate], state: &str, locality: u32) -> bool {
    physician
        .iter()
        .any(|r| r.state == state && r.locality == locality)
}

/// `FS_<number>_<STATE>_<locality:02>_<percentage>perc_<YYYY>.csv`
pub fn output_file_name(
    schedule_number: &str,
    state: &str,
    locality: u32,
    percentage: u32,
    year: i32,
) -> String {
    format!("FS_{schedule_number}_{state}_{locality:02}_{percentage}perc_{year:04}.csv")
}

fn schedule_row(cpt: &str, mod1: &Option<String>, mod2: &Option<String>, rate: f64) -> FeeScheduleRow {
    FeeScheduleRow {
        cpt: cpt.to_string(),
        mod1: mod1.clone(),
        mod2: mod2.clone(),
        mod3: None,
        mod4: None,
        rate,
    }
}

/// Filter, select, merge and rescale the canonical tables into one schedule.
///
/// Rows come out as physician, then DME, then injectables, each in input order.
#[instrument(level = "info", skip(tables, request), fields(
    state = %request.state,
    locality = request.locality,
    rate_type = %request.rate_type,
    percentage = request.percentage
))]
pub fn compose(tables: &CanonicalTables, request: &FeeScheduleRequest) -> Result<FeeSchedule> {
    let state = request.state.as_str();

    let localities = localities_for_state(&tables.physician, state);
    let dme: Vec<&StateRate> = tables.dme.iter().filter(|r| r.state == state).collect();
    if localities.is_empty() && dme.is_empty() {
        return Err(FeeScheduleError::UnknownState(state.to_string()));
    }
    if !localities.contains(&request.locality) {
        return Err(FeeScheduleError::UnknownLocality {
            state: state.to_string(),
            locality: request.locality,
            available: localities.into_iter().collect(),
        });
    }

    let scaling = Scaling::for_percentage(request.percentage);
    let mut rows = Vec::new();

    let mut unpriced = 0usize;
    for r in tables
        .physician
        .iter()
        .filter(|r| r.state == state && r.locality == request.locality)
    {
        let selected = match request.rate_type {
            RateType::Physician => r.physician_rate,
            RateType::Facility => r.facility_rate,
        };
        match selected {
            Some(rate) => rows.push(schedule_row(&r.cpt, &r.mod1, &r.mod2, scaling.apply(rate))),
            None => unpriced += 1,
        }
    }
    let physician_rows = rows.len();
    if unpriced > 0 {
        warn!(unpriced, "physician rows without a numeric {} rate", request.rate_type);
    }

    for r in &dme {
        rows.push(schedule_row(&r.cpt, &r.mod1, &r.mod2, scaling.apply(r.rate)));
    }

    for r in &tables.injectables {
        rows.push(schedule_row(&r.cpt, &r.mod1, &r.mod2, scaling.apply(r.rate)));
    }

    let schedule = FeeSchedule {
        file_name: output_file_name(
            &request.schedule_number,
            state,
            request.locality,
            request.percentage,
            request.year,
        ),
        rows,
        physician_rows,
        dme_rows: dme.len(),
        injectable_rows: tables.injectables.len(),
        unpriced_physician_rows: unpriced,
    };
    info!(
        file = %schedule.file_name,
        physician = schedule.physician_rows,
        dme = schedule.dme_rows,
        injectables = schedule.injectable_rows,
        "composed fee schedule"
    );
    Ok(schedule)
}

/// Write the schedule to `<out_dir>/<file_name>`, creating `out_dir` if needed.
pub fn write_fee_schedule(out_dir: &Path, schedule: &FeeSchedule) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(&schedule.file_name);
    write_table(&path, &schedule.rows)?;
    Ok(path)
}
