// src/table.rs
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{FeeScheduleError, Result};

/// A source table as handed over by a reader: named columns, string cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names, either from the file's header row or supplied by the caller.
    pub headers: Vec<String>,
    /// Each data row, one String per field, in file order.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Position of the column whose trimmed name equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Like [`column_index`](Self::column_index), but a missing column is an error.
    pub fn require_column(&self, source_name: &str, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| FeeScheduleError::MissingColumn {
                source_name: source_name.to_string(),
                column: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Cell lookup that tolerates short rows.
pub(crate) fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Rates are written in plain decimal form (`0.000001`, never `1e-6`), with
/// whole numbers keeping a trailing `.0`.
pub fn format_rate(rate: f64) -> String {
    let text = rate.to_string();
    if !rate.is_finite() || text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn serialize_rate<S: Serializer>(rate: &f64, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format_rate(*rate))
}

fn serialize_optional_rate<S: Serializer>(
    rate: &Option<f64>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match rate {
        Some(rate) => s.serialize_str(&format_rate(*rate)),
        None => s.serialize_none(),
    }
}

/// A persisted row type and its header, in serialization order.
///
/// The header is written explicitly so that empty tables still carry one.
pub trait TableRow: Serialize {
    const COLUMNS: &'static [&'static str];
}

/// Canonical physician row. Carries both rate variants until one is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicianRate {
    #[serde(rename = "LOCALITY")]
    pub locality: u32,
    #[serde(rename = "CPT")]
    pub cpt: String,
    #[serde(rename = "PHYSICIANS-RATES", serialize_with = "serialize_optional_rate")]
    pub physician_rate: Option<f64>,
    #[serde(rename = "FACILITY-RATES", serialize_with = "serialize_optional_rate")]
    pub facility_rate: Option<f64>,
    #[serde(rename = "MOD1")]
    pub mod1: Option<String>,
    #[serde(rename = "MOD2")]
    pub mod2: Option<String>,
    #[serde(rename = "STATE")]
    pub state: String,
}

/// Canonical DME row: one (code, modifiers) rate for one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRate {
    #[serde(rename = "STATE")]
    pub state: String,
    #[serde(rename = "CPT")]
    pub cpt: String,
    #[serde(rename = "MOD1")]
    pub mod1: Option<String>,
    #[serde(rename = "MOD2")]
    pub mod2: Option<String>,
    #[serde(rename = "RATES", serialize_with = "serialize_rate")]
    pub rate: f64,
}

/// Canonical injectable row. Nationwide, so there is no state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalRate {
    #[serde(rename = "CPT")]
    pub cpt: String,
    #[serde(rename = "MOD1")]
    pub mod1: Option<String>,
    #[serde(rename = "MOD2")]
    pub mod2: Option<String>,
    #[serde(rename = "RATES", serialize_with = "serialize_rate")]
    pub rate: f64,
}

/// A reshaped DME row whose rate cell did not parse; kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedStateRate {
    #[serde(rename = "CPT")]
    pub cpt: String,
    #[serde(rename = "MOD1")]
    pub mod1: Option<String>,
    #[serde(rename = "MOD2")]
    pub mod2: Option<String>,
    #[serde(rename = "STATE")]
    pub state: String,
    #[serde(rename = "RATES")]
    pub raw_rate: String,
}

/// An injectable row whose payment limit did not parse; kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedNationalRate {
    #[serde(rename = "CPT")]
    pub cpt: String,
    #[serde(rename = "RATES")]
    pub raw_rate: String,
    #[serde(rename = "MOD1")]
    pub mod1: Option<String>,
    #[serde(rename = "MOD2")]
    pub mod2: Option<String>,
}

/// One line of the final fee schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeScheduleRow {
    #[serde(rename = "CPT")]
    pub cpt: String,
    #[serde(rename = "MOD1")]
    pub mod1: Option<String>,
    #[serde(rename = "MOD2")]
    pub mod2: Option<String>,
    #[serde(rename = "MOD3")]
    pub mod3: Option<String>,
    #[serde(rename = "MOD4")]
    pub mod4: Option<String>,
    #[serde(rename = "RATES", serialize_with = "serialize_rate")]
    pub rate: f64,
}

impl TableRow for PhysicianRate {
    const COLUMNS: &'static [&'static str] = &[
        "LOCALITY",
        "CPT",
        "PHYSICIANS-RATES",
        "FACILITY-RATES",
        "MOD1",
        "MOD2",
        "STATE",
    ];
}

impl TableRow for StateRate {
    const COLUMNS: &'static [&'static str] = &["STATE", "CPT", "MOD1", "MOD2", "RATES"];
}

impl TableRow for NationalRate {
    const COLUMNS: &'static [&'static str] = &["CPT", "MOD1", "MOD2", "RATES"];
}

impl TableRow for RejectedStateRate {
    const COLUMNS: &'static [&'static str] = &["CPT", "MOD1", "MOD2", "STATE", "RATES"];
}

impl TableRow for RejectedNationalRate {
    const COLUMNS: &'static [&'static str] = &["CPT", "RATES", "MOD1", "MOD2"];
}

impl TableRow for FeeScheduleRow {
    const COLUMNS: &'static [&'static str] = &["CPT", "MOD1", "MOD2", "MOD3", "MOD4", "RATES"];
}
