// src/normalize/mod.rs
//! Per-source normalizers. Each turns one source layout into canonical rows.
pub mod dme;
pub mod injectable;
pub mod physician;

use glob::glob;
use std::path::PathBuf;
use tracing::{info, warn};

pub use dme::{normalize_dme, DME_ADMIN_COLUMNS};
pub use injectable::{normalize_injectables, INJECTABLE_COLUMNS};
pub use physician::{
    normalize_physician_files, normalize_physician_table, state_from_source, PhysicianIngest,
    PHYSICIAN_FIELDS,
};

use crate::config::Config;
use crate::error::{FeeScheduleError, Result};
use crate::reader::{read_sheet, source_name};
use crate::store::CanonicalStore;

/// Outcome of a numeric-validity split over one source.
///
/// `valid` already excludes zero-rated rows; `zero_rated` counts them so that
/// `valid.len() + zero_rated + rejected.len()` equals the number of input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Partitioned<V, E> {
    pub valid: Vec<V>,
    pub rejected: Vec<E>,
    pub zero_rated: usize,
}

impl<V, E> Default for Partitioned<V, E> {
    fn default() -> Self {
        Self {
            valid: Vec::new(),
            rejected: Vec::new(),
            zero_rated: 0,
        }
    }
}

impl<V, E> Partitioned<V, E> {
    /// Rows seen before the zero-rate filter.
    pub fn total(&self) -> usize {
        self.valid.len() + self.zero_rated + self.rejected.len()
    }
}

/// Parse a rate cell. Anything that is not a finite number is `None`.
pub fn parse_rate(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Blank or whitespace-only modifiers are absent, never `""`.
pub fn normalize_modifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Physician files matching the configured pattern, in sorted order.
pub fn discover_physician_files(config: &Config) -> Result<Vec<PathBuf>> {
    let pattern = config.physician_glob();
    let entries = glob(&pattern).map_err(|e| {
        FeeScheduleError::shape(&pattern, format!("bad physician file pattern: {e}"))
    })?;
    let mut paths: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
    paths.sort();
    Ok(paths)
}

/// Run all three normalizers and persist their tables.
///
/// Physician files that fail their shape check are returned rather than
/// aborting the run; a DME or injectable failure aborts it.
pub fn run_normalization(
    config: &Config,
    store: &CanonicalStore,
) -> Result<Vec<(PathBuf, FeeScheduleError)>> {
    info!("loading physician files");
    let physician_files = discover_physician_files(config)?;
    if physician_files.is_empty() {
        warn!(pattern = %config.physician_glob(), "no physician files found");
    }
    let ingest = normalize_physician_files(&physician_files, config.physician_footer_lines);
    store.write_physician(&ingest.records)?;

    info!("loading DME file");
    let dme_raw = read_sheet(&config.dme_file, config.dme_skip_rows, None)?;
    let dme = normalize_dme(&source_name(&config.dme_file), &dme_raw)?;
    store.write_dme(&dme.valid, &dme.rejected)?;

    info!("loading injectables file");
    let injectable_raw = read_sheet(
        &config.injectable_file,
        config.injectable_skip_rows,
        Some(&INJECTABLE_COLUMNS[..]),
    )?;
    let injectables =
        normalize_injectables(&source_name(&config.injectable_file), &injectable_raw)?;
    store.write_injectables(&injectables.valid, &injectables.rejected)?;

    Ok(ingest.failures)
}

#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,feesched=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rate_accepts_only_finite_numbers() {
        assert_eq!(parse_rate(" 0000050.00 "), Some(50.0));
        assert_eq!(parse_rate("1e2"), Some(100.0));
        assert_eq!(parse_rate("-3.5"), Some(-3.5));
        assert_eq!(parse_rate(""), None);
        assert_eq!(parse_rate("   "), None);
        assert_eq!(parse_rate("N/A"), None);
        assert_eq!(parse_rate("NaN"), None);
        assert_eq!(parse_rate("inf"), None);
        assert_eq!(parse_rate("$12.00"), None);
    }

    #[test]
    fn normalizes_then_composes_through_the_store() -> anyhow::Result<()> {
        use crate::compose::{compose, CanonicalTables, FeeScheduleRequest};
        use crate::selector::RateType;
        use crate::store::CanonicalTable;
        use std::fs;

        init_test_logging();
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        let config = Config {
            data_dir: root.join("Program Data"),
            physician_dir: root.join("Program Data/Physician"),
            dme_file: root.join("Program Data/DME/DMEPOS.csv"),
            injectable_file: root.join("Program Data/Injectable/ASP.csv"),
            output_dir: root.join("Fee Schedule Output"),
            ..Config::default()
        };
        fs::create_dir_all(&config.physician_dir)?;
        fs::create_dir_all(root.join("Program Data/DME"))?;
        fs::create_dir_all(root.join("Program Data/Injectable"))?;

        fs::write(
            config.physician_dir.join("PFVA11.txt"),
            "\"2024\",\"11302\",\"11\",\"99213\",\"  \",\"0000050.00\",\"0000030.00\",\"\",\"0\",\"A\",\"2\",\"0\",\"0\",\"0\",\"\",\"\",\"  \",\"VA\"\n\
             trailer 1\ntrailer 2\ntrailer 3\ntrailer 4\n",
        )?;
        fs::write(
            &config.dme_file,
            "r1\nr2\nr3\nr4\nr5\nr6\n\
             HCPCS,Mod,Mod2,JURIS,CATG,Ceiling,Floor,VA (NR),VA (R),Description\n\
             E0100,NU,,D,IN,30,20,22.75,20.00,Cane\n\
             A4216,,,D,SU,1,0,N/A,1.00,Water\n\
             A4217,,,D,SU,1,0,0.00,0.00,Saline\n",
        )?;
        fs::write(
            &config.injectable_file,
            "r1\nr2\nr3\nr4\nr5\nr6\nr7\nr8\n\
             HCPCS Code,Short Description,Dosage,Payment Limit,Co-ins,V%,VL,B%,BL,CF,Notes\n\
             J0129,Abatacept,10 MG,22.512,20,,,,,,\n\
             J0131,Acetaminophen,10 MG,0,20,,,,,,\n\
             J0132,Acetylcysteine,100 MG,see notes,20,,,,,,\n",
        )?;

        let store = CanonicalStore::new(&config.data_dir, 2024);
        let failures = run_normalization(&config, &store)?;
        assert!(failures.is_empty());

        let dme_errors = fs::read_to_string(store.path(CanonicalTable::DmeErrors))?;
        assert_eq!(dme_errors, "CPT,MOD1,MOD2,STATE,RATES\nA4216,,,VA,N/A\n");
        let inj_errors = fs::read_to_string(store.path(CanonicalTable::InjectableErrors))?;
        assert_eq!(inj_errors, "CPT,RATES,MOD1,MOD2\nJ0132,see notes,,\n");

        let tables = CanonicalTables::load(&store)?;
        let request = FeeScheduleRequest {
            state: "VA".into(),
            locality: 11,
            rate_type: RateType::Physician,
            percentage: 110,
            schedule_number: "1234".into(),
            year: 2024,
        };
        let schedule = compose(&tables, &request)?;
        assert_eq!(schedule.file_name, "FS_1234_VA_11_110perc_2024.csv");
        let rows: Vec<_> = schedule
            .rows
            .iter()
            .map(|r| (r.cpt.as_str(), r.mod1.as_deref(), r.rate))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("99213", None, 55.0),
                ("E0100", Some("NU"), 25.025),
                ("J0129", None, 24.7632),
            ]
        );
        Ok(())
    }

    #[test]
    fn blank_modifiers_are_absent() {
        assert_eq!(normalize_modifier(""), None);
        assert_eq!(normalize_modifier("  "), None);
        assert_eq!(normalize_modifier(" 26"), Some("26".to_string()));
    }
}
