// src/store.rs

use csv::WriterBuilder;
use serde::de::DeserializeOwned;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::Result;
use crate::table::{
    NationalRate, PhysicianRate, RejectedNationalRate, RejectedStateRate, StateRate, TableRow,
};

/// The persisted tables handed from normalization to composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalTable {
    Physician,
    Dme,
    DmeErrors,
    Injectables,
    InjectableErrors,
}

impl CanonicalTable {
    fn prefix(self) -> &'static str {
        match self {
            Self::Physician => "physician_cptrates",
            Self::Dme => "dme_cptrates",
            Self::DmeErrors => "errors_dme_cptrates",
            Self::Injectables => "injectables_cptrates",
            Self::InjectableErrors => "errors_injectables_cptrates",
        }
    }
}

/// Canonical tables for one year, stored as CSV files in `dir`.
pub struct CanonicalStore {
    dir: PathBuf,
    year: i32,
}

impl CanonicalStore {
    /// Construct a store at `dir`. Nothing touches the disk until the first write,
    /// which creates the directory.
    pub fn new(dir: impl Into<PathBuf>, year: i32) -> Self {
        Self {
            dir: dir.into(),
            year,
        }
    }

    /// `<dir>/<table>_<year>.csv`
    pub fn path(&self, table: CanonicalTable) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", table.prefix(), self.year))
    }

    pub fn write_physician(&self, rows: &[PhysicianRate]) -> Result<PathBuf> {
        self.write(CanonicalTable::Physician, rows)
    }

    pub fn write_dme(&self, valid: &[StateRate], rejected: &[RejectedStateRate]) -> Result<()> {
        self.write(CanonicalTable::Dme, valid)?;
        self.write(CanonicalTable::DmeErrors, rejected)?;
        Ok(())
    }

    pub fn write_injectables(
        &self,
        valid: &[NationalRate],
        rejected: &[RejectedNationalRate],
    ) -> Result<()> {
        self.write(CanonicalTable::Injectables, valid)?;
        self.write(CanonicalTable::InjectableErrors, rejected)?;
        Ok(())
    }

    pub fn read_physician(&self) -> Result<Vec<PhysicianRate>> {
        read_table(self.path(CanonicalTable::Physician))
    }

    pub fn read_dme(&self) -> Result<Vec<StateRate>> {
        read_table(self.path(CanonicalTable::Dme))
    }

    pub fn read_injectables(&self) -> Result<Vec<NationalRate>> {
        read_table(self.path(CanonicalTable::Injectables))
    }

    fn write<T: TableRow>(&self, table: CanonicalTable, rows: &[T]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(table);
        write_table(&path, rows)?;
        info!(path = %path.display(), rows = rows.len(), "wrote {:?} table", table);
        Ok(path)
    }
}

/// Write `rows` as a headed CSV table. Absent fields become empty cells.
pub fn write_table<T: TableRow, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;
    wtr.write_record(T::COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a headed CSV table written by [`write_table`]. Empty cells read back as absent.
pub fn read_table<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path.as_ref())?;
    let rows = rdr.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    debug!(path = %path.as_ref().display(), rows = rows.len(), "read canonical table");
    Ok(rows)
}
