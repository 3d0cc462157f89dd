// src/reader.rs
//! Turns source files into [`RawTable`]s. Knows delimiters, skipped rows and
//! footers; knows nothing about rates.
use csv::{ReaderBuilder, StringRecord};
use std::{fs::File, io::Read, path::Path};
use tracing::{debug, instrument};

use crate::error::{FeeScheduleError, Result};
use crate::table::RawTable;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// File name used to label a source in errors and logs.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_records(text: &str, name: &str) -> Result<Vec<StringRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // field counts are checked by the normalizers, not here
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| {
            FeeScheduleError::shape(name, format!("CSV parse error at record {idx}: {e}"))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Physical lines of the whole input. Footer and skip counts are in lines,
/// not records, because the CSV parser folds away empty lines.
fn read_lines<R: Read>(mut rdr: R) -> Result<Vec<String>> {
    let mut text = String::new();
    rdr.read_to_string(&mut text)?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Read a headerless comma-delimited file, dropping the last `footer_lines` lines.
#[instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_headerless<P: AsRef<Path>>(path: P, footer_lines: usize) -> Result<RawTable> {
    let path = path.as_ref();
    let name = source_name(path);
    let file = File::open(path)?;
    headerless_from_reader(file, &name, footer_lines)
}

pub fn headerless_from_reader<R: Read>(
    rdr: R,
    name: &str,
    footer_lines: usize,
) -> Result<RawTable> {
    let lines = read_lines(rdr)?;
    if lines.len() < footer_lines {
        return Err(FeeScheduleError::shape(
            name,
            format!(
                "{} lines is fewer than the {}-line footer",
                lines.len(),
                footer_lines
            ),
        ));
    }
    let body = lines[..lines.len() - footer_lines].join("\n");
    let records = read_records(&body, name)?;
    debug!(source = name, lines = lines.len(), records = records.len(), "read headerless");

    let rows = records
        .iter()
        .map(|r| r.iter().map(str::to_string).collect())
        .collect();
    Ok(RawTable::new(Vec::new(), rows))
}

/// Read a comma-delimited spreadsheet export.
///
/// The first `skip_rows` lines are discarded and the next non-empty record is
/// the header. When `names` is given it replaces that header. Rows with only
/// blank cells are dropped and short rows are padded to the header width.
#[instrument(level = "debug", skip(path, names), fields(path = %path.as_ref().display()))]
pub fn read_sheet<P: AsRef<Path>>(
    path: P,
    skip_rows: usize,
    names: Option<&[&str]>,
) -> Result<RawTable> {
    let path = path.as_ref();
    let name = source_name(path);
    let file = File::open(path)?;
    sheet_from_reader(file, &name, skip_rows, names)
}

pub fn sheet_from_reader<R: Read>(
    rdr: R,
    name: &str,
    skip_rows: usize,
    names: Option<&[&str]>,
) -> Result<RawTable> {
    let lines = read_lines(rdr)?;
    let body = lines.get(skip_rows..).unwrap_or_default().join("\n");
    let mut iter = read_records(&body, name)?.into_iter();

    let header = iter.next().ok_or_else(|| {
        FeeScheduleError::shape(name, format!("no header row after skipping {skip_rows} lines"))
    })?;
    let headers: Vec<String> = match names {
        Some(names) => names.iter().map(|n| n.to_string()).collect(),
        None => header.iter().map(clean_str).collect(),
    };

    let mut rows = Vec::new();
    let mut blank = 0usize;
    for record in iter {
        if record.iter().all(|c| c.trim().is_empty()) {
            blank += 1;
            continue;
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.len() < headers.len() {
            row.resize(headers.len(), String::new());
        }
        rows.push(row);
    }
    debug!(source = name, rows = rows.len(), blank, "read sheet");

    Ok(RawTable::new(headers, rows))
}
