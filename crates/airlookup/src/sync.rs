//! Bulk import of an aircraft database CSV into the aircraft table.
//!
//! Rows only ever add information: a missing aircraft is inserted, and an
//! existing one has its blank fields filled. Stored values are never
//! overwritten.

use std::io::BufRead;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{non_empty, FillOutcome, Icao24, RecordPatch};
use crate::table::TableStore;

/// Registration value the aircraft database uses for unknown marks.
const UNKNOWN_REGISTRATION: &str = "-unknown-";

/// One importable CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRow {
    /// Aircraft address.
    pub icao24: Icao24,
    /// Fields to fill.
    pub patch: RecordPatch,
}

/// Counts from a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Rows created.
    pub inserted: usize,
    /// Rows that had blank fields filled.
    pub updated: usize,
    /// Rows already complete.
    pub unchanged: usize,
    /// CSV lines that were not importable.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    width: usize,
    icao24: usize,
    typecode: usize,
    operator: usize,
    registration: usize,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self> {
        let names = split_fields(header);
        let find = |column: &'static str| {
            names
                .iter()
                .position(|name| name.trim() == column)
                .ok_or(Error::CsvHeader { column })
        };

        Ok(Self {
            width: names.len(),
            icao24: find("icao24")?,
            typecode: find("typecode")?,
            operator: find("operatorIcao")?,
            registration: find("registration")?,
        })
    }

    fn parse_row(self, line: &str) -> Option<SyncRow> {
        let cols = split_fields(line);
        if cols.len() != self.width {
            return None;
        }
        let field = |index: usize| non_empty(cols.get(index).map(String::as_str));

        let icao24 = field(self.icao24)?;
        let typecode = field(self.typecode)?;
        let registration = field(self.registration)?;
        if registration.eq_ignore_ascii_case(UNKNOWN_REGISTRATION) {
            return None;
        }
        let operator = field(self.operator);

        Some(SyncRow {
            icao24: Icao24::parse(&icao24).ok()?,
            patch: RecordPatch::new(Some(&registration), Some(&typecode), operator.as_deref()),
        })
    }
}

/// Split a line on commas outside single-quoted spans, dropping the quotes.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '\'' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse an aircraft database CSV.
///
/// Fields may be wrapped in single quotes, which protect embedded commas.
/// Lines lacking an address, type code or registration, with an unknown
/// registration, or whose field count differs from the header's are counted
/// as skipped.
///
/// # Errors
///
/// Returns an error if reading fails or the header lacks a required column.
pub fn parse_csv(reader: impl BufRead) -> Result<(Vec<SyncRow>, usize)> {
    let mut lines = reader.lines();
    let Some(header) = lines.next().transpose()? else {
        return Err(Error::CsvHeader { column: "icao24" });
    };
    let columns = Columns::from_header(&header)?;

    let mut rows = Vec::new();
    let mut skipped = 0;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match columns.parse_row(&line) {
            Some(row) => rows.push(row),
            None => {
                debug!("Skipping line: {line}");
                skipped += 1;
            }
        }
    }
    Ok((rows, skipped))
}

/// Apply parsed rows to the store, one at a time.
///
/// # Errors
///
/// Returns the first store error; rows before it have already been written.
pub async fn apply(store: &TableStore, rows: &[SyncRow]) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    for row in rows {
        match store.fill_missing(&row.icao24, &row.patch).await? {
            FillOutcome::Inserted => report.inserted += 1,
            FillOutcome::Updated => report.updated += 1,
            FillOutcome::Unchanged => report.unchanged += 1,
        }
    }
    Ok(report)
}

/// Import the CSV file at `path` into the store.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a write fails.
pub async fn sync_file(store: &TableStore, path: &Path) -> Result<SyncReport> {
    let file = std::fs::File::open(path)?;
    let (rows, skipped) = parse_csv(std::io::BufReader::new(file))?;
    info!("Importing {} rows from {}", rows.len(), path.display());

    let mut report = apply(store, &rows).await?;
    report.skipped = skipped;
    Ok(report)
}
