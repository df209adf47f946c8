use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, instrument};

use crate::error::{RecordLocation, ReportError, Result};
use crate::model::{CellValue, RawBatch, RawRecord};

/// Reads a delimited text file with a header row into raw records.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), source = source))]
pub fn read_csv(path: &Path, source: &str, delimiter: u8) -> Result<RawBatch> {
    if !path.exists() {
        return Err(ReportError::MissingInput(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    read_csv_from(file, source, delimiter)
}

/// Reads CSV content from any reader. Records carry the file line they start
/// on, so skipped blank lines keep later row numbers aligned with the file.
/// Rows shorter than the header get empty cells for the missing columns.
pub fn read_csv_from<R: Read>(reader: R, source: &str, delimiter: u8) -> Result<RawBatch> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut batch = RawBatch::new(source);
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let line = row
            .position()
            .map_or(index + 2, |position| position.line() as usize);
        let mut record = RawRecord::new(RecordLocation::new(source, line));
        for (column, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = row.get(column).unwrap_or_default();
            record.push(header.clone(), CellValue::from_text(value));
        }
        if record.is_blank() {
            continue;
        }
        batch.records.push(record);
    }

    debug!(rows = batch.records.len(), "read CSV source");
    Ok(batch)
}
