use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::{debug, instrument};

use crate::error::{RecordLocation, ReportError, Result};
use crate::model::{CellValue, RawBatch, RawRecord};
use crate::normalize::period::excel_serial_to_date;

/// Reads one worksheet into raw records. The first used row holds the headers;
/// `sheet` defaults to the first sheet in the workbook. Row numbers are the
/// sheet's own 1-based row numbers.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), source = source, ?sheet))]
pub fn read_sheet(path: &Path, source: &str, sheet: Option<&str>) -> Result<RawBatch> {
    if !path.exists() {
        return Err(ReportError::MissingInput(path.to_path_buf()));
    }
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ReportError::InvalidWorkbook("workbook has no sheets".into()))?,
    };
    let range = read_required_sheet(&mut workbook, &sheet_name)?;

    // Header row, 1-based, as the sheet shows it.
    let header_row = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_value(cell).to_string().trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let mut batch = RawBatch::new(source);
    for (index, row) in rows.enumerate() {
        let location = RecordLocation::new(source, header_row + index + 1);
        let mut record = RawRecord::new(location);
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            record.push(header.clone(), cell_to_value(cell));
        }
        if record.is_blank() {
            continue;
        }
        batch.records.push(record);
    }

    debug!(rows = batch.records.len(), sheet = %sheet_name, "read worksheet");
    Ok(batch)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ReportError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ReportError::from)?;
    Ok(range)
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => CellValue::from_text(value),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Text(value.to_string()),
        DataType::DateTime(serial) => excel_serial_to_date(*serial)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(*serial)),
        DataType::Empty => CellValue::Empty,
        other => CellValue::from_text(&other.to_string()),
    }
}
