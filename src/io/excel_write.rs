use std::path::Path;

use rust_xlsxwriter::{Table, Workbook};
use tracing::debug;

use crate::error::Result;
use crate::report::tables::{Cell, WorkbookData};

/// Writes the provided workbook data to the given path.
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let excel_row = (row_idx + 1) as u32;
            for (col_idx, cell) in row.iter().enumerate() {
                let excel_col = col_idx as u16;
                match cell {
                    Cell::Text(value) => {
                        worksheet.write_string(excel_row, excel_col, value)?;
                    }
                    Cell::Number(value) => {
                        worksheet.write_number(excel_row, excel_col, *value)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        let mut excel_table = Table::new();
        excel_table.set_autofilter(true);

        let col_end = (table.columns.len() as u16).saturating_sub(1);
        let row_end = if table.rows.is_empty() {
            1
        } else {
            table.rows.len() as u32
        };
        worksheet.add_table(0, 0, row_end, col_end, &excel_table)?;
        worksheet.autofit();
        debug!(sheet = %table.sheet_name, rows = table.rows.len(), "worksheet written");
    }

    workbook_writer.save(path)?;
    Ok(())
}
