use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::model::{IndicatorResult, Warning};
use crate::report::{ReportModel, Rollup};

/// Sheet holding the flat consolidated table.
pub const CONSOLIDATED_SHEET: &str = "Consolidated";
pub const BY_PERIOD_SHEET: &str = "By Period";
pub const BY_CATEGORY_SHEET: &str = "By Category";
/// Sheet listing the headline indicators as name/value pairs.
pub const SUMMARY_SHEET: &str = "Summary";
pub const WARNINGS_SHEET: &str = "Warnings";

const ROLLUP_COLUMNS: [&str; 8] = [
    "revenue",
    "cost",
    "profit",
    "units_produced",
    "labor_hours",
    "records",
    "average_productivity",
    "profit_margin",
];

/// A single worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn decimal(value: Decimal) -> Self {
        value.to_f64().map(Cell::Number).unwrap_or(Cell::Empty)
    }

    fn optional(value: Option<Decimal>) -> Self {
        value.map(Cell::decimal).unwrap_or(Cell::Empty)
    }

    fn count(value: impl Into<u64>) -> Self {
        Cell::Number(value.into() as f64)
    }
}

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetTable {
    fn new(sheet_name: &str, columns: &[&str]) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Represents all tables required to materialise the Excel workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

/// Lays the report out as worksheets, in the order they are written.
pub fn build_workbook(report: &ReportModel, warnings: &[Warning]) -> WorkbookData {
    let tables = vec![
        consolidated_table(report.table()),
        rollup_table(
            BY_PERIOD_SHEET,
            "period",
            report
                .by_period()
                .iter()
                .map(|rollup| (rollup.period.to_string(), &rollup.totals)),
        ),
        rollup_table(
            BY_CATEGORY_SHEET,
            "category",
            report
                .by_category()
                .iter()
                .map(|rollup| (rollup.category.clone(), &rollup.totals)),
        ),
        summary_table(report),
        warnings_table(warnings),
    ];
    WorkbookData { tables }
}

fn consolidated_table(results: &[IndicatorResult]) -> SheetTable {
    let mut table = SheetTable::new(
        CONSOLIDATED_SHEET,
        &[
            "period",
            "category",
            "revenue",
            "cost",
            "profit",
            "units_produced",
            "labor_hours",
            "productivity",
            "source",
            "row",
        ],
    );
    table.rows = results
        .iter()
        .map(|result| {
            vec![
                Cell::text(result.period.to_string()),
                Cell::text(result.category.clone()),
                Cell::decimal(result.revenue),
                Cell::decimal(result.cost),
                Cell::decimal(result.profit),
                Cell::count(result.units_produced),
                Cell::decimal(result.labor_hours),
                Cell::optional(result.productivity.value()),
                Cell::text(result.origin.source.clone()),
                Cell::count(result.origin.row as u64),
            ]
        })
        .collect();
    table
}

fn rollup_table<'a>(
    sheet_name: &str,
    key_column: &str,
    rollups: impl Iterator<Item = (String, &'a Rollup)>,
) -> SheetTable {
    let mut columns = vec![key_column];
    columns.extend(ROLLUP_COLUMNS);
    let mut table = SheetTable::new(sheet_name, &columns);
    table.rows = rollups
        .map(|(key, totals)| {
            vec![
                Cell::text(key),
                Cell::decimal(totals.revenue),
                Cell::decimal(totals.cost),
                Cell::decimal(totals.profit),
                Cell::count(totals.units_produced),
                Cell::decimal(totals.labor_hours),
                Cell::count(totals.records as u64),
                Cell::optional(totals.average_productivity),
                Cell::optional(totals.profit_margin),
            ]
        })
        .collect();
    table
}

fn summary_table(report: &ReportModel) -> SheetTable {
    let summary = report.summary();
    let mut table = SheetTable::new(SUMMARY_SHEET, &["indicator", "value"]);
    let rows = [
        ("Total revenue", Cell::decimal(summary.totals.revenue)),
        ("Total cost", Cell::decimal(summary.totals.cost)),
        ("Net profit", Cell::decimal(summary.totals.profit)),
        ("Profit margin", Cell::optional(summary.totals.profit_margin)),
        (
            "Average productivity",
            Cell::optional(summary.totals.average_productivity),
        ),
        (
            "Average profit per period",
            Cell::decimal(summary.average_profit_per_period),
        ),
        ("Records", Cell::count(summary.totals.records as u64)),
        (
            "Records without productivity",
            Cell::count(summary.undefined_productivity as u64),
        ),
        ("Periods", Cell::count(summary.periods as u64)),
        ("Categories", Cell::count(summary.categories as u64)),
    ];
    table.rows = rows
        .into_iter()
        .map(|(name, value)| vec![Cell::text(name), value])
        .collect();
    table
}

fn warnings_table(warnings: &[Warning]) -> SheetTable {
    let mut table = SheetTable::new(WARNINGS_SHEET, &["kind", "message"]);
    table.rows = warnings
        .iter()
        .map(|warning| {
            let kind = match warning {
                Warning::DuplicateKey(_) => "duplicate_key",
                Warning::UndefinedProductivity { .. } => "undefined_productivity",
                Warning::SkippedRecord { .. } => "skipped_record",
                Warning::SkippedSource { .. } => "skipped_source",
            };
            vec![Cell::text(kind), Cell::text(warning.to_string())]
        })
        .collect();
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordLocation;
    use crate::indicators::productivity;
    use crate::model::Period;
    use crate::report::{UndefinedProductivityPolicy, build_report};

    fn report() -> ReportModel {
        let result = IndicatorResult {
            period: Period::month(2024, 1).unwrap(),
            category: "A".into(),
            revenue: Decimal::from(1000),
            cost: Decimal::from(600),
            profit: Decimal::from(400),
            units_produced: 50,
            labor_hours: Decimal::from(100),
            productivity: productivity(50, Decimal::from(100)),
            origin: RecordLocation::new("a.csv", 1),
        };
        build_report(vec![result], UndefinedProductivityPolicy::Exclude).unwrap()
    }

    #[test]
    fn lays_out_every_sheet_in_order() {
        let workbook = build_workbook(&report(), &[]);
        let names: Vec<&str> = workbook
            .tables
            .iter()
            .map(|table| table.sheet_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                CONSOLIDATED_SHEET,
                BY_PERIOD_SHEET,
                BY_CATEGORY_SHEET,
                SUMMARY_SHEET,
                WARNINGS_SHEET
            ]
        );
        for table in &workbook.tables {
            for row in &table.rows {
                assert_eq!(row.len(), table.columns.len(), "{}", table.sheet_name);
            }
        }
    }

    #[test]
    fn consolidated_rows_carry_numbers_and_origin() {
        let workbook = build_workbook(&report(), &[]);
        let row = &workbook.tables[0].rows[0];
        assert_eq!(row[0], Cell::Text("2024-01".into()));
        assert_eq!(row[4], Cell::Number(400.0));
        assert_eq!(row[7], Cell::Number(0.5));
        assert_eq!(row[8], Cell::Text("a.csv".into()));
    }

    #[test]
    fn warnings_are_listed_with_their_kind() {
        let warning = Warning::SkippedRecord {
            location: RecordLocation::new("b.csv", 4),
            reason: "bad".into(),
        };
        let workbook = build_workbook(&report(), &[warning]);
        let rows = &workbook.tables[4].rows;
        assert_eq!(rows[0][0], Cell::Text("skipped_record".into()));
        assert_eq!(rows[0][1], Cell::Text("skipped b.csv row 4: bad".into()));
    }
}
