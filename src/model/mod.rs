use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{RecordLocation, ReportError, Result};

/// A single cell as handed over by a source reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Free text, including numbers formatted as text.
    Text(String),
    /// Native numeric cell.
    Number(f64),
    /// Native date cell.
    Date(NaiveDate),
    /// Blank cell.
    Empty,
}

impl CellValue {
    /// Builds a cell from reader text, mapping blank strings to [`CellValue::Empty`].
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => write!(f, "{text}"),
            CellValue::Number(number) => write!(f, "{number}"),
            CellValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            CellValue::Empty => Ok(()),
        }
    }
}

/// An ordered column → cell mapping read from one row of a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub location: RecordLocation,
    cells: Vec<(String, CellValue)>,
}

impl RawRecord {
    pub fn new(location: RecordLocation) -> Self {
        Self {
            location,
            cells: Vec::new(),
        }
    }

    /// Appends a cell; a repeated column name replaces the earlier value.
    pub fn push(&mut self, column: impl Into<String>, value: CellValue) {
        let column = column.into();
        let column = column.trim().to_string();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn with(mut self, column: impl Into<String>, value: CellValue) -> Self {
        self.push(column, value);
        self
    }

    /// Looks up a column by its trimmed, ASCII case-insensitive name.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        let wanted = column.trim();
        self.cells
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, value)| value.is_empty())
    }
}

/// All raw records read from one source, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    pub source: String,
    pub records: Vec<RawRecord>,
}

impl RawBatch {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            records: Vec::new(),
        }
    }
}

/// Fields of the canonical record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Period,
    Category,
    Revenue,
    Cost,
    UnitsProduced,
    LaborHours,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Period,
        CanonicalField::Category,
        CanonicalField::Revenue,
        CanonicalField::Cost,
        CanonicalField::UnitsProduced,
        CanonicalField::LaborHours,
    ];

    /// Fields every source mapping has to provide.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            CanonicalField::Period
                | CanonicalField::Category
                | CanonicalField::Revenue
                | CanonicalField::Cost
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Period => "period",
            CanonicalField::Category => "category",
            CanonicalField::Revenue => "revenue",
            CanonicalField::Cost => "cost",
            CanonicalField::UnitsProduced => "units_produced",
            CanonicalField::LaborHours => "labor_hours",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting period: either a calendar month or a specific day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Month { year: i32, month: u32 },
    Day(NaiveDate),
}

impl Period {
    /// Returns `None` unless `month` is within 1..=12.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(Period::Month { year, month })
    }

    pub fn day(date: NaiveDate) -> Self {
        Period::Day(date)
    }

    /// Collapses a day period to its calendar month.
    pub fn to_month(self) -> Self {
        match self {
            Period::Day(date) => Period::Month {
                year: date.year(),
                month: date.month(),
            },
            month => month,
        }
    }

    fn sort_key(&self) -> (i32, u32, u32) {
        match self {
            Period::Month { year, month } => (*year, *month, 0),
            Period::Day(date) => (date.year(), date.month(), date.day()),
        }
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Period::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Deduplication key of the unified dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub period: Period,
    pub category: String,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.period, self.category)
    }
}

/// Numeric measures of a canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measures {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub units_produced: u64,
    pub labor_hours: Decimal,
}

/// A record in the canonical schema. Construction validates the invariants,
/// after which the record cannot be changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    period: Period,
    category: String,
    revenue: Decimal,
    cost: Decimal,
    units_produced: u64,
    labor_hours: Decimal,
    origin: RecordLocation,
}

impl CanonicalRecord {
    pub fn new(
        period: Period,
        category: impl Into<String>,
        measures: Measures,
        origin: RecordLocation,
    ) -> Result<Self> {
        let category = category.into().trim().to_string();
        if category.is_empty() {
            return Err(ReportError::value(
                &origin,
                CanonicalField::Category.as_str(),
                "",
                "category must not be empty",
            ));
        }
        for (field, amount) in [
            (CanonicalField::Revenue, measures.revenue),
            (CanonicalField::Cost, measures.cost),
            (CanonicalField::LaborHours, measures.labor_hours),
        ] {
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(ReportError::value(
                    &origin,
                    field.as_str(),
                    amount.to_string(),
                    "negative values are not allowed",
                ));
            }
        }

        Ok(Self {
            period,
            category,
            revenue: measures.revenue,
            cost: measures.cost,
            units_produced: measures.units_produced,
            labor_hours: measures.labor_hours,
            origin,
        })
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn revenue(&self) -> Decimal {
        self.revenue
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn units_produced(&self) -> u64 {
        self.units_produced
    }

    pub fn labor_hours(&self) -> Decimal {
        self.labor_hours
    }

    pub fn origin(&self) -> &RecordLocation {
        &self.origin
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            period: self.period,
            category: self.category.clone(),
        }
    }
}

/// Canonical records produced from one source, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalBatch {
    pub source: String,
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalBatch {
    pub fn new(source: impl Into<String>, records: Vec<CanonicalRecord>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }
}

/// Productivity indicator. `Undefined` marks records without labor hours, or
/// whose ratio is out of range, so that aggregation can leave them out
/// instead of counting them as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Productivity {
    Defined(Decimal),
    Undefined,
}

impl Productivity {
    pub fn value(self) -> Option<Decimal> {
        match self {
            Productivity::Defined(value) => Some(value),
            Productivity::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Productivity::Defined(_))
    }
}

impl Serialize for Productivity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Indicators derived from one canonical record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorResult {
    pub period: Period,
    pub category: String,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub units_produced: u64,
    pub labor_hours: Decimal,
    pub productivity: Productivity,
    pub origin: RecordLocation,
}

impl IndicatorResult {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            period: self.period,
            category: self.category.clone(),
        }
    }
}

/// Emitted when a later record replaces an earlier one with the same key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateKeyWarning {
    pub period: Period,
    pub category: String,
    /// Record that lost the conflict.
    pub replaced: RecordLocation,
    /// Record that was kept.
    pub kept: RecordLocation,
}

/// Advisory conditions collected during a run. None of them stop the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    DuplicateKey(DuplicateKeyWarning),
    UndefinedProductivity {
        period: Period,
        category: String,
        origin: RecordLocation,
    },
    SkippedRecord {
        location: RecordLocation,
        reason: String,
    },
    /// A whole source could not be read and was left out of the run.
    SkippedSource {
        source: String,
        reason: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicateKey(duplicate) => write!(
                f,
                "duplicate key ({}, {}): {} overwrote {}",
                duplicate.period, duplicate.category, duplicate.kept, duplicate.replaced
            ),
            Warning::UndefinedProductivity {
                period,
                category,
                origin,
            } => write!(
                f,
                "productivity undefined for ({period}, {category}) from {origin}"
            ),
            Warning::SkippedRecord { location, reason } => {
                write!(f, "skipped {location}: {reason}")
            }
            Warning::SkippedSource { source, reason } => {
                write!(f, "skipped source '{source}': {reason}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> RecordLocation {
        RecordLocation::new("test.csv", 1)
    }

    #[test]
    fn raw_record_lookup_ignores_case_and_padding() {
        let record = RawRecord::new(origin()).with(" Receita ", CellValue::Number(10.0));
        assert_eq!(record.get("receita"), Some(&CellValue::Number(10.0)));
        assert_eq!(record.get("RECEITA  "), Some(&CellValue::Number(10.0)));
        assert_eq!(record.get("despesa"), None);
    }

    #[test]
    fn periods_order_chronologically_across_granularities() {
        let january = Period::month(2024, 1).unwrap();
        let mid_january = Period::day(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        let february = Period::month(2024, 2).unwrap();
        let mut periods = vec![february, mid_january, january];
        periods.sort();
        assert_eq!(periods, vec![january, mid_january, february]);
        assert_eq!(mid_january.to_month(), january);
        assert_eq!(january.to_string(), "2024-01");
        assert!(Period::month(2024, 13).is_none());
    }

    #[test]
    fn canonical_record_rejects_negative_amounts() {
        let measures = Measures {
            revenue: Decimal::new(-1, 0),
            ..Measures::default()
        };
        let period = Period::month(2024, 1).unwrap();
        let err = CanonicalRecord::new(period, "sales", measures, origin()).unwrap_err();
        assert!(matches!(err, ReportError::Value { ref column, .. } if column == "revenue"));
    }

    #[test]
    fn canonical_record_rejects_blank_category() {
        let period = Period::month(2024, 1).unwrap();
        let err = CanonicalRecord::new(period, "  ", Measures::default(), origin()).unwrap_err();
        assert!(err.is_record_level());
    }

    #[test]
    fn undefined_productivity_serializes_as_null() {
        let json = serde_json::to_value(Productivity::Undefined).unwrap();
        assert_eq!(json, serde_json::Value::Null);
    }
}
