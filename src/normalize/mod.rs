//! Maps raw source rows onto the canonical record schema.
//!
//! Every source carries an explicit [`SourceMapping`] naming which of its
//! columns feeds which [`CanonicalField`]. Normalization is pure: the same
//! raw record and mapping always produce the same result.

pub mod number;
pub mod period;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{RecordLocation, ReportError, Result};
use crate::model::{
    CanonicalBatch, CanonicalField, CanonicalRecord, CellValue, Measures, RawBatch, RawRecord,
    Warning,
};
pub use number::DecimalSeparator;
use number::{NumberError, decimal_from_f64, parse_decimal, to_whole_units};

/// What to do with a record whose values cannot be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRecordPolicy {
    /// Stop the run at the first invalid record.
    #[default]
    Abort,
    /// Drop the record and record a warning.
    Skip,
}

/// Column mapping and parsing hints for one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMapping {
    pub source: String,
    /// Source column → canonical field.
    pub columns: BTreeMap<String, CanonicalField>,
    pub decimal_separator: Option<DecimalSeparator>,
    /// Collapse full dates into their calendar month.
    pub truncate_to_month: bool,
}

impl SourceMapping {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            columns: BTreeMap::new(),
            decimal_separator: None,
            truncate_to_month: false,
        }
    }

    pub fn map(mut self, column: impl Into<String>, field: CanonicalField) -> Self {
        self.columns.insert(column.into(), field);
        self
    }

    /// Returns the source column feeding `field`, if any.
    pub fn column_for(&self, field: CanonicalField) -> Option<&str> {
        self.columns
            .iter()
            .find(|(_, mapped)| **mapped == field)
            .map(|(column, _)| column.as_str())
    }

    /// Checks that every required field is mapped and no field is mapped twice.
    pub fn validate(&self) -> Result<()> {
        for field in CanonicalField::ALL {
            let sources: Vec<&str> = self
                .columns
                .iter()
                .filter(|(_, mapped)| **mapped == field)
                .map(|(column, _)| column.as_str())
                .collect();
            if sources.is_empty() && field.is_required() {
                return Err(self.schema_error(field, "has no mapped source column".to_string()));
            }
            if sources.len() > 1 {
                return Err(self.schema_error(
                    field,
                    format!("is mapped from several columns: {}", sources.join(", ")),
                ));
            }
        }
        Ok(())
    }

    fn schema_error(&self, field: CanonicalField, detail: String) -> ReportError {
        ReportError::Schema {
            source_name: self.source.clone(),
            field: field.to_string(),
            detail,
        }
    }
}

/// Normalizes a single raw record into a canonical record.
pub fn normalize_record(record: &RawRecord, mapping: &SourceMapping) -> Result<CanonicalRecord> {
    let reader = FieldReader { record, mapping };

    let (period_column, period_cell) = reader.required(CanonicalField::Period)?;
    let period = period::parse_period(period_cell).ok_or_else(|| {
        ReportError::value(
            &record.location,
            period_column,
            period_cell.to_string(),
            "not a recognisable date or year-month",
        )
    })?;
    let period = if mapping.truncate_to_month {
        period.to_month()
    } else {
        period
    };

    let (category_column, category_cell) = reader.required(CanonicalField::Category)?;
    let category = match category_cell {
        CellValue::Empty => {
            return Err(ReportError::value(
                &record.location,
                category_column,
                "",
                "category is missing",
            ));
        }
        other => other.to_string(),
    };

    let measures = Measures {
        revenue: reader.amount(CanonicalField::Revenue)?,
        cost: reader.amount(CanonicalField::Cost)?,
        units_produced: reader.units(CanonicalField::UnitsProduced)?,
        labor_hours: reader.amount(CanonicalField::LaborHours)?,
    };

    CanonicalRecord::new(period, category, measures, record.location.clone())
}

/// Normalizes every record of a batch. Mapping problems always abort; value
/// problems abort or are skipped according to `policy`.
#[instrument(level = "debug", skip_all, fields(source = %batch.source, rows = batch.records.len()))]
pub fn normalize_batch(
    batch: &RawBatch,
    mapping: &SourceMapping,
    policy: InvalidRecordPolicy,
) -> Result<(CanonicalBatch, Vec<Warning>)> {
    mapping.validate()?;

    let mut records = Vec::with_capacity(batch.records.len());
    let mut warnings = Vec::new();

    for raw in &batch.records {
        match normalize_record(raw, mapping) {
            Ok(record) => records.push(record),
            Err(error) if error.is_record_level() && policy == InvalidRecordPolicy::Skip => {
                warn!(location = %raw.location, %error, "skipping invalid record");
                warnings.push(Warning::SkippedRecord {
                    location: raw.location.clone(),
                    reason: error.to_string(),
                });
            }
            Err(error) => return Err(error),
        }
    }

    debug!(
        normalized = records.len(),
        skipped = warnings.len(),
        "batch normalized"
    );
    Ok((CanonicalBatch::new(batch.source.clone(), records), warnings))
}

struct FieldReader<'a> {
    record: &'a RawRecord,
    mapping: &'a SourceMapping,
}

impl<'a> FieldReader<'a> {
    /// Resolves the cell for a required field, failing when the mapping or
    /// the record lacks the column.
    fn required(&self, field: CanonicalField) -> Result<(&'a str, &'a CellValue)> {
        let column = self
            .mapping
            .column_for(field)
            .ok_or_else(|| self.mapping.schema_error(field, "has no mapped source column".into()))?;
        let cell = self.record.get(column).ok_or_else(|| {
            self.mapping.schema_error(
                field,
                format!("expects column '{column}', which the source does not contain"),
            )
        })?;
        Ok((column, cell))
    }

    /// Resolves the cell for a field, or `None` for an unmapped optional field.
    fn cell(&self, field: CanonicalField) -> Result<Option<(&'a str, &'a CellValue)>> {
        if field.is_required() {
            return self.required(field).map(Some);
        }
        Ok(self
            .mapping
            .column_for(field)
            .and_then(|column| self.record.get(column).map(|cell| (column, cell))))
    }

    fn amount(&self, field: CanonicalField) -> Result<Decimal> {
        let Some((column, cell)) = self.cell(field)? else {
            return Ok(Decimal::ZERO);
        };
        let parsed = match cell {
            CellValue::Number(value) => decimal_from_f64(*value),
            CellValue::Text(text) => parse_decimal(text, self.mapping.decimal_separator),
            CellValue::Empty => Err(NumberError::Empty),
            CellValue::Date(_) => Err(NumberError::NotNumeric),
        };
        match parsed {
            Err(NumberError::Empty) if !field.is_required() => Ok(Decimal::ZERO),
            other => other.map_err(|reason| self.value_error(column, cell, reason)),
        }
    }

    fn units(&self, field: CanonicalField) -> Result<u64> {
        let Some((column, cell)) = self.cell(field)? else {
            return Ok(0);
        };
        let parsed = match cell {
            CellValue::Number(value) => decimal_from_f64(*value).and_then(to_whole_units),
            CellValue::Text(text) => {
                parse_decimal(text, self.mapping.decimal_separator).and_then(to_whole_units)
            }
            CellValue::Empty => return Ok(0),
            CellValue::Date(_) => Err(NumberError::NotNumeric),
        };
        parsed.map_err(|reason| self.value_error(column, cell, reason))
    }

    fn value_error(&self, column: &str, cell: &CellValue, reason: NumberError) -> ReportError {
        ReportError::value(
            &self.location(),
            column,
            cell.to_string(),
            reason.to_string(),
        )
    }

    fn location(&self) -> RecordLocation {
        self.record.location.clone()
    }
}
