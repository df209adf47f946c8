//! Derives profit and productivity for every record of the unified dataset.

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::consolidate::UnifiedDataset;
use crate::model::{CanonicalRecord, IndicatorResult, Productivity, Warning};

/// Computes the indicators of one record.
pub fn compute_record(record: &CanonicalRecord) -> IndicatorResult {
    IndicatorResult {
        period: record.period(),
        category: record.category().to_string(),
        revenue: record.revenue(),
        cost: record.cost(),
        profit: record.revenue() - record.cost(),
        units_produced: record.units_produced(),
        labor_hours: record.labor_hours(),
        productivity: productivity(record.units_produced(), record.labor_hours()),
        origin: record.origin().clone(),
    }
}

/// `units / hours`, undefined when no hours were worked or the ratio does not
/// fit in a decimal.
pub fn productivity(units_produced: u64, labor_hours: Decimal) -> Productivity {
    if labor_hours <= Decimal::ZERO {
        return Productivity::Undefined;
    }
    Decimal::from(units_produced)
        .checked_div(labor_hours)
        .map_or(Productivity::Undefined, Productivity::Defined)
}

/// Computes one result per record, in dataset order. Records with undefined
/// productivity are kept and reported as warnings.
#[instrument(level = "info", skip_all, fields(records = dataset.len()))]
pub fn compute(dataset: &UnifiedDataset) -> (Vec<IndicatorResult>, Vec<Warning>) {
    let mut warnings = Vec::new();
    let results: Vec<IndicatorResult> = dataset
        .iter()
        .map(|record| {
            let result = compute_record(record);
            if !result.productivity.is_defined() {
                debug!(
                    period = %result.period,
                    category = %result.category,
                    "productivity undefined"
                );
                warnings.push(Warning::UndefinedProductivity {
                    period: result.period,
                    category: result.category.clone(),
                    origin: result.origin.clone(),
                });
            }
            result
        })
        .collect();
    (results, warnings)
}
