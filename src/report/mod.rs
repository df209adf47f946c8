//! Presentation-ready aggregates over the indicator results.

pub mod tables;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{ReportError, Result, Stage};
use crate::model::{IndicatorResult, Period, Productivity};

/// How records without a defined productivity enter productivity averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedProductivityPolicy {
    /// Leave them out of the average entirely.
    #[default]
    Exclude,
    /// Count them as zero productivity.
    AsZero,
}

/// Totals and averages over a group of indicator results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
    pub revenue: Decimal,
    pub cost: Decimal,
    pub profit: Decimal,
    pub units_produced: u64,
    pub labor_hours: Decimal,
    pub records: usize,
    /// Records that contributed to `average_productivity`.
    pub productivity_samples: usize,
    pub average_productivity: Option<Decimal>,
    /// `profit / revenue`; absent when there was no revenue.
    pub profit_margin: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRollup {
    pub period: Period,
    #[serde(flatten)]
    pub totals: Rollup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRollup {
    pub category: String,
    #[serde(flatten)]
    pub totals: Rollup,
}

/// Rollup over the whole report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    #[serde(flatten)]
    pub totals: Rollup,
    pub periods: usize,
    pub categories: usize,
    pub average_profit_per_period: Decimal,
    /// Records whose productivity is undefined.
    pub undefined_productivity: usize,
}

/// Read-only view consumed by the exporters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportModel {
    table: Vec<IndicatorResult>,
    by_period: Vec<PeriodRollup>,
    by_category: Vec<CategoryRollup>,
    summary: Summary,
}

impl ReportModel {
    /// Flat per-(period, category) table in dataset order.
    pub fn table(&self) -> &[IndicatorResult] {
        &self.table
    }

    pub fn get(&self, period: Period, category: &str) -> Option<&IndicatorResult> {
        self.table
            .iter()
            .find(|result| result.period == period && result.category == category)
    }

    /// Per-period rollups, oldest period first.
    pub fn by_period(&self) -> &[PeriodRollup] {
        &self.by_period
    }

    pub fn period(&self, period: Period) -> Option<&PeriodRollup> {
        self.by_period.iter().find(|rollup| rollup.period == period)
    }

    /// Per-category rollups, sorted by category name.
    pub fn by_category(&self) -> &[CategoryRollup] {
        &self.by_category
    }

    pub fn category(&self, category: &str) -> Option<&CategoryRollup> {
        self.by_category
            .iter()
            .find(|rollup| rollup.category == category)
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

/// Builds the report model from the full set of indicator results.
#[instrument(level = "info", skip_all, fields(results = results.len(), ?policy))]
pub fn build_report(
    results: Vec<IndicatorResult>,
    policy: UndefinedProductivityPolicy,
) -> Result<ReportModel> {
    if results.is_empty() {
        return Err(ReportError::EmptyInput {
            stage: Stage::Report,
        });
    }

    let mut overall = Accumulator::default();
    let mut periods: BTreeMap<Period, Accumulator> = BTreeMap::new();
    let mut categories: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut undefined_productivity = 0;

    for result in &results {
        if !result.productivity.is_defined() {
            undefined_productivity += 1;
        }
        overall.add(result, policy)?;
        periods.entry(result.period).or_default().add(result, policy)?;
        categories
            .entry(result.category.clone())
            .or_default()
            .add(result, policy)?;
    }

    let by_period: Vec<PeriodRollup> = periods
        .into_iter()
        .map(|(period, totals)| PeriodRollup {
            period,
            totals: totals.finish(),
        })
        .collect();
    let by_category: Vec<CategoryRollup> = categories
        .into_iter()
        .map(|(category, totals)| CategoryRollup {
            category,
            totals: totals.finish(),
        })
        .collect();

    let totals = overall.finish();
    let average_profit_per_period = totals.profit / Decimal::from(by_period.len());
    let summary = Summary {
        totals,
        periods: by_period.len(),
        categories: by_category.len(),
        average_profit_per_period,
        undefined_productivity,
    };
    info!(
        periods = summary.periods,
        categories = summary.categories,
        profit = %summary.totals.profit,
        "report model built"
    );

    Ok(ReportModel {
        table: results,
        by_period,
        by_category,
        summary,
    })
}

#[derive(Debug, Default)]
struct Accumulator {
    revenue: Decimal,
    cost: Decimal,
    units_produced: u64,
    labor_hours: Decimal,
    records: usize,
    productivity_sum: Decimal,
    productivity_samples: usize,
}

impl Accumulator {
    fn add(
        &mut self,
        result: &IndicatorResult,
        policy: UndefinedProductivityPolicy,
    ) -> Result<()> {
        let overflow = |quantity| ReportError::Overflow {
            location: result.origin.clone(),
            quantity,
        };
        self.revenue = self
            .revenue
            .checked_add(result.revenue)
            .ok_or_else(|| overflow("revenue"))?;
        self.cost = self
            .cost
            .checked_add(result.cost)
            .ok_or_else(|| overflow("cost"))?;
        self.units_produced = self
            .units_produced
            .checked_add(result.units_produced)
            .ok_or_else(|| overflow("units produced"))?;
        self.labor_hours = self
            .labor_hours
            .checked_add(result.labor_hours)
            .ok_or_else(|| overflow("labor hours"))?;
        self.records += 1;

        match (result.productivity, policy) {
            (Productivity::Defined(value), _) => {
                self.productivity_sum = self
                    .productivity_sum
                    .checked_add(value)
                    .ok_or_else(|| overflow("productivity"))?;
                self.productivity_samples += 1;
            }
            (Productivity::Undefined, UndefinedProductivityPolicy::AsZero) => {
                self.productivity_samples += 1;
            }
            (Productivity::Undefined, UndefinedProductivityPolicy::Exclude) => {}
        }
        Ok(())
    }

    fn finish(self) -> Rollup {
        // Both totals are non-negative, so the difference stays in range.
        let profit = self.revenue - self.cost;
        let average_productivity = (self.productivity_samples > 0)
            .then(|| {
                self.productivity_sum
                    .checked_div(Decimal::from(self.productivity_samples))
            })
            .flatten();
        let profit_margin = if self.revenue.is_zero() {
            None
        } else {
            profit.checked_div(self.revenue)
        };

        Rollup {
            revenue: self.revenue,
            cost: self.cost,
            profit,
            units_produced: self.units_produced,
            labor_hours: self.labor_hours,
            records: self.records,
            productivity_samples: self.productivity_samples,
            average_productivity,
            profit_margin,
        }
    }
}
