use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;
use crate::model::Warning;
use crate::report::ReportModel;

/// Chart kinds understood by the chart layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
}

/// One plottable series, already aggregated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: ChartKind,
    pub x: Vec<String>,
    pub y: Vec<Decimal>,
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    report: &'a ReportModel,
    warnings: &'a [Warning],
    charts: Vec<ChartSeries>,
}

/// Monthly revenue and cost series plus profit per category.
pub fn chart_series(report: &ReportModel) -> Vec<ChartSeries> {
    let periods: Vec<String> = report
        .by_period()
        .iter()
        .map(|rollup| rollup.period.to_string())
        .collect();

    vec![
        ChartSeries {
            id: "revenue_by_period",
            title: "Revenue by period",
            kind: ChartKind::Line,
            x: periods.clone(),
            y: report
                .by_period()
                .iter()
                .map(|rollup| rollup.totals.revenue)
                .collect(),
        },
        ChartSeries {
            id: "cost_by_period",
            title: "Operating cost by period",
            kind: ChartKind::Bar,
            x: periods,
            y: report
                .by_period()
                .iter()
                .map(|rollup| rollup.totals.cost)
                .collect(),
        },
        ChartSeries {
            id: "profit_by_category",
            title: "Profit by category",
            kind: ChartKind::Bar,
            x: report
                .by_category()
                .iter()
                .map(|rollup| rollup.category.clone())
                .collect(),
            y: report
                .by_category()
                .iter()
                .map(|rollup| rollup.totals.profit)
                .collect(),
        },
    ]
}

/// Serialises the report, its warnings, and the chart series as pretty JSON.
pub fn to_json(report: &ReportModel, warnings: &[Warning]) -> Result<serde_json::Value> {
    let document = ReportDocument {
        report,
        warnings,
        charts: chart_series(report),
    };
    Ok(serde_json::to_value(document)?)
}

pub fn write_report_json(path: &Path, report: &ReportModel, warnings: &[Warning]) -> Result<()> {
    let json = to_json(report, warnings)?;
    fs::write(path, serde_json::to_string_pretty(&json)?)?;
    Ok(())
}
