use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::config::{PolicyConfig, RunConfig, SourceConfig};
use crate::consolidate::consolidate;
use crate::error::Result;
use crate::indicators;
use crate::io::{SourceFormat, csv_read, excel_read, excel_write, json_write};
use crate::model::{RawBatch, Warning};
use crate::normalize::{InvalidRecordPolicy, SourceMapping, normalize_batch};
use crate::report::{ReportModel, build_report, tables};

/// File name of the exported workbook inside the output directory.
pub const REPORT_XLSX: &str = "report.xlsx";
/// File name of the exported JSON document inside the output directory.
pub const REPORT_JSON: &str = "report.json";

/// Raw rows of one source together with its column mapping.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub mapping: SourceMapping,
    pub batch: RawBatch,
}

/// Result of a run: the report and every advisory warning, in the order they
/// were raised.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: ReportModel,
    pub warnings: Vec<Warning>,
}

/// Paths written by [`run_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPaths {
    pub workbook: PathBuf,
    pub json: PathBuf,
}

/// Runs normalization, consolidation, indicators and the report builder over
/// already-read sources. Sources are consolidated in the order given.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub fn process(sources: Vec<SourceInput>, policy: PolicyConfig) -> Result<RunOutput> {
    let mut warnings = Vec::new();
    let mut batches = Vec::with_capacity(sources.len());

    for source in &sources {
        let (batch, skipped) =
            normalize_batch(&source.batch, &source.mapping, policy.invalid_records)?;
        info!(source = %batch.source, records = batch.records.len(), "normalized source");
        warnings.extend(skipped);
        batches.push(batch);
    }

    let (dataset, duplicates) = consolidate(batches, policy.duplicates)?;
    warnings.extend(duplicates);

    let (results, undefined) = indicators::compute(&dataset);
    warnings.extend(undefined);

    let report = build_report(results, policy.undefined_productivity)?;
    Ok(RunOutput { report, warnings })
}

/// Reads one configured source with the matching reader.
pub fn read_source(source: &SourceConfig) -> Result<RawBatch> {
    let name = source.name();
    match source.format()? {
        SourceFormat::Csv => csv_read::read_csv(&source.path, &name, source.delimiter()?),
        SourceFormat::Xlsx => excel_read::read_sheet(&source.path, &name, source.sheet.as_deref()),
    }
}

/// Reads every configured source, in configuration order. With
/// `invalid_records: skip` a source that cannot be read is left out and
/// reported as a warning; otherwise the first read failure aborts.
pub fn load_sources(config: &RunConfig) -> Result<(Vec<SourceInput>, Vec<Warning>)> {
    let mut sources = Vec::with_capacity(config.sources.len());
    let mut warnings = Vec::new();

    for source in &config.sources {
        match read_source(source) {
            Ok(batch) => sources.push(SourceInput {
                mapping: source.mapping(),
                batch,
            }),
            Err(error)
                if error.is_source_read()
                    && config.policy.invalid_records == InvalidRecordPolicy::Skip =>
            {
                warn!(source = %source.name(), %error, "skipping unreadable source");
                warnings.push(Warning::SkippedSource {
                    source: source.name(),
                    reason: error.to_string(),
                });
            }
            Err(error) => return Err(error),
        }
    }
    Ok((sources, warnings))
}

/// Loads the run file, reads and processes every source, without writing anything.
#[instrument(level = "info", skip_all, fields(config = %config_path.display()))]
pub fn check_config(config_path: &Path) -> Result<RunOutput> {
    let config = RunConfig::load_from_path(config_path)?;
    let (sources, mut warnings) = load_sources(&config)?;
    let mut output = process(sources, config.policy)?;
    warnings.append(&mut output.warnings);
    output.warnings = warnings;
    Ok(output)
}

/// Full run: processes the configured sources and exports the report into
/// `output_dir`, creating it when needed.
#[instrument(
    level = "info",
    skip_all,
    fields(config = %config_path.display(), output = %output_dir.display())
)]
pub fn run_config(config_path: &Path, output_dir: &Path) -> Result<(RunOutput, ExportPaths)> {
    let output = check_config(config_path)?;
    let paths = export(&output, output_dir)?;
    Ok((output, paths))
}

/// Writes the workbook and JSON document for a finished run.
pub fn export(output: &RunOutput, output_dir: &Path) -> Result<ExportPaths> {
    fs::create_dir_all(output_dir)?;
    let paths = ExportPaths {
        workbook: output_dir.join(REPORT_XLSX),
        json: output_dir.join(REPORT_JSON),
    };

    let workbook = tables::build_workbook(&output.report, &output.warnings);
    excel_write::write_workbook(&paths.workbook, &workbook)?;
    info!(path = %paths.workbook.display(), "workbook written");

    json_write::write_report_json(&paths.json, &output.report, &output.warnings)?;
    info!(path = %paths.json.display(), "JSON report written");

    if !output.warnings.is_empty() {
        warn!(count = output.warnings.len(), "run finished with warnings");
    }
    Ok(paths)
}
