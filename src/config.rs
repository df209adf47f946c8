use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consolidate::DuplicatePolicy;
use crate::error::{ReportError, Result};
use crate::io::{self, SourceFormat};
use crate::model::CanonicalField;
use crate::normalize::{DecimalSeparator, InvalidRecordPolicy, SourceMapping};
use crate::report::UndefinedProductivityPolicy;

/// One input file and how its columns map onto the canonical schema.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Name used in warnings and errors; defaults to the file name.
    #[serde(default)]
    pub name: Option<String>,
    pub path: PathBuf,
    #[serde(default)]
    pub format: Option<SourceFormat>,
    /// Worksheet to read from workbooks; the first sheet when absent.
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub decimal_separator: Option<DecimalSeparator>,
    #[serde(default)]
    pub truncate_to_month: bool,
    pub columns: BTreeMap<String, CanonicalField>,
}

impl SourceConfig {
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.display().to_string())
        })
    }

    pub fn format(&self) -> Result<SourceFormat> {
        match self.format {
            Some(format) => Ok(format),
            None => io::detect_format(&self.path),
        }
    }

    /// CSV field delimiter as a byte; `,` unless configured.
    pub fn delimiter(&self) -> Result<u8> {
        let delimiter = self.delimiter.unwrap_or(',');
        u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ReportError::Config(format!(
                    "source '{}': delimiter '{delimiter}' must be a single ASCII character",
                    self.name()
                ))
            })
    }

    pub fn mapping(&self) -> SourceMapping {
        SourceMapping {
            source: self.name(),
            columns: self.columns.clone(),
            decimal_separator: self.decimal_separator,
            truncate_to_month: self.truncate_to_month,
        }
    }
}

/// Policy points of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub duplicates: DuplicatePolicy,
    pub undefined_productivity: UndefinedProductivityPolicy,
    pub invalid_records: InvalidRecordPolicy,
}

/// A complete run: sources in ingestion order plus policies.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub policy: PolicyConfig,
}

impl RunConfig {
    /// Loads and validates a YAML run file. Relative source paths are
    /// resolved against the directory containing the file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReportError::MissingInput(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        if let Some(base) = path.parent() {
            for source in &mut config.sources {
                if source.path.is_relative() {
                    source.path = base.join(&source.path);
                }
            }
        }
        debug!(path = %path.display(), sources = config.sources.len(), "loaded run configuration");
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(ReportError::Config("at least one source is required".into()));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            let name = source.name();
            if !names.insert(name.clone()) {
                return Err(ReportError::Config(format!(
                    "source name '{name}' is used more than once"
                )));
            }
            source.delimiter()?;
            source.mapping().validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
sources:
  - name: filial-sp
    path: data/sp.csv
    delimiter: ";"
    decimal_separator: ","
    columns:
      Mes: period
      Setor: category
      Receita: revenue
      Despesa: cost
      Producao: units_produced
      Horas: labor_hours
  - path: data/rj.xlsx
    sheet: Janeiro
    truncate_to_month: true
    columns:
      Data: period
      Area: category
      Faturamento: revenue
      Custos: cost
policy:
  duplicates: first_writer_wins
  invalid_records: skip
"#;

    #[test]
    fn parses_sources_and_policies() {
        let config = RunConfig::from_yaml(CONFIG).expect("config parsed");
        assert_eq!(config.sources.len(), 2);

        let sp = &config.sources[0];
        assert_eq!(sp.name(), "filial-sp");
        assert_eq!(sp.delimiter().unwrap(), b';');
        assert_eq!(sp.decimal_separator, Some(DecimalSeparator::Comma));
        assert_eq!(sp.format().unwrap(), SourceFormat::Csv);
        assert_eq!(sp.columns.get("Horas"), Some(&CanonicalField::LaborHours));

        let rj = &config.sources[1];
        assert_eq!(rj.name(), "rj.xlsx");
        assert_eq!(rj.format().unwrap(), SourceFormat::Xlsx);
        assert!(rj.mapping().truncate_to_month);
        assert_eq!(rj.delimiter().unwrap(), b',');

        assert_eq!(config.policy.duplicates, DuplicatePolicy::FirstWriterWins);
        assert_eq!(config.policy.invalid_records, InvalidRecordPolicy::Skip);
        assert_eq!(
            config.policy.undefined_productivity,
            UndefinedProductivityPolicy::Exclude
        );
    }

    #[test]
    fn rejects_incomplete_mappings() {
        let yaml = r#"
sources:
  - path: a.csv
    columns:
      Mes: period
      Receita: revenue
"#;
        assert!(matches!(
            RunConfig::from_yaml(yaml),
            Err(ReportError::Schema { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_names_and_empty_source_lists() {
        let yaml = r#"
sources:
  - path: a/x.csv
    columns: { M: period, C: category, R: revenue, D: cost }
  - path: b/x.csv
    columns: { M: period, C: category, R: revenue, D: cost }
"#;
        assert!(matches!(RunConfig::from_yaml(yaml), Err(ReportError::Config(_))));
        assert!(matches!(
            RunConfig::from_yaml("sources: []"),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn unknown_canonical_fields_fail_to_parse() {
        let yaml = r#"
sources:
  - path: a.csv
    columns: { M: period, C: category, R: revenue, D: cost, X: headcount }
"#;
        assert!(matches!(RunConfig::from_yaml(yaml), Err(ReportError::Yaml(_))));
    }

    #[test]
    fn relative_paths_resolve_against_the_config_directory() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let config_path = dir.path().join("run.yaml");
        fs::write(&config_path, CONFIG).expect("config written");

        let config = RunConfig::load_from_path(&config_path).expect("config loaded");
        assert_eq!(config.sources[0].path, dir.path().join("data/sp.csv"));
    }
}
