pub mod csv_read;
pub mod excel_read;
pub mod excel_write;
pub mod json_write;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

/// File formats a source can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

/// Infers the source format from the file extension.
pub fn detect_format(path: &Path) -> Result<SourceFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "csv" | "txt" => Ok(SourceFormat::Csv),
        "xlsx" | "xlsm" => Ok(SourceFormat::Xlsx),
        other => Err(ReportError::UnsupportedFormat(format!(
            "'{}' (extension '{other}')",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats_from_extension() {
        assert_eq!(detect_format(Path::new("a/b.CSV")).unwrap(), SourceFormat::Csv);
        assert_eq!(detect_format(Path::new("sales.xlsx")).unwrap(), SourceFormat::Xlsx);
        assert!(matches!(
            detect_format(Path::new("notes.pdf")),
            Err(ReportError::UnsupportedFormat(_))
        ));
    }
}
