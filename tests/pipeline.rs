use std::fs;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use report_consolidator::ReportError;
use report_consolidator::model::{Period, Warning};
use report_consolidator::pipeline::{self, REPORT_JSON, REPORT_XLSX};
use report_consolidator::report::tables::{CONSOLIDATED_SHEET, SUMMARY_SHEET};
use rust_decimal::Decimal;
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

const CONFIG: &str = r#"
sources:
  - name: filial-sp
    path: sp.csv
    delimiter: ";"
    columns:
      Mes: period
      Setor: category
      Receita: revenue
      Despesa: cost
      Producao: units_produced
      Horas: labor_hours
  - name: filial-rj
    path: rj.xlsx
    columns:
      Period: period
      Department: category
      Revenue: revenue
      Cost: cost
      Units: units_produced
      Hours: labor_hours
"#;

fn write_sp_csv(dir: &Path) {
    let csv = "Mes;Setor;Receita;Despesa;Producao;Horas\n\
               2024-01;A;1.000,00;600,00;50;100\n\
               2024-02;A;R$ 1.200,00;700,00;60;120\n";
    fs::write(dir.join("sp.csv"), csv).expect("CSV written");
}

fn write_rj_xlsx(dir: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let headers = ["Period", "Department", "Revenue", "Cost", "Units", "Hours"];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).expect("header");
    }
    sheet.write_string(1, 0, "2024-01").expect("period");
    sheet.write_string(1, 1, "B").expect("category");
    sheet.write_number(1, 2, 2000.0).expect("revenue");
    sheet.write_number(1, 3, 1500.0).expect("cost");
    sheet.write_number(1, 4, 80.0).expect("units");
    sheet.write_number(1, 5, 0.0).expect("hours");
    // Same key as the first CSV row; ingested later, so it wins.
    sheet.write_string(2, 0, "01/2024").expect("period");
    sheet.write_string(2, 1, "A").expect("category");
    sheet.write_number(2, 2, 1100.0).expect("revenue");
    sheet.write_number(2, 3, 600.0).expect("cost");
    sheet.write_number(2, 4, 40.0).expect("units");
    sheet.write_number(2, 5, 80.0).expect("hours");
    workbook.save(dir.join("rj.xlsx")).expect("workbook saved");
}

fn summary_value(path: &Path, indicator: &str) -> Option<f64> {
    let mut workbook: Xlsx<_> = open_workbook(path).expect("report opened");
    let range = workbook
        .worksheet_range(SUMMARY_SHEET)
        .expect("summary sheet present")
        .expect("summary sheet read");
    range.rows().skip(1).find_map(|row| match (row.first(), row.get(1)) {
        (Some(DataType::String(name)), Some(DataType::Float(value))) if name == indicator => {
            Some(*value)
        }
        _ => None,
    })
}

#[test]
fn csv_and_workbook_sources_are_consolidated_and_exported() {
    let dir = tempdir().expect("temporary directory");
    write_sp_csv(dir.path());
    write_rj_xlsx(dir.path());
    let config_path = dir.path().join("run.yaml");
    fs::write(&config_path, CONFIG).expect("config written");
    let output_dir = dir.path().join("out");

    let (output, paths) = pipeline::run_config(&config_path, &output_dir).expect("run succeeded");
    assert_eq!(paths.workbook, output_dir.join(REPORT_XLSX));
    assert_eq!(paths.json, output_dir.join(REPORT_JSON));

    let report = &output.report;
    let january = Period::month(2024, 1).unwrap();
    let a = report.get(january, "A").expect("A in January");
    assert_eq!(a.revenue, Decimal::from(1100));
    assert_eq!(a.origin.source, "filial-rj");
    assert_eq!(report.table().len(), 3);
    assert_eq!(report.table()[0].category, "A");

    // January: A = 1100 - 600, B = 2000 - 1500.
    assert_eq!(report.period(january).unwrap().totals.profit, Decimal::from(1000));
    assert_eq!(report.summary().totals.profit, Decimal::from(1500));
    // A January 40/80 and A February 60/120; B has no hours.
    assert_eq!(
        report.summary().totals.average_productivity,
        Some(Decimal::new(5, 1))
    );

    let duplicates: Vec<_> = output
        .warnings
        .iter()
        .filter_map(|warning| match warning {
            Warning::DuplicateKey(duplicate) => Some(duplicate),
            _ => None,
        })
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].replaced.source, "filial-sp");
    assert_eq!(duplicates[0].kept.source, "filial-rj");

    assert_eq!(summary_value(&paths.workbook, "Net profit"), Some(1500.0));
    assert_eq!(summary_value(&paths.workbook, "Average productivity"), Some(0.5));

    let mut workbook: Xlsx<_> = open_workbook(&paths.workbook).expect("report opened");
    let consolidated = workbook
        .worksheet_range(CONSOLIDATED_SHEET)
        .expect("consolidated sheet present")
        .expect("consolidated sheet read");
    assert_eq!(consolidated.rows().count(), 4);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.json).expect("JSON read"))
            .expect("JSON parsed");
    assert_eq!(json["report"]["summary"]["periods"], 2);
    assert_eq!(json["charts"][0]["id"], "revenue_by_period");
    assert_eq!(json["charts"][0]["x"], serde_json::json!(["2024-01", "2024-02"]));
    assert!(json["report"]["table"][2]["productivity"].is_null());
}

#[test]
fn check_reports_the_offending_record() {
    let dir = tempdir().expect("temporary directory");
    fs::write(
        dir.path().join("sp.csv"),
        "Mes;Setor;Receita;Despesa;Producao;Horas\n2024-01;A;muito;600;1;1\n",
    )
    .expect("CSV written");
    write_rj_xlsx(dir.path());
    let config_path = dir.path().join("run.yaml");
    fs::write(&config_path, CONFIG).expect("config written");

    let err = pipeline::check_config(&config_path).unwrap_err();
    match err {
        ReportError::Value {
            location, column, ..
        } => {
            assert_eq!(location.source, "filial-sp");
            assert_eq!(location.row, 2);
            assert_eq!(column, "Receita");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn skip_policy_keeps_the_run_going() {
    let dir = tempdir().expect("temporary directory");
    fs::write(
        dir.path().join("sp.csv"),
        "Mes;Setor;Receita;Despesa;Producao;Horas\n\
         2024-01;A;muito;600;1;1\n\
         2024-03;C;10;-4;1;1\n\
         2024-03;C;10;4;1;1\n",
    )
    .expect("CSV written");
    write_rj_xlsx(dir.path());
    let config_path = dir.path().join("run.yaml");
    fs::write(
        &config_path,
        format!("{CONFIG}policy:\n  invalid_records: skip\n"),
    )
    .expect("config written");

    let output = pipeline::check_config(&config_path).expect("run succeeded");
    let skipped: Vec<usize> = output
        .warnings
        .iter()
        .filter_map(|warning| match warning {
            Warning::SkippedRecord { location, .. } => Some(location.row),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, vec![2, 3]);
    assert_eq!(output.report.table().len(), 3);
}

#[test]
fn missing_source_file_is_reported() {
    let dir = tempdir().expect("temporary directory");
    let config_path = dir.path().join("run.yaml");
    fs::write(&config_path, CONFIG).expect("config written");

    assert!(matches!(
        pipeline::check_config(&config_path),
        Err(ReportError::MissingInput(path)) if path.ends_with("sp.csv")
    ));
}

#[test]
fn unreadable_source_is_skipped_with_a_warning() {
    let dir = tempdir().expect("temporary directory");
    write_sp_csv(dir.path());
    fs::write(dir.path().join("rj.xlsx"), "not a workbook").expect("bogus file written");
    let config_path = dir.path().join("run.yaml");
    fs::write(
        &config_path,
        format!("{CONFIG}policy:\n  invalid_records: skip\n"),
    )
    .expect("config written");

    let output = pipeline::check_config(&config_path).expect("run succeeded");
    assert!(matches!(
        output.warnings.first(),
        Some(Warning::SkippedSource { source, .. }) if source == "filial-rj"
    ));
    assert_eq!(output.report.table().len(), 2);

    fs::write(&config_path, CONFIG).expect("config written");
    assert!(matches!(
        pipeline::check_config(&config_path),
        Err(ReportError::ExcelRead(_))
    ));
}
