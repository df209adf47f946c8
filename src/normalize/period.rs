use chrono::{Duration, NaiveDate};

use crate::model::{CellValue, Period};

/// Full-date layouts accepted in text cells. Slash-separated dates are read day first.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y"];

/// Largest serial Excel can represent (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Reads a period from a cell. Returns `None` when the cell holds no
/// recognisable date or year-month.
pub fn parse_period(cell: &CellValue) -> Option<Period> {
    match cell {
        CellValue::Date(date) => Some(Period::day(*date)),
        CellValue::Number(serial) => excel_serial_to_date(*serial).map(Period::day),
        CellValue::Text(text) => parse_period_text(text),
        CellValue::Empty => None,
    }
}

fn parse_period_text(raw: &str) -> Option<Period> {
    let text = raw.trim();
    let date_part = match text.char_indices().nth(10) {
        Some((idx, ' ' | 'T')) => &text[..idx],
        _ => text,
    };

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(Period::day(date));
        }
    }

    let (first, second) = date_part.split_once(['-', '/', '.'])?;
    let (year, month) = match (first.len(), second.len()) {
        (4, 1..=2) => (first, second),
        (1..=2, 4) => (second, first),
        _ => return None,
    };
    if !year.chars().chain(month.chars()).all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    Period::month(year.parse().ok()?, month.parse().ok()?)
}

/// Converts an Excel serial day number (1900 date system) into a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> Option<Period> {
        Period::month(year, month)
    }

    fn day(year: i32, month: u32, day: u32) -> Option<Period> {
        NaiveDate::from_ymd_opt(year, month, day).map(Period::day)
    }

    #[test]
    fn reads_year_month_layouts() {
        for text in ["2024-01", "2024/1", "01/2024", "1-2024"] {
            assert_eq!(
                parse_period(&CellValue::Text(text.into())),
                month(2024, 1),
                "{text}"
            );
        }
    }

    #[test]
    fn reads_full_dates_day_first() {
        assert_eq!(
            parse_period(&CellValue::Text("2024-03-05".into())),
            day(2024, 3, 5)
        );
        assert_eq!(
            parse_period(&CellValue::Text("05/03/2024".into())),
            day(2024, 3, 5)
        );
        assert_eq!(
            parse_period(&CellValue::Text("2024-03-05 10:30:00".into())),
            day(2024, 3, 5)
        );
    }

    #[test]
    fn reads_excel_serials_and_native_dates() {
        assert_eq!(parse_period(&CellValue::Number(45292.0)), day(2024, 1, 1));
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(parse_period(&CellValue::Date(date)), Some(Period::day(date)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_period(&CellValue::Text("janeiro".into())), None);
        assert_eq!(parse_period(&CellValue::Text("2024-13".into())), None);
        assert_eq!(parse_period(&CellValue::Number(-3.0)), None);
        assert_eq!(parse_period(&CellValue::Empty), None);
    }
}
