use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Decimal separator used by a source. When a source does not declare one
/// the separator is inferred from the shape of each value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecimalSeparator {
    #[serde(rename = ".")]
    Dot,
    #[serde(rename = ",")]
    Comma,
}

impl DecimalSeparator {
    fn as_char(self) -> char {
        match self {
            DecimalSeparator::Dot => '.',
            DecimalSeparator::Comma => ',',
        }
    }

    fn other(self) -> char {
        match self {
            DecimalSeparator::Dot => ',',
            DecimalSeparator::Comma => '.',
        }
    }
}

/// Reasons a cell cannot be read as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberError {
    Empty,
    NotNumeric,
    Negative,
    NotInteger,
}

impl fmt::Display for NumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberError::Empty => write!(f, "value is missing"),
            NumberError::NotNumeric => write!(f, "not a number"),
            NumberError::Negative => write!(f, "negative values are not allowed"),
            NumberError::NotInteger => write!(f, "expected a whole number"),
        }
    }
}

const CURRENCY_MARKERS: [&str; 9] = ["US$", "R$", "BRL", "USD", "EUR", "$", "€", "£", "¥"];

/// Parses a non-negative decimal from text written with any of the common
/// thousands/decimal separator conventions.
pub fn parse_decimal(
    raw: &str,
    separator: Option<DecimalSeparator>,
) -> Result<Decimal, NumberError> {
    let mut text = raw.trim();
    if text.is_empty() {
        return Err(NumberError::Empty);
    }

    let mut negative = false;
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        negative = true;
        text = inner.trim();
    }
    if let Some(rest) = text.strip_prefix('-') {
        negative = true;
        text = rest.trim_start();
    } else if let Some(rest) = text.strip_prefix('+') {
        text = rest.trim_start();
    }
    text = strip_currency(text);
    if let Some(rest) = text.strip_prefix('-') {
        negative = true;
        text = rest.trim_start();
    }

    let compact: String = text
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '\'' && *ch != '\u{202f}')
        .collect();
    if !compact.chars().any(|ch| ch.is_ascii_digit())
        || !compact
            .chars()
            .all(|ch| ch.is_ascii_digit() || ch == '.' || ch == ',')
    {
        return Err(NumberError::NotNumeric);
    }

    let normalized = match separator {
        Some(separator) => with_separator(&compact, separator)?,
        None => with_inferred_separator(&compact)?,
    };
    let value = Decimal::from_str(&normalized).map_err(|_| NumberError::NotNumeric)?;

    if negative && !value.is_zero() {
        return Err(NumberError::Negative);
    }
    Ok(value)
}

/// Converts a native numeric cell into a non-negative decimal.
pub fn decimal_from_f64(value: f64) -> Result<Decimal, NumberError> {
    if value.is_sign_negative() && value != 0.0 {
        return Err(NumberError::Negative);
    }
    Decimal::from_f64(value)
        .map(|decimal| decimal.normalize())
        .ok_or(NumberError::NotNumeric)
}

/// Narrows a decimal to a whole, non-negative count.
pub fn to_whole_units(value: Decimal) -> Result<u64, NumberError> {
    if !value.fract().is_zero() {
        return Err(NumberError::NotInteger);
    }
    value.to_u64().ok_or(NumberError::NotInteger)
}

fn strip_currency(text: &str) -> &str {
    let mut text = text;
    for marker in CURRENCY_MARKERS {
        if let Some(rest) = text.strip_prefix(marker) {
            text = rest.trim_start();
            break;
        }
    }
    for marker in CURRENCY_MARKERS {
        if let Some(rest) = text.strip_suffix(marker) {
            text = rest.trim_end();
            break;
        }
    }
    text
}

fn with_separator(text: &str, separator: DecimalSeparator) -> Result<String, NumberError> {
    let decimal = separator.as_char();
    if text.matches(decimal).count() > 1 {
        return Err(NumberError::NotNumeric);
    }
    Ok(text
        .chars()
        .filter(|ch| *ch != separator.other())
        .map(|ch| if ch == decimal { '.' } else { ch })
        .collect())
}

fn with_inferred_separator(text: &str) -> Result<String, NumberError> {
    let dots = text.matches('.').count();
    let commas = text.matches(',').count();

    let separator = match (dots, commas) {
        (0, 0) => return Ok(text.to_string()),
        (_, 0) => single_kind_separator(text, '.', dots),
        (0, _) => single_kind_separator(text, ',', commas),
        _ => {
            // Mixed: whichever appears last is the decimal separator.
            match text.rfind(['.', ',']).and_then(|idx| text[idx..].chars().next()) {
                Some(',') => Some(DecimalSeparator::Comma),
                _ => Some(DecimalSeparator::Dot),
            }
        }
    };

    match separator {
        Some(separator) => with_separator(text, separator),
        None => Ok(text.chars().filter(|ch| *ch != '.' && *ch != ',').collect()),
    }
}

/// Decides whether a lone separator kind is decimal (`Some`) or grouping (`None`).
fn single_kind_separator(text: &str, mark: char, count: usize) -> Option<DecimalSeparator> {
    let as_decimal = if mark == ',' {
        DecimalSeparator::Comma
    } else {
        DecimalSeparator::Dot
    };
    if count > 1 {
        return None;
    }
    let (integer, fraction) = text.split_once(mark)?;
    let looks_grouped = fraction.len() == 3
        && !integer.is_empty()
        && integer.len() <= 3
        && !integer.starts_with('0');
    if looks_grouped { None } else { Some(as_decimal) }
}
