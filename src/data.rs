//! Scalar cell values, grouping keys, and amount/date coercion.
//!
//! Uploaded files produce untyped [`Cell`]s: delimited text yields only
//! [`Cell::Text`] and [`Cell::Empty`], while workbooks keep the cell type the
//! spreadsheet recorded. The Type Normalizer turns the amount and date cells
//! into [`Decimal`] and [`NaiveDate`] through [`coerce_amount`] and
//! [`coerce_date`]; every other role keeps its raw cell as a [`GroupKey`].

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Builds a cell from a raw text field, treating the empty string as blank.
    pub fn from_text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{f:.0}")
                } else {
                    f.to_string()
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Bool(_) => 1,
            Cell::Number(_) => 2,
            Cell::Date(_) => 3,
            Cell::DateTime(_) => 4,
            Cell::Text(_) => 5,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Number(f) => serializer.serialize_f64(*f),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            other => serializer.serialize_str(&other.as_display()),
        }
    }
}

/// A cell used as a grouping key.
///
/// Equality is exact value equality: no case folding, no trimming, and a
/// text `"1"` never equals a numeric `1`. Keys are totally ordered (by kind,
/// then by value) so ties in aggregate tables can be broken by key.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct GroupKey(Cell);

impl GroupKey {
    pub fn new(cell: Cell) -> Self {
        match cell {
            // -0.0 and 0.0 are the same value
            Cell::Number(f) if f == 0.0 => GroupKey(Cell::Number(0.0)),
            other => GroupKey(other),
        }
    }

    pub fn text(value: &str) -> Self {
        GroupKey(Cell::from_text(value))
    }

    pub fn cell(&self) -> &Cell {
        &self.0
    }
}

impl From<Cell> for GroupKey {
    fn from(cell: Cell) -> Self {
        GroupKey::new(cell)
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Cell::Empty, Cell::Empty) => Ordering::Equal,
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::Bool(a), Cell::Bool(b)) => a.cmp(b),
            (Cell::Date(a), Cell::Date(b)) => a.cmp(b),
            (Cell::DateTime(a), Cell::DateTime(b)) => a.cmp(b),
            (left, right) => left.rank().cmp(&right.rank()),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.rank().hash(state);
        match &self.0 {
            Cell::Empty => {}
            Cell::Text(s) => s.hash(state),
            Cell::Number(f) => f.to_bits().hash(state),
            Cell::Bool(b) => b.hash(state),
            Cell::Date(d) => d.hash(state),
            Cell::DateTime(dt) => dt.hash(state),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Which component comes first in ambiguous `01/02/2024` style dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

impl DateOrder {
    fn other(self) -> Self {
        match self {
            DateOrder::MonthFirst => DateOrder::DayFirst,
            DateOrder::DayFirst => DateOrder::MonthFirst,
        }
    }

    fn date_formats(self) -> &'static [&'static str] {
        match self {
            // two-digit years first: "%Y" would read "24" as the year 24
            DateOrder::MonthFirst => &["%m/%d/%y", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"],
            DateOrder::DayFirst => &["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"],
        }
    }

    fn datetime_formats(self) -> &'static [&'static str] {
        match self {
            DateOrder::MonthFirst => &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"],
            DateOrder::DayFirst => &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"],
        }
    }
}

const YEAR_FIRST_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const MONTH_NAME_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

const YEAR_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parses a calendar date from free-form text, discarding any time of day.
pub fn parse_naive_date(value: &str, order: DateOrder) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if let Some(date) = parse_compact_date(trimmed) {
        return Ok(date);
    }
    if starts_with_year(trimmed) {
        for fmt in YEAR_FIRST_DATE_FORMATS {
            if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
                return Ok(parsed);
            }
        }
        for fmt in YEAR_FIRST_DATETIME_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Ok(parsed.date());
            }
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(parsed.date_naive());
        }
    }
    for fmt in MONTH_NAME_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    for candidate in [order, order.other()] {
        for fmt in candidate.date_formats() {
            if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
                return Ok(parsed);
            }
        }
        for fmt in candidate.datetime_formats() {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Ok(parsed.date());
            }
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

fn starts_with_year(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() > 4 && bytes[..4].iter().all(u8::is_ascii_digit) && !bytes[4].is_ascii_digit()
}

fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = value[0..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    let day = value[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses a plain or scientific-notation decimal number.
pub fn parse_decimal_amount(value: &str) -> Result<Decimal> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(anyhow!("Empty amount"));
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| anyhow!("Failed to parse '{value}' as a number"))
}

/// Coerces an amount cell, returning `None` when the row must be dropped.
///
/// Magnitudes beyond [`Decimal::MAX`] (about 7.9e28) are not representable
/// and are dropped like any other unparseable amount.
pub fn coerce_amount(cell: &Cell) -> Option<Decimal> {
    match cell {
        Cell::Text(s) => parse_decimal_amount(s).ok(),
        Cell::Number(f) if f.is_finite() => Decimal::from_f64(*f),
        _ => None,
    }
}

/// Coerces a date cell, returning `None` when the row must be dropped.
pub fn coerce_date(cell: &Cell, order: DateOrder) -> Option<NaiveDate> {
    match cell {
        Cell::Text(s) => parse_naive_date(s, order).ok(),
        Cell::Date(d) => Some(*d),
        Cell::DateTime(dt) => Some(dt.date()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn amounts_beyond_decimal_range_are_rejected() {
        assert_eq!(coerce_amount(&Cell::Text("1e30".into())), None);
        assert_eq!(coerce_amount(&Cell::Number(1e30)), None);
        assert_eq!(
            coerce_amount(&Cell::Text("7e28".into())),
            Some(Decimal::from_scientific("7e28").unwrap())
        );
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_naive_date_supports_multiple_formats() {
        let expected = ymd(2024, 5, 6);
        let order = DateOrder::MonthFirst;
        assert_eq!(parse_naive_date("2024-05-06", order).unwrap(), expected);
        assert_eq!(parse_naive_date("05/06/2024", order).unwrap(), expected);
        assert_eq!(parse_naive_date("2024/05/06", order).unwrap(), expected);
        assert_eq!(parse_naive_date("20240506", order).unwrap(), expected);
        assert_eq!(parse_naive_date("6 May 2024", order).unwrap(), expected);
        assert_eq!(parse_naive_date("May 6, 2024", order).unwrap(), expected);
        assert_eq!(
            parse_naive_date("2024-05-06T14:30:00", order).unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_date("2024-05-06T14:30:00+07:00", order).unwrap(),
            expected
        );
    }

    #[test]
    fn day_first_order_flips_ambiguous_dates() {
        assert_eq!(
            parse_naive_date("05/06/2024", DateOrder::DayFirst).unwrap(),
            ymd(2024, 6, 5)
        );
        assert_eq!(
            parse_naive_date("05/06/2024", DateOrder::MonthFirst).unwrap(),
            ymd(2024, 5, 6)
        );
    }

    #[test]
    fn impossible_month_falls_back_to_other_order() {
        assert_eq!(
            parse_naive_date("25/12/2024", DateOrder::MonthFirst).unwrap(),
            ymd(2024, 12, 25)
        );
    }

    #[test]
    fn parse_naive_date_rejects_garbage() {
        assert!(parse_naive_date("not a date", DateOrder::MonthFirst).is_err());
        assert!(parse_naive_date("2024-13-45", DateOrder::MonthFirst).is_err());
        assert!(parse_naive_date("", DateOrder::MonthFirst).is_err());
    }

    #[test]
    fn two_digit_years_land_in_this_century() {
        assert_eq!(
            parse_naive_date("1/2/24", DateOrder::MonthFirst).unwrap(),
            ymd(2024, 1, 2)
        );
    }

    #[test]
    fn coerce_amount_handles_text_and_numbers() {
        assert_eq!(
            coerce_amount(&Cell::Text(" 12.50 ".into())),
            Some(Decimal::new(1250, 2))
        );
        assert_eq!(
            coerce_amount(&Cell::Text("1e3".into())),
            Some(Decimal::from(1000))
        );
        assert_eq!(coerce_amount(&Cell::Number(7.0)), Some(Decimal::from(7)));
        assert_eq!(coerce_amount(&Cell::Text("bad".into())), None);
        assert_eq!(coerce_amount(&Cell::Number(f64::NAN)), None);
        assert_eq!(coerce_amount(&Cell::Empty), None);
        assert_eq!(coerce_amount(&Cell::Bool(true)), None);
    }

    #[test]
    fn coerce_date_accepts_workbook_date_cells() {
        let dt = ymd(2024, 1, 2).and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(
            coerce_date(&Cell::DateTime(dt), DateOrder::MonthFirst),
            Some(ymd(2024, 1, 2))
        );
        assert_eq!(coerce_date(&Cell::Number(45292.0), DateOrder::MonthFirst), None);
    }

    #[test]
    fn group_keys_use_exact_equality() {
        assert_ne!(GroupKey::text("North"), GroupKey::text("north"));
        assert_ne!(GroupKey::text("1"), GroupKey::new(Cell::Number(1.0)));
        assert_eq!(
            GroupKey::new(Cell::Number(-0.0)),
            GroupKey::new(Cell::Number(0.0))
        );
        assert!(GroupKey::new(Cell::Number(5.0)) < GroupKey::text("A"));
    }
}
