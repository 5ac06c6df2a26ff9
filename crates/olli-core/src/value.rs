//! Data values, records and calendar time units.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// A single record: field name to value.
pub type Datum = BTreeMap<String, Value>;

/// An ordered collection of records.
pub type Dataset = Vec<Datum>;

/// A cell value in a dataset or predicate operand.
///
/// Dates are UTC instants. When a date is compared against a number, the
/// number is read as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Missing value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    String(String),
    /// A point in time. Never produced by deserialization directly; temporal
    /// fields are converted by the spec elaborator.
    Date(DateTime<Utc>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A value is valid when it is present and not NaN.
    pub fn is_valid(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Number(n) => !n.is_nan(),
            _ => true,
        }
    }

    /// Numeric view of the value; dates become epoch milliseconds.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Date(d) => Some(d.timestamp_millis() as f64),
            _ => None,
        }
    }

    /// The string slice, for text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The instant, for date values.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Compare two values of compatible kinds.
    ///
    /// Numbers and dates compare through epoch milliseconds. Returns `None`
    /// for incompatible kinds or NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Equality with date/number normalization.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Returns `true` if the two values can be ordered against each other.
    pub fn is_comparable_with(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => true,
            (Value::Bool(_), Value::Bool(_)) | (Value::String(_), Value::String(_)) => true,
            (a, b) => a.as_f64().is_some() && b.as_f64().is_some(),
        }
    }

    /// Total order used for sorting mixed columns: nulls, booleans, numbers
    /// and dates, then strings.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) | Value::Date(_) => 2,
                Value::String(_) => 3,
            }
        }
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => rank(a).cmp(&rank(b)),
            },
        }
    }

    /// Format the value for speech, honoring an optional time unit.
    pub fn format_with(&self, time_unit: Option<TimeUnit>) -> String {
        match (self, time_unit) {
            (Value::Date(d), Some(unit)) => unit.format(d),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::Date(d) => {
                if d.hour() == 0 && d.minute() == 0 && d.second() == 0 {
                    write!(f, "{}", d.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", d.format("%Y-%m-%d %H:%M"))
                }
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

/// Format a number for speech: integers without a fractional part, other
/// values rounded to two decimals with trailing zeros removed.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{n:.0}");
    }
    let s = format!("{n:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Parse an ISO-8601 style date or datetime string.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD`. Naive values are read as UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Like [`parse_date`], additionally accepting `YYYY-MM` and bare four-digit
/// years. Used only for fields already declared temporal.
pub fn parse_date_lenient(s: &str) -> Option<DateTime<Utc>> {
    if let Some(d) = parse_date(s) {
        return Some(d);
    }
    let s = s.trim();
    if let Some((y, m)) = s.split_once('-')
        && let (Ok(year), Ok(month)) = (y.parse::<i32>(), m.parse::<u32>())
    {
        return Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single();
    }
    if s.len() == 4
        && let Ok(year) = s.parse::<i32>()
    {
        return Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
    }
    None
}

/// Calendar time units, named as in Vega-Lite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Year,
    Quarter,
    Month,
    /// Day of the month.
    Date,
    /// Day of the week.
    Day,
    Hours,
    Minutes,
    Seconds,
    YearQuarter,
    YearMonth,
    YearMonthDate,
    MonthDate,
    HoursMinutes,
}

impl TimeUnit {
    /// Returns `true` if the unit keeps the year, so keys are instants.
    pub fn includes_year(self) -> bool {
        matches!(
            self,
            TimeUnit::Year | TimeUnit::YearQuarter | TimeUnit::YearMonth | TimeUnit::YearMonthDate
        )
    }

    /// Grouping key for a date under this unit. Two dates fall in the same
    /// group exactly when their keys are equal; keys sort chronologically.
    pub fn key(self, d: &DateTime<Utc>) -> i64 {
        let quarter = i64::from(d.month0() / 3);
        match self {
            TimeUnit::Year => i64::from(d.year()),
            TimeUnit::Quarter => quarter,
            TimeUnit::Month => i64::from(d.month0()),
            TimeUnit::Date => i64::from(d.day()),
            TimeUnit::Day => i64::from(d.weekday().num_days_from_sunday()),
            TimeUnit::Hours => i64::from(d.hour()),
            TimeUnit::Minutes => i64::from(d.minute()),
            TimeUnit::Seconds => i64::from(d.second()),
            TimeUnit::YearQuarter => i64::from(d.year()) * 4 + quarter,
            TimeUnit::YearMonth => i64::from(d.year()) * 12 + i64::from(d.month0()),
            TimeUnit::YearMonthDate => {
                (i64::from(d.year()) * 12 + i64::from(d.month0())) * 31 + i64::from(d.day0())
            }
            TimeUnit::MonthDate => i64::from(d.month0()) * 31 + i64::from(d.day0()),
            TimeUnit::HoursMinutes => i64::from(d.hour()) * 60 + i64::from(d.minute()),
        }
    }

    /// Format a date at this unit's granularity.
    pub fn format(self, d: &DateTime<Utc>) -> String {
        let quarter = d.month0() / 3 + 1;
        match self {
            TimeUnit::Year => d.format("%Y").to_string(),
            TimeUnit::Quarter => format!("Q{quarter}"),
            TimeUnit::Month => d.format("%B").to_string(),
            TimeUnit::Date => d.day().to_string(),
            TimeUnit::Day => d.format("%A").to_string(),
            TimeUnit::Hours => d.format("%H:00").to_string(),
            TimeUnit::Minutes => d.format("minute %M").to_string(),
            TimeUnit::Seconds => d.format("second %S").to_string(),
            TimeUnit::YearQuarter => format!("Q{quarter} {}", d.year()),
            TimeUnit::YearMonth => d.format("%B %Y").to_string(),
            TimeUnit::YearMonthDate => d.format("%B %-d, %Y").to_string(),
            TimeUnit::MonthDate => d.format("%B %-d").to_string(),
            TimeUnit::HoursMinutes => d.format("%H:%M").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_date_with_number() {
        let d = parse_date("2020-01-01").unwrap();
        let millis = d.timestamp_millis() as f64;
        assert!(Value::Date(d).loosely_equals(&Value::Number(millis)));
        assert_eq!(
            Value::Date(d).compare(&Value::Number(millis + 1.0)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_incompatible_compare() {
        assert_eq!(Value::from("a").compare(&Value::from(1.0)), None);
        assert!(!Value::from("a").is_comparable_with(&Value::from(1.0)));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
    }

    #[test]
    fn test_parse_dates() {
        assert!(parse_date("2021-03-04").is_some());
        assert!(parse_date("2021-03-04T05:06:07Z").is_some());
        assert!(parse_date("hello").is_none());
        assert!(parse_date("2021").is_none());
        assert!(parse_date_lenient("2021").is_some());
        assert!(parse_date_lenient("2021-07").is_some());
    }

    #[test]
    fn test_time_unit_keys() {
        let a = parse_date("2020-01-15").unwrap();
        let b = parse_date("2021-01-02").unwrap();
        assert_eq!(TimeUnit::Month.key(&a), TimeUnit::Month.key(&b));
        assert_ne!(TimeUnit::YearMonth.key(&a), TimeUnit::YearMonth.key(&b));
        assert!(TimeUnit::YearMonth.key(&a) < TimeUnit::YearMonth.key(&b));
        assert_eq!(TimeUnit::YearMonth.format(&a), "January 2020");
    }

    #[test]
    fn test_deserialize_values() {
        let v: Vec<Value> = serde_json::from_str(r#"[null, true, 1.5, "x"]"#).unwrap();
        assert_eq!(
            v,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Number(1.5),
                Value::String("x".into())
            ]
        );
    }
}
