//! Bin boundaries for continuous fields.
//!
//! Bins come from, in order of preference:
//! - the distinct values of categorical or time-unit fields (degenerate bins)
//! - a paired `<field>_end` column for data the chart already binned
//! - axis tick values, padded to cover data outside the ticks
//! - calendar-aligned ticks for temporal fields
//! - the nice-step histogram heuristic for quantitative fields

use chrono::{DateTime, Datelike, Months, TimeDelta, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{domain_of, extent};
use crate::error::{Error, Result};
use crate::predicate::{Predicate, selection_test};
use crate::spec::{FieldDef, MeasureType};
use crate::value::{Datum, Value, parse_date_lenient};

/// Maximum number of bins produced by the nice-step heuristic.
pub const DEFAULT_MAX_BINS: usize = 10;

/// Approximate number of ticks generated for temporal fields.
pub const TEMPORAL_TICK_COUNT: usize = 6;

/// A `[low, high]` range of field values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub low: Value,
    pub high: Value,
}

impl Bin {
    pub fn new(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }

    /// A bin holding exactly one value.
    pub fn degenerate(value: Value) -> Self {
        Self {
            low: value.clone(),
            high: value,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.low.loosely_equals(&self.high)
    }
}

/// Compute the bins of `field` over `data`.
///
/// `fields` must define `field`. `ticks`, when given, are used as bin
/// boundaries. When `domain_filter` is given only matching records
/// contribute to the extent. Returns an empty list for data without valid
/// values.
pub fn get_bins(
    field: &str,
    data: &[Datum],
    fields: &[FieldDef],
    ticks: Option<&[Value]>,
    domain_filter: Option<&Predicate>,
) -> Result<Vec<Bin>> {
    let def = fields
        .iter()
        .find(|f| f.field == field)
        .ok_or_else(|| Error::unknown_field(field, "bin computation"))?;
    let rows: Vec<&Datum> = match domain_filter {
        Some(p) => selection_test(data, p),
        None => data.iter().collect(),
    };
    let measure = def.measure_type();

    if measure.is_categorical() || def.time_unit.is_some() {
        return Ok(domain_of(field, def.time_unit, &rows)
            .into_iter()
            .map(Bin::degenerate)
            .collect());
    }

    let Some((min, max)) = extent(field, &rows) else {
        return Ok(Vec::new());
    };

    let end_field = format!("{field}_end");
    if rows.iter().any(|d| d.contains_key(&end_field)) {
        return Ok(prebinned(field, &end_field, &rows));
    }

    if min.loosely_equals(&max) {
        return Ok(vec![Bin::degenerate(min)]);
    }

    if let Some(ticks) = ticks.filter(|t| !t.is_empty()) {
        let ticks: Vec<Value> = if measure == MeasureType::Temporal {
            ticks.iter().filter_map(tick_as_date).collect()
        } else {
            ticks.to_vec()
        };
        return Ok(bins_from_ticks(ticks, &min, &max));
    }

    match measure {
        MeasureType::Temporal => match (min.as_date(), max.as_date()) {
            (Some(lo), Some(hi)) => {
                let ticks = time_ticks(lo, hi, TEMPORAL_TICK_COUNT)
                    .into_iter()
                    .map(Value::Date)
                    .collect();
                Ok(bins_from_ticks(ticks, &min, &max))
            }
            _ => Err(Error::invalid_value(
                field,
                "temporal field holds non-date values",
            )),
        },
        _ => match (min.as_f64(), max.as_f64()) {
            (Some(lo), Some(hi)) => Ok(nice_bins(lo, hi, DEFAULT_MAX_BINS)),
            _ => Err(Error::invalid_value(
                field,
                "quantitative field holds non-numeric values",
            )),
        },
    }
}

fn tick_as_date(tick: &Value) -> Option<Value> {
    match tick {
        Value::Date(_) => Some(tick.clone()),
        Value::String(s) => parse_date_lenient(s).map(Value::Date),
        Value::Number(n) => DateTime::from_timestamp_millis(*n as i64).map(Value::Date),
        _ => None,
    }
}

/// Consecutive tick pairs, padded with a leading bin when data starts
/// before the first tick and a trailing bin when it ends after the last.
pub fn bins_from_ticks(mut ticks: Vec<Value>, min: &Value, max: &Value) -> Vec<Bin> {
    ticks.sort_by(Value::total_cmp);
    ticks.dedup_by(|a, b| a.loosely_equals(b));

    let (Some(first), Some(last)) = (ticks.first(), ticks.last()) else {
        return vec![Bin::new(min.clone(), max.clone())];
    };

    let mut bins = Vec::with_capacity(ticks.len() + 1);
    if min.total_cmp(first).is_lt() {
        bins.push(Bin::new(min.clone(), first.clone()));
    }
    bins.extend(
        ticks
            .windows(2)
            .map(|pair| Bin::new(pair[0].clone(), pair[1].clone())),
    );
    if max.total_cmp(last).is_gt() {
        bins.push(Bin::new(last.clone(), max.clone()));
    }
    if bins.is_empty() {
        bins.push(Bin::degenerate(first.clone()));
    }
    bins
}

fn prebinned(field: &str, end_field: &str, rows: &[&Datum]) -> Vec<Bin> {
    let mut bins: Vec<Bin> = rows
        .iter()
        .filter_map(|d| match (d.get(field), d.get(end_field)) {
            (Some(lo), Some(hi)) if lo.is_valid() && hi.is_valid() => {
                Some(Bin::new(lo.clone(), hi.clone()))
            }
            _ => None,
        })
        .collect();
    bins.sort_by(|a, b| a.low.total_cmp(&b.low).then(a.high.total_cmp(&b.high)));
    bins.dedup();
    bins
}

/// Step, start and stop of a nice binning of `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinExtent {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
    /// Decimal digits needed to print edges exactly.
    pub precision: i32,
}

/// Choose a nice bin step for `[min, max]` with at most `max_bins` bins.
///
/// Steps are powers of ten, optionally divided by 5 or 2, and the extent is
/// widened outward to multiples of the step.
pub fn nice_extent(min: f64, max: f64, max_bins: usize) -> BinExtent {
    const BASE: f64 = 10.0;
    const DIVISORS: [f64; 2] = [5.0, 2.0];

    let max_bins = max_bins.max(1) as f64;
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return BinExtent {
            start: min,
            stop: min + 1.0,
            step: 1.0,
            precision: 0,
        };
    }

    let log_base = BASE.ln();
    let level = (max_bins.ln() / log_base).ceil();
    let mut step = BASE.powf((span.ln() / log_base).round() - level);

    while (span / step).ceil() > max_bins {
        step *= BASE;
    }
    for div in DIVISORS {
        let candidate = step / div;
        if span / candidate <= max_bins {
            step = candidate;
        }
    }

    let v = step.ln();
    let precision = if v >= 0.0 {
        0
    } else {
        (-v / log_base).floor() as i32 + 1
    };
    let eps = BASE.powi(-precision - 1);

    let floor = (min / step + eps).floor() * step;
    let start = if min < floor { floor - step } else { floor };
    let stop = (max / step).ceil() * step;

    BinExtent {
        start,
        stop: if stop == start { start + step } else { stop },
        step,
        precision,
    }
}

/// Nice-step bins covering `[min, max]`.
pub fn nice_bins(min: f64, max: f64, max_bins: usize) -> Vec<Bin> {
    let ext = nice_extent(min, max, max_bins);
    let scale = 10f64.powi(ext.precision);
    let count = ((ext.stop - ext.start) / ext.step).round().max(1.0) as usize;

    let edges: Vec<f64> = (0..=count)
        .map(|i| ((ext.start + i as f64 * ext.step) * scale).round() / scale)
        .collect();
    edges.windows(2).map(|w| Bin::new(w[0], w[1])).collect()
}

/// A calendar interval used for temporal ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeInterval {
    Second(u32),
    Minute(u32),
    Hour(u32),
    Day(u32),
    Week,
    Month(u32),
    Year(i32),
}

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;
const MONTH_MS: i64 = 30 * DAY_MS;
const YEAR_MS: i64 = 365 * DAY_MS;

const TICK_INTERVALS: [(TimeInterval, i64); 17] = [
    (TimeInterval::Second(1), SECOND_MS),
    (TimeInterval::Second(5), 5 * SECOND_MS),
    (TimeInterval::Second(15), 15 * SECOND_MS),
    (TimeInterval::Second(30), 30 * SECOND_MS),
    (TimeInterval::Minute(1), MINUTE_MS),
    (TimeInterval::Minute(5), 5 * MINUTE_MS),
    (TimeInterval::Minute(15), 15 * MINUTE_MS),
    (TimeInterval::Minute(30), 30 * MINUTE_MS),
    (TimeInterval::Hour(1), HOUR_MS),
    (TimeInterval::Hour(3), 3 * HOUR_MS),
    (TimeInterval::Hour(6), 6 * HOUR_MS),
    (TimeInterval::Hour(12), 12 * HOUR_MS),
    (TimeInterval::Day(1), DAY_MS),
    (TimeInterval::Day(2), 2 * DAY_MS),
    (TimeInterval::Week, WEEK_MS),
    (TimeInterval::Month(1), MONTH_MS),
    (TimeInterval::Month(3), 3 * MONTH_MS),
];

fn choose_interval(lo: DateTime<Utc>, hi: DateTime<Utc>, count: usize) -> TimeInterval {
    let span = (hi - lo).num_milliseconds().max(1) as f64;
    let target = span / count.max(1) as f64;

    let i = TICK_INTERVALS.partition_point(|(_, ms)| (*ms as f64) <= target);
    if i == 0 {
        return TICK_INTERVALS[0].0;
    }
    if i == TICK_INTERVALS.len() {
        if target < YEAR_MS as f64 {
            let (prev, prev_ms) = TICK_INTERVALS[i - 1];
            return if target / (prev_ms as f64) < YEAR_MS as f64 / target {
                prev
            } else {
                TimeInterval::Year(1)
            };
        }
        return TimeInterval::Year(year_step(span / YEAR_MS as f64 / count.max(1) as f64));
    }

    let (prev, prev_ms) = TICK_INTERVALS[i - 1];
    let (next, next_ms) = TICK_INTERVALS[i];
    if target / (prev_ms as f64) < (next_ms as f64) / target {
        prev
    } else {
        next
    }
}

/// 1, 2 or 5 times a power of ten, closest to `raw`.
fn year_step(raw: f64) -> i32 {
    if raw <= 1.0 {
        return 1;
    }
    let power = 10f64.powf(raw.log10().floor());
    let err = raw / power;
    let factor = if err >= 50f64.sqrt() {
        10.0
    } else if err >= 10f64.sqrt() {
        5.0
    } else if err >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    (factor * power).max(1.0) as i32
}

fn floor_to(interval: TimeInterval, d: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let ymd = |y: i32, m: u32, day: u32| Utc.with_ymd_and_hms(y, m, day, 0, 0, 0).single();
    let midnight = ymd(d.year(), d.month(), d.day())?;
    match interval {
        TimeInterval::Second(n) => {
            let s = d.second() / n * n;
            midnight.checked_add_signed(TimeDelta::seconds(
                i64::from(d.hour()) * 3600 + i64::from(d.minute()) * 60 + i64::from(s),
            ))
        }
        TimeInterval::Minute(n) => {
            let m = d.minute() / n * n;
            midnight.checked_add_signed(TimeDelta::minutes(
                i64::from(d.hour()) * 60 + i64::from(m),
            ))
        }
        TimeInterval::Hour(n) => {
            midnight.checked_add_signed(TimeDelta::hours(i64::from(d.hour() / n * n)))
        }
        TimeInterval::Day(n) => ymd(d.year(), d.month(), d.day0() / n * n + 1),
        TimeInterval::Week => midnight.checked_sub_signed(TimeDelta::days(i64::from(
            d.weekday().num_days_from_sunday(),
        ))),
        TimeInterval::Month(n) => ymd(d.year(), d.month0() / n * n + 1, 1),
        TimeInterval::Year(n) => ymd(d.year().div_euclid(n) * n, 1, 1),
    }
}

fn offset(interval: TimeInterval, d: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match interval {
        TimeInterval::Second(n) => d.checked_add_signed(TimeDelta::seconds(i64::from(n))),
        TimeInterval::Minute(n) => d.checked_add_signed(TimeDelta::minutes(i64::from(n))),
        TimeInterval::Hour(n) => d.checked_add_signed(TimeDelta::hours(i64::from(n))),
        TimeInterval::Day(n) => {
            // Day steps restart at the first of each month.
            let next = d.checked_add_signed(TimeDelta::days(i64::from(n)))?;
            if next.month() != d.month() {
                floor_to(TimeInterval::Month(1), next)
            } else {
                Some(next)
            }
        }
        TimeInterval::Week => d.checked_add_signed(TimeDelta::weeks(1)),
        TimeInterval::Month(n) => d.checked_add_months(Months::new(n)),
        TimeInterval::Year(n) => d.checked_add_months(Months::new(n.unsigned_abs() * 12)),
    }
}

/// Calendar-aligned ticks inside `[lo, hi]`, about `count` of them.
pub fn time_ticks(lo: DateTime<Utc>, hi: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
    if hi <= lo {
        return vec![lo];
    }
    let interval = choose_interval(lo, hi, count);

    let Some(floor) = floor_to(interval, lo) else {
        return Vec::new();
    };
    let mut t = if floor < lo {
        match offset(interval, floor) {
            Some(t) => t,
            None => return Vec::new(),
        }
    } else {
        floor
    };

    let mut ticks = Vec::new();
    while t <= hi {
        ticks.push(t);
        match offset(interval, t) {
            Some(next) if next > t => t = next,
            _ => break,
        }
    }
    ticks
}
