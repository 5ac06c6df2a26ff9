//! Predicate validation and evaluation against records.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::{FieldPredicate, FieldTest, Predicate};
use crate::logging::targets;
use crate::value::{Datum, TimeUnit, Value, parse_date_lenient};

static NULL: Value = Value::Null;

/// A predicate that cannot be evaluated meaningfully.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredicateError {
    /// The lower bound of a range exceeds its upper bound.
    #[error("inverted range on '{field}': {low} is greater than {high}")]
    InvertedRange {
        field: String,
        low: String,
        high: String,
    },

    /// Operands of one test cannot be ordered against each other.
    #[error("mismatched operands on '{field}': {message}")]
    MismatchedOperands { field: String, message: String },
}

impl Predicate {
    /// Check that every leaf is well formed.
    pub fn validate(&self) -> Result<(), PredicateError> {
        match self {
            Predicate::And { and: ps } | Predicate::Or { or: ps } => {
                ps.iter().try_for_each(Predicate::validate)
            }
            Predicate::Not { not } => not.validate(),
            Predicate::Field(fp) => fp.validate(),
        }
    }

    /// Evaluate against one record. Assumes [`Predicate::validate`] passed.
    pub fn evaluate(&self, datum: &Datum) -> bool {
        match self {
            Predicate::And { and } => and.iter().all(|p| p.evaluate(datum)),
            Predicate::Or { or } => or.iter().any(|p| p.evaluate(datum)),
            Predicate::Not { not } => !not.evaluate(datum),
            Predicate::Field(fp) => fp.evaluate(datum),
        }
    }
}

impl FieldPredicate {
    fn validate(&self) -> Result<(), PredicateError> {
        let FieldTest::Range { low, high, .. } = &self.test else {
            return Ok(());
        };
        if low.is_null() || high.is_null() || !low.is_comparable_with(high) {
            return Err(PredicateError::MismatchedOperands {
                field: self.field.clone(),
                message: format!("cannot form a range from {low:?} and {high:?}"),
            });
        }
        if low.compare(high) == Some(Ordering::Greater) {
            return Err(PredicateError::InvertedRange {
                field: self.field.clone(),
                low: low.to_string(),
                high: high.to_string(),
            });
        }
        Ok(())
    }

    /// Evaluate against one record. Missing fields read as null; a datum
    /// that cannot be ordered against the operand does not match.
    pub fn evaluate(&self, datum: &Datum) -> bool {
        let value = datum.get(&self.field).unwrap_or(&NULL);
        let cmp = |operand: &Value| compare_operand(value, operand, self.time_unit);
        match &self.test {
            FieldTest::Equal(v) => cmp(v) == Some(Ordering::Equal),
            FieldTest::Range {
                low,
                high,
                inclusive,
            } => {
                let above_low = matches!(cmp(low), Some(Ordering::Greater | Ordering::Equal));
                let below_high = match cmp(high) {
                    Some(Ordering::Less) => true,
                    Some(Ordering::Equal) => *inclusive,
                    _ => false,
                };
                above_low && below_high
            }
            FieldTest::Lt(v) => cmp(v) == Some(Ordering::Less),
            FieldTest::Lte(v) => matches!(cmp(v), Some(Ordering::Less | Ordering::Equal)),
            FieldTest::Gt(v) => cmp(v) == Some(Ordering::Greater),
            FieldTest::Gte(v) => matches!(cmp(v), Some(Ordering::Greater | Ordering::Equal)),
            FieldTest::OneOf(vs) => vs.iter().any(|v| cmp(v) == Some(Ordering::Equal)),
            FieldTest::Valid(valid) => value.is_valid() == *valid,
        }
    }
}

/// Order a datum value against an operand.
///
/// Date data coerces string and number operands to instants. With a time
/// unit, both sides compare by their unit key.
fn compare_operand(value: &Value, operand: &Value, unit: Option<TimeUnit>) -> Option<Ordering> {
    let Value::Date(date) = value else {
        return value.compare(operand);
    };
    let other = operand_as_date(operand)?;
    match unit {
        Some(unit) => Some(unit.key(date).cmp(&unit.key(&other))),
        None => Some(date.timestamp_millis().cmp(&other.timestamp_millis())),
    }
}

fn operand_as_date(operand: &Value) -> Option<DateTime<Utc>> {
    match operand {
        Value::Date(d) => Some(*d),
        Value::String(s) => parse_date_lenient(s),
        Value::Number(n) if n.is_finite() => DateTime::from_timestamp_millis(*n as i64),
        _ => None,
    }
}

/// Filter `data` through `predicate`, reporting malformed predicates.
pub fn try_selection_test<'a>(
    data: &'a [Datum],
    predicate: &Predicate,
) -> Result<Vec<&'a Datum>, PredicateError> {
    predicate.validate()?;
    Ok(data.iter().filter(|d| predicate.evaluate(d)).collect())
}

/// Filter `data` through `predicate`.
///
/// A malformed predicate fails open: a warning is logged and every record
/// is returned.
pub fn selection_test<'a>(data: &'a [Datum], predicate: &Predicate) -> Vec<&'a Datum> {
    match try_selection_test(data, predicate) {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(
                target: targets::PREDICATE,
                error = %err,
                "malformed predicate, returning unfiltered data"
            );
            data.iter().collect()
        }
    }
}
