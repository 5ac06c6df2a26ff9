//! Field predicates and their logical compositions.
//!
//! Predicates use the Vega-Lite JSON shape:
//!
//! ```json
//! {"and": [{"field": "y", "gte": 0}, {"not": {"field": "x", "oneOf": ["a", "b"]}}]}
//! ```
//!
//! - [`selection_test`] filters a dataset through a predicate
//! - [`simplify_predicate`] rewrites a predicate into a compact equivalent
//! - [`field_to_predicates`] partitions a field into one predicate per bin or value

mod eval;
mod fields;
mod simplify;

pub use eval::{PredicateError, selection_test, try_selection_test};
pub use fields::field_to_predicates;
pub use simplify::simplify_predicate;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{TimeUnit, Value, format_number};

/// A logical composition of field predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    /// All children hold. An empty conjunction selects everything.
    And { and: Vec<Predicate> },
    /// At least one child holds.
    Or { or: Vec<Predicate> },
    /// The child does not hold.
    Not { not: Box<Predicate> },
    /// A test on a single field.
    Field(FieldPredicate),
}

impl Predicate {
    /// The predicate that selects every record.
    pub fn always() -> Self {
        Predicate::And { and: Vec::new() }
    }

    /// Conjunction of `predicates`.
    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And { and: predicates }
    }

    /// Disjunction of `predicates`.
    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Or { or: predicates }
    }

    /// Negation of `predicate`.
    pub fn negate(predicate: Predicate) -> Self {
        Predicate::Not {
            not: Box::new(predicate),
        }
    }

    /// Returns `true` for the empty conjunction.
    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::And { and } if and.is_empty())
    }

    /// `self AND other`, flattening nested conjunctions.
    pub fn conjoin(&self, other: Predicate) -> Predicate {
        let mut terms = match self {
            Predicate::And { and } => and.clone(),
            p => vec![p.clone()],
        };
        match other {
            Predicate::And { and } => terms.extend(and),
            p => terms.push(p),
        }
        if terms.len() == 1 {
            return terms.remove(0);
        }
        Predicate::And { and: terms }
    }

    /// Names of every field tested, in first-appearance order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::And { and: ps } | Predicate::Or { or: ps } => {
                ps.iter().for_each(|p| p.collect_fields(out));
            }
            Predicate::Not { not } => not.collect_fields(out),
            Predicate::Field(fp) => {
                if !out.contains(&fp.field.as_str()) {
                    out.push(&fp.field);
                }
            }
        }
    }
}

impl From<FieldPredicate> for Predicate {
    fn from(fp: FieldPredicate) -> Self {
        Predicate::Field(fp)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And { and } if and.is_empty() => write!(f, "all values"),
            Predicate::And { and } => write_joined(f, and, " and "),
            Predicate::Or { or } if or.is_empty() => write!(f, "no values"),
            Predicate::Or { or } => write_joined(f, or, " or "),
            Predicate::Not { not } => write!(f, "not ({not})"),
            Predicate::Field(fp) => write!(f, "{fp}"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Predicate], sep: &str) -> fmt::Result {
    for (i, p) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        match p {
            Predicate::And { .. } | Predicate::Or { .. } if items.len() > 1 => write!(f, "({p})")?,
            _ => write!(f, "{p}")?,
        }
    }
    Ok(())
}

/// The test a [`FieldPredicate`] applies to its field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTest {
    Equal(Value),
    /// `low <= v < high`, or `low <= v <= high` when inclusive.
    Range {
        low: Value,
        high: Value,
        inclusive: bool,
    },
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    OneOf(Vec<Value>),
    /// `true` selects present, non-NaN values; `false` selects the rest.
    Valid(bool),
}

/// A test on a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldPredicate", into = "RawFieldPredicate")]
pub struct FieldPredicate {
    pub field: String,
    pub test: FieldTest,
    /// When set, dates are compared by their key under this unit.
    pub time_unit: Option<TimeUnit>,
}

impl FieldPredicate {
    /// Create a predicate from a field and test.
    pub fn new(field: impl Into<String>, test: FieldTest) -> Self {
        Self {
            field: field.into(),
            test,
            time_unit: None,
        }
    }

    /// `field == value`.
    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldTest::Equal(value.into()))
    }

    /// `low <= field < high` (or `<= high` when `inclusive`).
    pub fn range(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
        inclusive: bool,
    ) -> Self {
        Self::new(
            field,
            FieldTest::Range {
                low: low.into(),
                high: high.into(),
                inclusive,
            },
        )
    }

    /// `field < value`.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldTest::Lt(value.into()))
    }

    /// `field <= value`.
    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldTest::Lte(value.into()))
    }

    /// `field > value`.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldTest::Gt(value.into()))
    }

    /// `field >= value`.
    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FieldTest::Gte(value.into()))
    }

    /// `field` is one of `values`.
    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FieldTest::OneOf(values))
    }

    /// `field` is present (or absent, when `valid` is false).
    pub fn valid(field: impl Into<String>, valid: bool) -> Self {
        Self::new(field, FieldTest::Valid(valid))
    }

    /// Compare dates under `unit`.
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = Some(unit);
        self
    }

    /// Short label naming just the selected values, without the field name.
    ///
    /// Used for nodes whose parent already names the field.
    pub fn value_label(&self) -> String {
        let fmt = |v: &Value| v.format_with(self.time_unit);
        match &self.test {
            FieldTest::Equal(v) => fmt(v),
            FieldTest::Range { low, high, .. } if low.loosely_equals(high) => fmt(low),
            FieldTest::Range { low, high, .. } => {
                format!("range from {} to {}", fmt(low), fmt(high))
            }
            FieldTest::Lt(v) => format!("less than {}", fmt(v)),
            FieldTest::Lte(v) => format!("at most {}", fmt(v)),
            FieldTest::Gt(v) => format!("greater than {}", fmt(v)),
            FieldTest::Gte(v) => format!("at least {}", fmt(v)),
            FieldTest::OneOf(vs) => vs.iter().map(fmt).collect::<Vec<_>>().join(", "),
            FieldTest::Valid(true) => "present values".to_string(),
            FieldTest::Valid(false) => "missing values".to_string(),
        }
    }
}

impl fmt::Display for FieldPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = &self.field;
        let fmt = |v: &Value| v.format_with(self.time_unit);
        match &self.test {
            FieldTest::Equal(v) => write!(f, "{field} is {}", fmt(v)),
            FieldTest::Range {
                low,
                high,
                inclusive,
            } => {
                let upper = if *inclusive { "through" } else { "up to" };
                write!(f, "{field} from {} {upper} {}", fmt(low), fmt(high))
            }
            FieldTest::Lt(v) => write!(f, "{field} less than {}", fmt(v)),
            FieldTest::Lte(v) => write!(f, "{field} at most {}", fmt(v)),
            FieldTest::Gt(v) => write!(f, "{field} greater than {}", fmt(v)),
            FieldTest::Gte(v) => write!(f, "{field} at least {}", fmt(v)),
            FieldTest::OneOf(vs) => {
                let list: Vec<String> = vs.iter().map(fmt).collect();
                write!(f, "{field} is one of {}", list.join(", "))
            }
            FieldTest::Valid(true) => write!(f, "{field} is present"),
            FieldTest::Valid(false) => write!(f, "{field} is missing"),
        }
    }
}

/// Wire shape of a field predicate: exactly one test key is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldPredicate {
    field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equal: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<[Value; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inclusive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    one_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_unit: Option<TimeUnit>,
}

impl TryFrom<RawFieldPredicate> for FieldPredicate {
    type Error = String;

    fn try_from(raw: RawFieldPredicate) -> Result<Self, Self::Error> {
        let mut tests = Vec::new();
        if let Some(v) = raw.equal {
            tests.push(FieldTest::Equal(v));
        }
        if let Some([low, high]) = raw.range {
            tests.push(FieldTest::Range {
                low,
                high,
                inclusive: raw.inclusive.unwrap_or(false),
            });
        }
        if let Some(v) = raw.lt {
            tests.push(FieldTest::Lt(v));
        }
        if let Some(v) = raw.lte {
            tests.push(FieldTest::Lte(v));
        }
        if let Some(v) = raw.gt {
            tests.push(FieldTest::Gt(v));
        }
        if let Some(v) = raw.gte {
            tests.push(FieldTest::Gte(v));
        }
        if let Some(vs) = raw.one_of {
            tests.push(FieldTest::OneOf(vs));
        }
        if let Some(v) = raw.valid {
            tests.push(FieldTest::Valid(v));
        }

        if tests.len() != 1 {
            return Err(format!(
                "predicate on '{}' must have exactly one test, found {}",
                raw.field,
                tests.len()
            ));
        }

        Ok(FieldPredicate {
            field: raw.field,
            test: tests.remove(0),
            time_unit: raw.time_unit,
        })
    }
}

impl From<FieldPredicate> for RawFieldPredicate {
    fn from(fp: FieldPredicate) -> Self {
        let mut raw = RawFieldPredicate {
            field: fp.field,
            time_unit: fp.time_unit,
            ..Default::default()
        };
        match fp.test {
            FieldTest::Equal(v) => raw.equal = Some(v),
            FieldTest::Range {
                low,
                high,
                inclusive,
            } => {
                raw.range = Some([low, high]);
                raw.inclusive = inclusive.then_some(true);
            }
            FieldTest::Lt(v) => raw.lt = Some(v),
            FieldTest::Lte(v) => raw.lte = Some(v),
            FieldTest::Gt(v) => raw.gt = Some(v),
            FieldTest::Gte(v) => raw.gte = Some(v),
            FieldTest::OneOf(vs) => raw.one_of = Some(vs),
            FieldTest::Valid(v) => raw.valid = Some(v),
        }
        raw
    }
}

/// Human-readable number range, used when labelling bins.
pub fn format_range(low: f64, high: f64) -> String {
    format!("{} to {}", format_number(low), format_number(high))
}
