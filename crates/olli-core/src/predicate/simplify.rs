//! Rewriting predicates into compact equivalent forms.

use std::cmp::Ordering;

use super::{FieldPredicate, FieldTest, Predicate};
use crate::value::Value;

/// Simplify a predicate without changing which records it selects.
///
/// - nested `and`/`or` are flattened and single-child compositions unwrapped
/// - `gte` with `lte` (or `lt`) on one field becomes a `range`
/// - `equal`/`oneOf` alternatives on one field become a single `oneOf`
/// - double negation is removed
///
/// The rewrite is recursive and idempotent.
pub fn simplify_predicate(predicate: &Predicate) -> Predicate {
    match predicate {
        Predicate::Field(_) => predicate.clone(),
        Predicate::Not { not } => match simplify_predicate(not) {
            Predicate::Not { not } => *not,
            inner => Predicate::negate(inner),
        },
        Predicate::And { and } => {
            let mut terms = Vec::with_capacity(and.len());
            for p in and {
                match simplify_predicate(p) {
                    Predicate::And { and } => terms.extend(and),
                    p => terms.push(p),
                }
            }
            unwrap_single(merge_bounds(terms), Predicate::and)
        }
        Predicate::Or { or } => {
            let mut terms = Vec::with_capacity(or.len());
            for p in or {
                match simplify_predicate(p) {
                    Predicate::Or { or } => terms.extend(or),
                    p => terms.push(p),
                }
            }
            unwrap_single(merge_alternatives(terms), Predicate::or)
        }
    }
}

fn unwrap_single(mut terms: Vec<Predicate>, wrap: fn(Vec<Predicate>) -> Predicate) -> Predicate {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        wrap(terms)
    }
}

fn same_target(a: &FieldPredicate, b: &FieldPredicate) -> bool {
    a.field == b.field && a.time_unit == b.time_unit
}

/// Pair each `gte` with the first compatible upper bound on the same field.
fn merge_bounds(mut terms: Vec<Predicate>) -> Vec<Predicate> {
    let mut i = 0;
    while i < terms.len() {
        let Predicate::Field(lower) = &terms[i] else {
            i += 1;
            continue;
        };
        let FieldTest::Gte(low) = &lower.test else {
            i += 1;
            continue;
        };

        let partner = terms.iter().enumerate().find_map(|(j, t)| {
            let Predicate::Field(upper) = t else {
                return None;
            };
            if j == i || !same_target(lower, upper) {
                return None;
            }
            let (high, inclusive) = match &upper.test {
                FieldTest::Lte(v) => (v, true),
                FieldTest::Lt(v) => (v, false),
                _ => return None,
            };
            // An empty interval must stay an empty conjunction rather than
            // become an inverted range.
            matches!(low.compare(high), Some(Ordering::Less | Ordering::Equal))
                .then(|| (j, high.clone(), inclusive))
        });

        if let Some((j, high, inclusive)) = partner {
            let merged = FieldPredicate {
                field: lower.field.clone(),
                test: FieldTest::Range {
                    low: low.clone(),
                    high,
                    inclusive,
                },
                time_unit: lower.time_unit,
            };
            let first = i.min(j);
            terms[first] = Predicate::Field(merged);
            terms.remove(i.max(j));
            i = first;
        }
        i += 1;
    }
    terms
}

/// Collapse `equal`/`oneOf` alternatives on the same field into one `oneOf`.
fn merge_alternatives(terms: Vec<Predicate>) -> Vec<Predicate> {
    let mut out: Vec<Predicate> = Vec::with_capacity(terms.len());
    // (index into `out`, number of alternatives merged there)
    let mut merged_at: Vec<(usize, usize)> = Vec::new();

    for term in terms {
        let Some((fp, values)) = as_alternatives(&term) else {
            out.push(term);
            continue;
        };

        let existing = merged_at.iter_mut().find(|(idx, _)| match &out[*idx] {
            Predicate::Field(other) => same_target(other, fp),
            _ => false,
        });

        match existing {
            Some((idx, count)) => {
                let Predicate::Field(target) = &mut out[*idx] else {
                    continue;
                };
                let mut all = match &target.test {
                    FieldTest::Equal(v) => vec![v.clone()],
                    FieldTest::OneOf(vs) => vs.clone(),
                    _ => Vec::new(),
                };
                for v in values {
                    if !all.iter().any(|a| a.loosely_equals(&v)) {
                        all.push(v);
                    }
                }
                target.test = FieldTest::OneOf(all);
                *count += 1;
            }
            None => {
                merged_at.push((out.len(), 1));
                out.push(term);
            }
        }
    }
    out
}

fn as_alternatives(term: &Predicate) -> Option<(&FieldPredicate, Vec<Value>)> {
    let Predicate::Field(fp) = term else {
        return None;
    };
    match &fp.test {
        FieldTest::Equal(v) => Some((fp, vec![v.clone()])),
        FieldTest::OneOf(vs) => Some((fp, vs.clone())),
        _ => None,
    }
}
