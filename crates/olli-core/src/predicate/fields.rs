//! Partitioning a field's values into predicates.

use super::FieldPredicate;
use crate::bins::get_bins;
use crate::domain::domain_of;
use crate::error::{Error, Result};
use crate::spec::FieldDef;
use crate::value::{Datum, Value};

/// Partition a field into one predicate per value or bin.
///
/// Categorical and time-unit fields get one `equal` predicate per domain
/// value. Continuous fields get one half-open `range` per bin, with the last
/// bin closed so the maximum is not lost. Degenerate bins become `equal`.
pub fn field_to_predicates(
    field: &str,
    data: &[Datum],
    fields: &[FieldDef],
    ticks: Option<&[Value]>,
) -> Result<Vec<FieldPredicate>> {
    let def = fields
        .iter()
        .find(|f| f.field == field)
        .ok_or_else(|| Error::unknown_field(field, "field partitioning"))?;

    if def.measure_type().is_categorical() || def.time_unit.is_some() {
        let rows: Vec<&Datum> = data.iter().collect();
        return Ok(domain_of(field, def.time_unit, &rows)
            .into_iter()
            .map(|v| with_unit(FieldPredicate::equal(field, v), def))
            .collect());
    }

    let bins = get_bins(field, data, fields, ticks, None)?;
    let last = bins.len().saturating_sub(1);
    Ok(bins
        .into_iter()
        .enumerate()
        .map(|(i, bin)| {
            let predicate = if bin.is_degenerate() {
                FieldPredicate::equal(field, bin.low)
            } else {
                FieldPredicate::range(field, bin.low, bin.high, i == last)
            };
            with_unit(predicate, def)
        })
        .collect())
}

fn with_unit(predicate: FieldPredicate, def: &FieldDef) -> FieldPredicate {
    match def.time_unit {
        Some(unit) => predicate.with_time_unit(unit),
        None => predicate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{FieldTest, Predicate, selection_test};
    use crate::spec::MeasureType;

    fn data() -> Vec<Datum> {
        [("a", 1.0), ("b", 2.0), ("a", 3.0), ("c", 10.0)]
            .iter()
            .map(|(x, y)| {
                Datum::from([
                    ("x".to_string(), Value::from(*x)),
                    ("y".to_string(), Value::from(*y)),
                ])
            })
            .collect()
    }

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("x", MeasureType::Nominal),
            FieldDef::new("y", MeasureType::Quantitative),
        ]
    }

    #[test]
    fn test_categorical_equal_per_value() {
        let preds = field_to_predicates("x", &data(), &fields(), None).unwrap();
        let values: Vec<_> = preds
            .iter()
            .map(|p| match &p.test {
                FieldTest::Equal(v) => v.to_string(),
                other => panic!("unexpected test {other:?}"),
            })
            .collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ranges_partition_every_row() {
        let data = data();
        let ticks = [Value::from(0), Value::from(5), Value::from(10)];
        let preds = field_to_predicates("y", &data, &fields(), Some(&ticks)).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(matches!(
            preds[1].test,
            FieldTest::Range {
                inclusive: true,
                ..
            }
        ));

        let total: usize = preds
            .iter()
            .map(|p| selection_test(&data, &Predicate::from(p.clone())).len())
            .sum();
        assert_eq!(total, data.len());
    }
}
