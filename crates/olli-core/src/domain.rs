//! Field domains: the sorted distinct values a field takes.

use crate::predicate::{Predicate, selection_test};
use crate::spec::FieldDef;
use crate::value::{Datum, TimeUnit, Value};

/// Sorted, distinct, non-null values of a field.
///
/// When `predicate` is given only matching records contribute. Dates with a
/// time unit are deduplicated by their unit key, keeping the earliest date
/// of each group as its representative.
pub fn get_domain(field: &FieldDef, data: &[Datum], predicate: Option<&Predicate>) -> Vec<Value> {
    let rows: Vec<&Datum> = match predicate {
        Some(p) => selection_test(data, p),
        None => data.iter().collect(),
    };
    domain_of(&field.field, field.time_unit, &rows)
}

pub(crate) fn domain_of(
    field: &str,
    time_unit: Option<TimeUnit>,
    rows: &[&Datum],
) -> Vec<Value> {
    let mut values: Vec<Value> = rows
        .iter()
        .filter_map(|d| d.get(field))
        .filter(|v| v.is_valid())
        .cloned()
        .collect();

    values.sort_by(Value::total_cmp);

    match time_unit {
        Some(unit) => {
            let key = |v: &Value| v.as_date().map(|d| unit.key(&d));
            // Stable sort keeps the earliest date first within each key.
            values.sort_by_key(|v| key(v));
            values.dedup_by(|a, b| match (key(a), key(b)) {
                (Some(ka), Some(kb)) => ka == kb,
                _ => a.loosely_equals(b),
            });
        }
        None => values.dedup_by(|a, b| a.loosely_equals(b)),
    }
    values
}

/// Numeric extent of a field over the given rows.
pub(crate) fn extent(field: &str, rows: &[&Datum]) -> Option<(Value, Value)> {
    let mut values = rows
        .iter()
        .filter_map(|d| d.get(field))
        .filter(|v| v.is_valid());
    let first = values.next()?.clone();
    Some(values.fold((first.clone(), first), |(lo, hi), v| {
        let lo = if v.total_cmp(&lo).is_lt() { v.clone() } else { lo };
        let hi = if v.total_cmp(&hi).is_gt() { v.clone() } else { hi };
        (lo, hi)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::FieldPredicate;
    use crate::spec::MeasureType;
    use crate::value::parse_date;

    fn datum(pairs: &[(&str, Value)]) -> Datum {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_numeric_domain_sorted_unique() {
        let data = vec![
            datum(&[("y", 3.into())]),
            datum(&[("y", 1.into())]),
            datum(&[("y", 3.into())]),
            datum(&[("y", Value::Null)]),
            datum(&[]),
        ];
        let def = FieldDef::new("y", MeasureType::Quantitative);
        assert_eq!(
            get_domain(&def, &data, None),
            vec![Value::from(1), Value::from(3)]
        );
    }

    #[test]
    fn test_string_domain_with_predicate() {
        let data = vec![
            datum(&[("x", "b".into()), ("y", 1.into())]),
            datum(&[("x", "a".into()), ("y", 2.into())]),
            datum(&[("x", "c".into()), ("y", 3.into())]),
        ];
        let def = FieldDef::new("x", MeasureType::Nominal);
        let p = Predicate::from(FieldPredicate::lt("y", 3));
        assert_eq!(
            get_domain(&def, &data, Some(&p)),
            vec![Value::from("a"), Value::from("b")]
        );
    }

    #[test]
    fn test_time_unit_domain() {
        let dates = ["2020-03-05", "2021-03-09", "2020-01-01"];
        let data: Vec<Datum> = dates
            .iter()
            .map(|s| datum(&[("t", Value::Date(parse_date(s).unwrap()))]))
            .collect();
        let def = FieldDef::new("t", MeasureType::Temporal).with_time_unit(TimeUnit::Month);
        let domain = get_domain(&def, &data, None);
        assert_eq!(
            domain,
            vec![
                Value::Date(parse_date("2020-01-01").unwrap()),
                Value::Date(parse_date("2020-03-05").unwrap()),
            ]
        );
    }

    #[test]
    fn test_empty() {
        let def = FieldDef::new("x", MeasureType::Nominal);
        assert!(get_domain(&def, &[], None).is_empty());
    }
}
