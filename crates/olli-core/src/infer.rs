//! Filling in what a chart adapter left out: field types, temporal values
//! and a default tree structure.

use chrono::DateTime;

use crate::error::{Error, Result};
use crate::logging::targets;
use crate::spec::{AxisType, FieldDef, LegendChannel, Mark, MeasureType, OlliNode, OlliSpec, UnitSpec};
use crate::value::{Datum, Value, parse_date, parse_date_lenient};

/// Elaborate every unit of a spec. See [`elaborate_unit`].
pub fn elaborate_spec(mut spec: OlliSpec) -> Result<OlliSpec> {
    for unit in spec.units_mut() {
        let taken = std::mem::take(unit);
        *unit = elaborate_unit(taken)?;
    }
    Ok(spec)
}

/// Complete a unit spec.
///
/// - field definitions are added for every field the spec references
/// - missing measure types are inferred from the data
/// - string values of temporal fields are parsed into dates
/// - a default structure is inferred when none is declared
///
/// Referencing a field that is neither declared nor present in the data is
/// an error.
pub fn elaborate_unit(mut unit: UnitSpec) -> Result<UnitSpec> {
    if unit.fields.is_empty() {
        unit.fields = data_fields(&unit.data)
            .into_iter()
            .map(|field| FieldDef {
                field,
                measure: None,
                bin: false,
                time_unit: None,
                label: None,
            })
            .collect();
    }

    for (field, context) in referenced_fields(&unit) {
        if unit.field_def(&field).is_some() {
            continue;
        }
        if !unit.data.iter().any(|d| d.contains_key(&field)) {
            return Err(Error::unknown_field(field, context));
        }
        unit.fields.push(FieldDef {
            field,
            measure: None,
            bin: false,
            time_unit: None,
            label: None,
        });
    }

    for def in &mut unit.fields {
        if def.measure.is_none() {
            let measure = infer_type(&def.field, &unit.data);
            tracing::debug!(
                target: targets::ELABORATE,
                field = %def.field,
                ?measure,
                "inferred field type"
            );
            def.measure = Some(measure);
        }
    }

    let temporal: Vec<String> = unit
        .fields
        .iter()
        .filter(|f| f.measure == Some(MeasureType::Temporal))
        .map(|f| f.field.clone())
        .collect();
    for datum in &mut unit.data {
        for field in &temporal {
            if let Some(value) = datum.get_mut(field) {
                *value = to_date(value.clone());
            }
        }
    }

    if unit.structure.as_ref().is_none_or(Vec::is_empty) {
        unit.structure = Some(infer_structure(&unit));
    }

    Ok(unit)
}

fn to_date(value: Value) -> Value {
    match &value {
        Value::String(s) => parse_date_lenient(s).map(Value::Date).unwrap_or(value),
        Value::Number(n) if n.is_finite() => DateTime::from_timestamp_millis(*n as i64)
            .map(Value::Date)
            .unwrap_or(value),
        _ => value,
    }
}

/// Field names in first-appearance order across the dataset.
fn data_fields(data: &[Datum]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for datum in data {
        for key in datum.keys() {
            if !out.contains(key) {
                out.push(key.clone());
            }
        }
    }
    out
}

fn referenced_fields(unit: &UnitSpec) -> Vec<(String, &'static str)> {
    let mut out: Vec<(String, &'static str)> = Vec::new();
    for axis in &unit.axes {
        out.push((axis.field.clone(), "an axis"));
    }
    for legend in &unit.legends {
        out.push((legend.field.clone(), "a legend"));
    }
    if let Some(facet) = &unit.facet {
        out.push((facet.clone(), "the facet"));
    }
    if let Some(structure) = &unit.structure {
        let mut groupbys = Vec::new();
        structure.iter().for_each(|n| n.groupby_fields(&mut groupbys));
        out.extend(groupbys.into_iter().map(|f| (f.to_string(), "the structure")));
    }
    out
}

/// Infer a measure type from the values a field takes.
///
/// All numbers is quantitative, all dates (or ISO-8601 strings) is temporal,
/// anything else is nominal.
pub fn infer_type(field: &str, data: &[Datum]) -> MeasureType {
    let mut values = data
        .iter()
        .filter_map(|d| d.get(field))
        .filter(|v| v.is_valid())
        .peekable();
    if values.peek().is_none() {
        return MeasureType::Nominal;
    }

    let mut all_numbers = true;
    let mut all_dates = true;
    for value in values {
        match value {
            Value::Number(_) => all_dates = false,
            Value::Date(_) => all_numbers = false,
            Value::String(s) => {
                all_numbers = false;
                if parse_date(s).is_none() {
                    all_dates = false;
                }
            }
            _ => return MeasureType::Nominal,
        }
        if !all_numbers && !all_dates {
            return MeasureType::Nominal;
        }
    }

    if all_numbers {
        MeasureType::Quantitative
    } else {
        MeasureType::Temporal
    }
}

/// Default tree structure for a unit without a declared one.
///
/// Axis groups (x before y) come first, then legend groups. A line chart
/// with a color legend additionally nests the x axis under each series. A
/// facet wraps everything. With no axes or legends, every field becomes a
/// group.
pub fn infer_structure(unit: &UnitSpec) -> Vec<OlliNode> {
    let mut axes: Vec<_> = unit
        .axes
        .iter()
        .filter(|a| unit.facet.as_deref() != Some(a.field.as_str()))
        .collect();
    axes.sort_by_key(|a| a.axis_type == AxisType::Y);

    let mut nodes: Vec<OlliNode> = axes.iter().map(|a| OlliNode::group(&a.field)).collect();

    let x_field = axes
        .iter()
        .find(|a| a.axis_type == AxisType::X)
        .map(|a| a.field.clone());
    for legend in &unit.legends {
        if unit.facet.as_deref() == Some(legend.field.as_str()) {
            continue;
        }
        let series = unit.mark == Some(Mark::Line) && legend.channel == LegendChannel::Color;
        match (&x_field, series) {
            (Some(x), true) => {
                nodes.push(OlliNode::group_with(&legend.field, vec![OlliNode::group(x)]));
            }
            _ => nodes.push(OlliNode::group(&legend.field)),
        }
    }

    if nodes.is_empty() {
        nodes = unit
            .fields
            .iter()
            .filter(|f| unit.facet.as_deref() != Some(f.field.as_str()))
            .map(|f| OlliNode::group(&f.field))
            .collect();
    }

    match &unit.facet {
        Some(facet) => vec![OlliNode::group_with(facet, nodes)],
        None => nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Axis, Legend};

    fn datum(pairs: &[(&str, Value)]) -> Datum {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn cars() -> Vec<Datum> {
        vec![
            datum(&[
                ("origin", "USA".into()),
                ("hp", 130.into()),
                ("year", "1970-01-01".into()),
            ]),
            datum(&[
                ("origin", "Japan".into()),
                ("hp", 95.into()),
                ("year", "1971-01-01".into()),
            ]),
        ]
    }

    #[test]
    fn test_infer_types() {
        let data = cars();
        assert_eq!(infer_type("hp", &data), MeasureType::Quantitative);
        assert_eq!(infer_type("year", &data), MeasureType::Temporal);
        assert_eq!(infer_type("origin", &data), MeasureType::Nominal);
        assert_eq!(infer_type("missing", &data), MeasureType::Nominal);
    }

    #[test]
    fn test_elaborate_adds_fields_and_parses_dates() {
        let mut unit = UnitSpec::new(cars());
        unit.axes.push(Axis::new("year", AxisType::X));
        unit.fields.push(FieldDef::new("hp", MeasureType::Quantitative));

        let unit = elaborate_unit(unit).unwrap();
        let year = unit.field_def("year").unwrap();
        assert_eq!(year.measure, Some(MeasureType::Temporal));
        assert!(matches!(unit.data[0]["year"], Value::Date(_)));
        assert_eq!(unit.structure, Some(vec![OlliNode::group("year")]));
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let mut unit = UnitSpec::new(cars());
        unit.axes.push(Axis::new("weight", AxisType::Y));
        let err = elaborate_unit(unit).unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "weight"));
    }

    #[test]
    fn test_infer_structure_orders_axes_then_legends() {
        let mut unit = UnitSpec::new(cars());
        unit.axes.push(Axis::new("hp", AxisType::Y));
        unit.axes.push(Axis::new("year", AxisType::X));
        unit.legends.push(Legend {
            field: "origin".into(),
            channel: LegendChannel::Color,
            title: None,
        });
        assert_eq!(
            infer_structure(&unit),
            vec![
                OlliNode::group("year"),
                OlliNode::group("hp"),
                OlliNode::group("origin"),
            ]
        );

        unit.mark = Some(Mark::Line);
        assert_eq!(
            infer_structure(&unit)[2],
            OlliNode::group_with("origin", vec![OlliNode::group("year")])
        );
    }

    #[test]
    fn test_infer_structure_with_facet() {
        let mut unit = UnitSpec::new(cars());
        unit.facet = Some("origin".into());
        unit.axes.push(Axis::new("hp", AxisType::X));
        assert_eq!(
            infer_structure(&unit),
            vec![OlliNode::group_with("origin", vec![OlliNode::group("hp")])]
        );
    }

    #[test]
    fn test_infer_structure_without_encodings() {
        let unit = elaborate_unit(UnitSpec::new(cars())).unwrap();
        let structure = unit.structure.unwrap();
        assert_eq!(structure.len(), 3);
    }
}
