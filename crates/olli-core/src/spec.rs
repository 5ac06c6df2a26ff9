//! Declarative chart specs: data, field encodings and desired tree structure.
//!
//! An [`OlliSpec`] is what a chart-library adapter hands to the engine. It is
//! deserialized from JSON shaped like
//!
//! ```json
//! {
//!   "data": [{"x": "a", "y": 1}],
//!   "fields": [{"field": "x", "type": "nominal"}],
//!   "mark": "bar",
//!   "axes": [{"field": "x", "axisType": "x"}],
//!   "structure": [{"groupby": "x"}]
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::predicate::Predicate;
use crate::value::{Dataset, TimeUnit, Value};

/// Measurement type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureType {
    Quantitative,
    Ordinal,
    Nominal,
    Temporal,
}

impl MeasureType {
    /// Nominal and ordinal fields partition by value rather than by range.
    pub fn is_categorical(self) -> bool {
        matches!(self, MeasureType::Nominal | MeasureType::Ordinal)
    }
}

/// Definition of a single data field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name as it appears in each datum.
    pub field: String,
    /// Measurement type; inferred from data when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<MeasureType>,
    /// Whether the chart bins this field.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bin: bool,
    /// Calendar unit temporal values are grouped by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<TimeUnit>,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FieldDef {
    /// Create a field definition with an explicit type.
    pub fn new(field: impl Into<String>, measure: MeasureType) -> Self {
        Self {
            field: field.into(),
            measure: Some(measure),
            bin: false,
            time_unit: None,
            label: None,
        }
    }

    /// Set the time unit.
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.time_unit = Some(unit);
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The measurement type, nominal when still unknown.
    pub fn measure_type(&self) -> MeasureType {
        self.measure.unwrap_or(MeasureType::Nominal)
    }

    /// The label, falling back to the field name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }
}

/// Mark type of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Point,
    Bar,
    Line,
}

impl Mark {
    /// Noun phrase for the chart kind.
    pub fn chart_noun(self) -> &'static str {
        match self {
            Mark::Point => "scatterplot",
            Mark::Bar => "bar chart",
            Mark::Line => "line chart",
        }
    }
}

/// Which positional axis an [`Axis`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    X,
    Y,
}

/// An axis of the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub field: String,
    pub axis_type: AxisType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Tick values drawn on the axis; used as bin boundaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticks: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_type: Option<String>,
}

impl Axis {
    /// Create an axis without ticks.
    pub fn new(field: impl Into<String>, axis_type: AxisType) -> Self {
        Self {
            field: field.into(),
            axis_type,
            title: None,
            ticks: None,
            scale_type: None,
        }
    }

    /// Set the tick values.
    pub fn with_ticks(mut self, ticks: Vec<Value>) -> Self {
        self.ticks = Some(ticks);
        self
    }
}

/// Encoding channel a legend describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendChannel {
    Color,
    Opacity,
    Size,
}

impl LegendChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            LegendChannel::Color => "color",
            LegendChannel::Opacity => "opacity",
            LegendChannel::Size => "size",
        }
    }
}

/// A legend of the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub field: String,
    pub channel: LegendChannel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Whether a predicate node narrows its parent or stands on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateScope {
    /// Full predicate is the parent's predicate AND this node's predicate.
    #[default]
    Narrowing,
    /// Full predicate is this node's predicate alone. Used for independently
    /// named semantic partitions.
    Independent,
}

/// A declarative tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OlliNode {
    /// Branch by the domain or bins of a field.
    Group {
        groupby: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<OlliNode>,
    },
    /// Apply a filter.
    Predicate {
        predicate: Predicate,
        #[serde(default)]
        scope: PredicateScope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<OlliNode>,
    },
    /// Group externally supplied semantic partitions.
    Annotation { annotations: Vec<OlliNode> },
}

impl OlliNode {
    /// Create a group node without children.
    pub fn group(field: impl Into<String>) -> Self {
        OlliNode::Group {
            groupby: field.into(),
            children: Vec::new(),
        }
    }

    /// Create a group node with children.
    pub fn group_with(field: impl Into<String>, children: Vec<OlliNode>) -> Self {
        OlliNode::Group {
            groupby: field.into(),
            children,
        }
    }

    /// Create a narrowing predicate node.
    pub fn filter(predicate: Predicate) -> Self {
        OlliNode::Predicate {
            predicate,
            scope: PredicateScope::Narrowing,
            name: None,
            explanation: None,
            children: Vec::new(),
        }
    }

    /// Create an independent, named partition.
    pub fn partition(name: impl Into<String>, predicate: Predicate) -> Self {
        OlliNode::Predicate {
            predicate,
            scope: PredicateScope::Independent,
            name: Some(name.into()),
            explanation: None,
            children: Vec::new(),
        }
    }

    /// Fields this node and its descendants group by.
    pub fn groupby_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            OlliNode::Group { groupby, children } => {
                out.push(groupby);
                children.iter().for_each(|c| c.groupby_fields(out));
            }
            OlliNode::Predicate { children, .. } => {
                children.iter().for_each(|c| c.groupby_fields(out));
            }
            OlliNode::Annotation { annotations } => {
                annotations.iter().for_each(|c| c.groupby_fields(out));
            }
        }
    }
}

/// The role a field plays in a unit spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Facet,
    Axis(AxisType),
    Legend(LegendChannel),
    None,
}

/// A single chart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitSpec {
    #[serde(default)]
    pub data: Dataset,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<Mark>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub axes: Vec<Axis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legends: Vec<Legend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub structure: Option<Vec<OlliNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Predicate>,
}

impl UnitSpec {
    /// Create a spec over a dataset with no encodings.
    pub fn new(data: Dataset) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// Look up a field definition.
    pub fn field_def(&self, field: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.field == field)
    }

    /// The role a field plays. Facet wins over axes, axes over legends.
    pub fn role_of(&self, field: &str) -> FieldRole {
        if self.facet.as_deref() == Some(field) {
            return FieldRole::Facet;
        }
        if let Some(axis) = self.axes.iter().find(|a| a.field == field) {
            return FieldRole::Axis(axis.axis_type);
        }
        if let Some(legend) = self.legends.iter().find(|l| l.field == field) {
            return FieldRole::Legend(legend.channel);
        }
        FieldRole::None
    }

    /// The axis drawn for a field, if any.
    pub fn axis_for(&self, field: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.field == field)
    }

    /// The legend drawn for a field, if any.
    pub fn legend_for(&self, field: &str) -> Option<&Legend> {
        self.legends.iter().find(|l| l.field == field)
    }

    /// Human-readable label for a field: axis or legend title, then the field
    /// definition's label, then the name itself.
    pub fn label_for<'a>(&'a self, field: &'a str) -> &'a str {
        if let Some(title) = self.axis_for(field).and_then(|a| a.title.as_deref()) {
            return title;
        }
        if let Some(title) = self.legend_for(field).and_then(|l| l.title.as_deref()) {
            return title;
        }
        self.field_def(field).map(FieldDef::label).unwrap_or(field)
    }
}

/// How the units of a multi-unit spec are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionOperator {
    Layer,
    Concat,
}

/// Several charts layered or concatenated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSpec {
    pub operator: CompositionOperator,
    pub units: Vec<UnitSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Input to the engine: a unit or multi-unit chart spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OlliSpec {
    Multi(MultiSpec),
    Unit(UnitSpec),
}

impl OlliSpec {
    /// Parse a spec from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The units of this spec, in order.
    pub fn units(&self) -> &[UnitSpec] {
        match self {
            OlliSpec::Unit(unit) => std::slice::from_ref(unit),
            OlliSpec::Multi(multi) => &multi.units,
        }
    }

    /// Mutable access to the units.
    pub fn units_mut(&mut self) -> &mut [UnitSpec] {
        match self {
            OlliSpec::Unit(unit) => std::slice::from_mut(unit),
            OlliSpec::Multi(multi) => &mut multi.units,
        }
    }

    /// The unit at `index`, if it exists.
    pub fn unit(&self, index: usize) -> Option<&UnitSpec> {
        self.units().get(index)
    }

    /// Chart title, if any.
    pub fn title(&self) -> Option<&str> {
        match self {
            OlliSpec::Unit(unit) => unit.title.as_deref(),
            OlliSpec::Multi(multi) => multi.title.as_deref(),
        }
    }

    /// Replace the selection of every unit.
    pub fn set_selection(&mut self, selection: Option<Predicate>) {
        for unit in self.units_mut() {
            unit.selection = selection.clone();
        }
    }
}

impl From<UnitSpec> for OlliSpec {
    fn from(unit: UnitSpec) -> Self {
        OlliSpec::Unit(unit)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<OlliNode>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<OlliNode>),
        One(Box<OlliNode>),
    }

    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|v| match v {
            OneOrMany::Many(nodes) => nodes,
            OneOrMany::One(node) => vec![*node],
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_spec() {
        let spec = OlliSpec::from_json(
            r#"{
                "data": [{"x": "a", "y": 1}],
                "fields": [{"field": "x", "type": "nominal"}, {"field": "y"}],
                "mark": "bar",
                "axes": [{"field": "x", "axisType": "x"}],
                "structure": {"groupby": "x"}
            }"#,
        )
        .unwrap();

        let OlliSpec::Unit(unit) = spec else {
            panic!("expected a unit spec");
        };
        assert_eq!(unit.mark, Some(Mark::Bar));
        assert_eq!(unit.fields[0].measure, Some(MeasureType::Nominal));
        assert_eq!(unit.fields[1].measure, None);
        assert_eq!(unit.structure, Some(vec![OlliNode::group("x")]));
        assert_eq!(unit.role_of("x"), FieldRole::Axis(AxisType::X));
        assert_eq!(unit.role_of("y"), FieldRole::None);
    }

    #[test]
    fn test_parse_multi_spec() {
        let spec = OlliSpec::from_json(
            r#"{"operator": "concat", "units": [{"data": []}, {"data": []}]}"#,
        )
        .unwrap();
        assert_eq!(spec.units().len(), 2);
        assert!(matches!(spec, OlliSpec::Multi(_)));
    }

    #[test]
    fn test_parse_node_variants() {
        let nodes: Vec<OlliNode> = serde_json::from_str(
            r#"[
                {"groupby": "x", "children": [{"groupby": "y"}]},
                {"predicate": {"field": "y", "gt": 2}, "name": "high", "scope": "independent"},
                {"annotations": [{"predicate": {"field": "x", "equal": "a"}}]}
            ]"#,
        )
        .unwrap();

        assert!(matches!(&nodes[0], OlliNode::Group { children, .. } if children.len() == 1));
        assert!(matches!(
            &nodes[1],
            OlliNode::Predicate { scope: PredicateScope::Independent, name: Some(n), .. } if n == "high"
        ));
        assert!(matches!(&nodes[2], OlliNode::Annotation { annotations } if annotations.len() == 1));
    }

    #[test]
    fn test_label_fallbacks() {
        let mut unit = UnitSpec::new(Vec::new());
        unit.fields.push(FieldDef::new("hp", MeasureType::Quantitative).with_label("Horsepower"));
        unit.axes.push(Axis::new("mpg", AxisType::Y));
        unit.axes[0].title = Some("Miles per gallon".into());
        assert_eq!(unit.label_for("hp"), "Horsepower");
        assert_eq!(unit.label_for("mpg"), "Miles per gallon");
        assert_eq!(unit.label_for("other"), "other");
    }
}
