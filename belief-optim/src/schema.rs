//! Machine readable description of [AdaBeliefConfig] fields, used by
//! frontends to build hyperparameter forms.

use crate::config::AdaBeliefConfig;
use nanoserde::{SerJson, SerJsonState};

/// Kind of value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// f32
    Float,
    /// unsigned integer
    Int,
    /// bool
    Bool,
}

impl SerJson for FieldKind {
    fn ser_json(&self, d: usize, s: &mut SerJsonState) {
        match self {
            FieldKind::Float => "float",
            FieldKind::Int => "int",
            FieldKind::Bool => "bool",
        }
        .to_string()
        .ser_json(d, s);
    }
}

/// Default value of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// f32 value
    Float(f32),
    /// unsigned integer value
    Int(u32),
    /// bool value
    Bool(bool),
}

impl SerJson for FieldValue {
    fn ser_json(&self, d: usize, s: &mut SerJsonState) {
        match self {
            FieldValue::Float(x) => x.ser_json(d, s),
            FieldValue::Int(x) => x.ser_json(d, s),
            FieldValue::Bool(x) => x.ser_json(d, s),
        }
    }
}

/// Description of one config field
#[derive(Debug, Clone, PartialEq, SerJson)]
pub struct FieldSchema {
    /// Field name, same as the JSON key of [AdaBeliefConfig]
    pub name: String,
    /// Human readable label
    pub label: String,
    /// Kind of value
    #[nserde(rename = "type")]
    pub kind: FieldKind,
    /// Default value
    pub default: FieldValue,
    /// Smallest allowed value
    pub min: Option<f64>,
    /// Largest allowed value
    pub max: Option<f64>,
    /// Suggested increment
    pub step: Option<f64>,
}

impl FieldSchema {
    fn float(name: &str, label: &str, default: f32, min: Option<f64>, max: Option<f64>, step: f64) -> FieldSchema {
        FieldSchema {
            name: name.into(),
            label: label.into(),
            kind: FieldKind::Float,
            default: FieldValue::Float(default),
            min,
            max,
            step: Some(step),
        }
    }

    fn flag(name: &str, label: &str, default: bool) -> FieldSchema {
        FieldSchema {
            name: name.into(),
            label: label.into(),
            kind: FieldKind::Bool,
            default: FieldValue::Bool(default),
            min: None,
            max: None,
            step: None,
        }
    }
}

impl AdaBeliefConfig {
    /// Descriptors of all config fields in declaration order,
    /// defaults are taken from [`AdaBeliefConfig::default`].
    #[must_use]
    pub fn schema() -> Vec<FieldSchema> {
        let d = AdaBeliefConfig::default();
        vec![
            FieldSchema::float("lr", "Learning Rate", d.lr, Some(0.), None, 1e-3),
            FieldSchema::float("beta1", "Beta 1", d.beta1, Some(0.), Some(1.), 0.01),
            FieldSchema::float("beta2", "Beta 2", d.beta2, Some(0.), Some(1.), 0.001),
            FieldSchema::float("weight_decay", "Weight Decay", d.weight_decay, Some(0.), None, 1e-3),
            FieldSchema::flag("weight_decouple", "Weight Decouple", d.weight_decouple),
            FieldSchema::flag("fixed_decay", "Fixed Decay", d.fixed_decay),
            FieldSchema::flag("rectify", "Rectify", d.rectify),
            FieldSchema {
                name: "n_sma_threshold".into(),
                label: "N SMA Threshold".into(),
                kind: FieldKind::Int,
                default: FieldValue::Int(d.n_sma_threshold),
                min: Some(5.),
                max: None,
                step: Some(1.),
            },
            FieldSchema::flag("degenerated_to_sgd", "Degenerated To SGD", d.degenerated_to_sgd),
            FieldSchema::flag("ams_bound", "AMS Bound", d.ams_bound),
            FieldSchema::float("r", "AdaNorm R", d.r, Some(0.), Some(1.), 0.01),
            FieldSchema::flag("adanorm", "AdaNorm", d.adanorm),
            FieldSchema::flag("adam_debias", "Adam Debias", d.adam_debias),
            FieldSchema::float("eps", "Epsilon", d.eps, Some(f64::from(f32::MIN_POSITIVE)), None, 1e-16),
            FieldSchema::flag("cautious", "Cautious", d.cautious),
        ]
    }

    /// [`AdaBeliefConfig::schema`] as a JSON array
    #[must_use]
    pub fn schema_json() -> String {
        AdaBeliefConfig::schema().serialize_json()
    }
}
