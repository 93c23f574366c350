//! Field record type

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::identity::RecordKind;
use crate::core::record::Record;

wire_enum! {
    /// Soil type of a field
    pub enum SoilType {
        Chernozem => ("чорнозем", "chernozem"),
        SandyLoam => ("супіщаний", "sandy-loam"),
        Loam => ("суглинковий", "loam"),
        Sandy => ("піщаний", "sandy"),
        Peat => ("торф'яний", "peat"),
        Clay => ("глинистий", "clay"),
        Stony => ("кам'янистий", "stony"),
        Saline => ("солончаковий", "saline"),
        Marsh => ("болотистий", "marsh"),
    }
}

/// A field, identified by its unique name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Unique name (natural key)
    pub field_name: String,

    /// Area in hectares
    #[serde(deserialize_with = "super::number_or_string")]
    pub area_hectares: f64,

    pub soil_type: SoilType,

    /// Free-text location
    pub field_location: String,

    /// Relation expansions and any other members the backend adds
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full field set for creating a field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDraft {
    pub field_name: String,
    pub area_hectares: f64,
    pub soil_type: SoilType,
    pub field_location: String,
}

/// Changed fields of an existing field. The name is the key and can't change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_hectares: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<SoilType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_location: Option<String>,
}

impl Record for Field {
    const KIND: RecordKind = RecordKind::Field;
    type Key = String;
    type Draft = FieldDraft;
    type Patch = FieldPatch;

    fn key(&self) -> String {
        self.field_name.clone()
    }
}

/// Sort fields by name, case-insensitively, for list display
pub fn sort_by_name(fields: &mut [Field]) {
    fields.sort_by(|a, b| {
        a.field_name
            .to_lowercase()
            .cmp(&b.field_name.to_lowercase())
            .then_with(|| a.field_name.cmp(&b.field_name))
    });
}
