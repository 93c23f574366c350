//! Field work record type

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::identity::RecordKind;
use crate::core::record::Record;

wire_enum! {
    /// Kind of work done on a crop
    pub enum WorkType {
        Plowing => ("орка", "plowing"),
        Seeding => ("сівба", "seeding"),
        InterRowCultivation => ("обробіток міжрядь", "inter-row-cultivation"),
        Irrigation => ("полив", "irrigation"),
        Fertilizing => ("внесення добрив", "fertilizing"),
        PestControl => ("захист від шкідників", "pest-control"),
        Harvesting => ("збирання врожаю", "harvesting"),
        AutumnPlowing => ("зяблева оранка", "autumn-plowing"),
        StubbleBreaking => ("лушення", "stubble-breaking"),
        Harrowing => ("боронування", "harrowing"),
        ResidueRemoval => ("прибирання пожнивних залишків", "residue-removal"),
        Mulching => ("мульчування", "mulching"),
        TopDressing => ("підживлення", "top-dressing"),
        Spraying => ("обприскування", "spraying"),
        Replanting => ("просаджування", "replanting"),
        Mowing => ("кошення", "mowing"),
        Windrowing => ("валкування", "windrowing"),
        Baling => ("тюкування", "baling"),
    }
}

/// Work done for a crop by an employee with a machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldWork {
    /// Backend-assigned id
    pub work_id: u64,

    /// Crop the work belongs to
    pub crop_id: u64,

    pub employee_id: u64,

    pub machinery_id: u64,

    pub work_type: WorkType,

    pub work_start_date: String,

    pub work_end_date: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldWorkDraft {
    pub crop_id: u64,
    pub employee_id: u64,
    pub machinery_id: u64,
    pub work_type: WorkType,
    pub work_start_date: String,
    pub work_end_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldWorkPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machinery_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_type: Option<WorkType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_start_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_end_date: Option<String>,
}

impl Record for FieldWork {
    const KIND: RecordKind = RecordKind::FieldWork;
    type Key = u64;
    type Draft = FieldWorkDraft;
    type Patch = FieldWorkPatch;

    fn key(&self) -> u64 {
        self.work_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_type_count() {
        assert_eq!(WorkType::all().len(), 18);
    }

    #[test]
    fn test_work_type_parse() {
        assert_eq!("top-dressing".parse::<WorkType>().unwrap(), WorkType::TopDressing);
        assert_eq!(
            "прибирання пожнивних залишків".parse::<WorkType>().unwrap(),
            WorkType::ResidueRemoval
        );
        let err = "welding".parse::<WorkType>().unwrap_err();
        assert!(err.contains("plowing"));
    }

    #[test]
    fn test_display_uses_wire_label() {
        assert_eq!(WorkType::Baling.to_string(), "тюкування");
        assert_eq!(WorkType::Baling.slug(), "baling");
    }
}
