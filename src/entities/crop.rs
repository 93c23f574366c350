//! Crop record type

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::identity::RecordKind;
use crate::core::record::Record;

wire_enum! {
    /// Lifecycle stage of a crop, from preparation to completion
    pub enum CropStatus {
        PreparingToSow => ("готується до посіву", "preparing-to-sow"),
        Sowing => ("засівається", "sowing"),
        Active => ("активний", "active"),
        PreparingToHarvest => ("готується до збору", "preparing-to-harvest"),
        Harvesting => ("збирається", "harvesting"),
        Completed => ("завершений", "completed"),
    }
}

/// A crop planted on a field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crop {
    /// Backend-assigned id
    pub crop_id: u64,

    /// Owning field
    pub field_name: String,

    pub cultivated_plant_name: String,

    pub crop_start_date: String,

    pub crop_harvest_date: String,

    pub actual_harvest_tons: u64,

    pub crop_status: CropStatus,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropDraft {
    pub field_name: String,
    pub cultivated_plant_name: String,
    pub crop_start_date: String,
    pub crop_harvest_date: String,
    pub actual_harvest_tons: u64,
    pub crop_status: CropStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultivated_plant_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_start_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_harvest_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_harvest_tons: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_status: Option<CropStatus>,
}

impl Record for Crop {
    const KIND: RecordKind = RecordKind::Crop;
    type Key = u64;
    type Draft = CropDraft;
    type Patch = CropPatch;

    fn key(&self) -> u64 {
        self.crop_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_lifecycle_order() {
        let all = CropStatus::all();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], CropStatus::PreparingToSow);
        assert_eq!(all[5], CropStatus::Completed);
    }

    #[test]
    fn test_crop_from_backend_json() {
        let crop: Crop = serde_json::from_value(json!({
            "crop_id": 102,
            "field_name": "North-40",
            "cultivated_plant_name": "Wheat",
            "crop_start_date": "2024-03-15T00:00:00.000Z",
            "crop_harvest_date": "2024-07-20",
            "actual_harvest_tons": 85,
            "crop_status": "активний"
        }))
        .unwrap();
        assert_eq!(crop.key(), 102);
        assert_eq!(crop.crop_status, CropStatus::Active);
    }

    #[test]
    fn test_draft_rejects_unknown_members() {
        let result = serde_json::from_value::<CropDraft>(json!({
            "field_name": "North-40",
            "cultivated_plant_name": "Wheat",
            "crop_start_date": "2024-03-15",
            "crop_harvest_date": "2024-07-20",
            "actual_harvest_tons": 85,
            "crop_status": "активний",
            "crop_id": 5
        }));
        assert!(result.is_err());
    }
}
