//! Cascading deletes
//!
//! The backend does not remove dependents on its own, so deleting a crop
//! first deletes its field works, and deleting a field first deletes the
//! works of all its crops and then the crops. The work is split in two:
//!
//! - planning: a pure function from a dependency snapshot to an ordered
//!   [`DeletePlan`] (dependents first, target last)
//! - execution: issue the deletes one at a time, stopping at the first
//!   failure. Nothing is rolled back.
//!
//! Snapshots are always read from the backend, never from the query cache.
//! Planning reads only the keys it needs from each record, so a record that
//! fails full validation elsewhere doesn't block an unrelated delete.

use std::fmt;

use miette::Diagnostic;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::cache::CacheError;
use crate::core::gateway::GatewayError;
use crate::core::identity::RecordKind;
use crate::core::store::{RecordStore, StoreError};
use crate::core::transport::Transport;
use crate::entities::{Crop, Field, FieldWork};

/// The keys of a field work that planning needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WorkRef {
    pub work_id: u64,
    pub crop_id: u64,
}

/// The keys of a crop that planning needs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CropRef {
    pub crop_id: u64,
    pub field_name: String,
}

/// One delete request in a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStep {
    FieldWork(u64),
    Crop(u64),
    Field(String),
}

impl DeleteStep {
    pub fn kind(&self) -> RecordKind {
        match self {
            DeleteStep::FieldWork(_) => RecordKind::FieldWork,
            DeleteStep::Crop(_) => RecordKind::Crop,
            DeleteStep::Field(_) => RecordKind::Field,
        }
    }

    /// Key as it appears in the resource path
    pub fn key(&self) -> String {
        match self {
            DeleteStep::FieldWork(id) | DeleteStep::Crop(id) => id.to_string(),
            DeleteStep::Field(name) => name.clone(),
        }
    }
}

impl fmt::Display for DeleteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind().noun(), self.key())
    }
}

/// Ordered deletes ending with the target record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlan {
    steps: Vec<DeleteStep>,
}

impl DeletePlan {
    /// Delete a single field work (it has no dependents)
    pub fn field_work(work_id: u64) -> Self {
        Self {
            steps: vec![DeleteStep::FieldWork(work_id)],
        }
    }

    /// Delete a crop after every work recorded for it, in list order
    pub fn crop(crop_id: u64, works: &[WorkRef]) -> Self {
        let mut steps: Vec<DeleteStep> = works
            .iter()
            .filter(|w| w.crop_id == crop_id)
            .map(|w| DeleteStep::FieldWork(w.work_id))
            .collect();
        steps.push(DeleteStep::Crop(crop_id));
        Self { steps }
    }

    /// Delete a field after all of its crops and their works.
    ///
    /// Works come first, grouped by crop in crop list order, then the crops
    /// in list order, then the field.
    pub fn field(field_name: &str, crops: &[CropRef], works: &[WorkRef]) -> Self {
        let field_crops: Vec<&CropRef> =
            crops.iter().filter(|c| c.field_name == field_name).collect();

        let mut steps = Vec::new();
        for crop in &field_crops {
            steps.extend(
                works
                    .iter()
                    .filter(|w| w.crop_id == crop.crop_id)
                    .map(|w| DeleteStep::FieldWork(w.work_id)),
            );
        }
        steps.extend(field_crops.iter().map(|c| DeleteStep::Crop(c.crop_id)));
        steps.push(DeleteStep::Field(field_name.to_string()));
        Self { steps }
    }

    pub fn steps(&self) -> &[DeleteStep] {
        &self.steps
    }

    /// The record the user asked to delete
    pub fn target(&self) -> &DeleteStep {
        // Every constructor pushes the target last.
        &self.steps[self.steps.len() - 1]
    }

    /// Everything deleted before the target
    pub fn dependents(&self) -> &[DeleteStep] {
        &self.steps[..self.steps.len() - 1]
    }

    /// Cache partitions to drop once the plan has run
    pub fn affected_kinds(&self) -> Vec<RecordKind> {
        match self.target() {
            DeleteStep::FieldWork(_) => vec![RecordKind::FieldWork],
            DeleteStep::Crop(_) => vec![RecordKind::Crop, RecordKind::FieldWork],
            DeleteStep::Field(_) => RecordKind::all().to_vec(),
        }
    }

    /// Summary reported when every step succeeds
    pub fn summary(&self) -> CascadeSummary {
        let count = |kind| self.dependents().iter().filter(|s| s.kind() == kind).count();
        CascadeSummary {
            target: self.target().kind(),
            crops_deleted: count(RecordKind::Crop),
            works_deleted: count(RecordKind::FieldWork),
        }
    }
}

/// What a completed cascade removed besides the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSummary {
    pub target: RecordKind,
    pub crops_deleted: usize,
    pub works_deleted: usize,
}

impl CascadeSummary {
    /// User-facing result line
    pub fn message(&self) -> String {
        match self.target {
            RecordKind::FieldWork => "Field work deleted successfully.".to_string(),
            RecordKind::Crop if self.works_deleted == 0 => "Crop deleted successfully.".to_string(),
            RecordKind::Crop => format!(
                "Crop deleted. Also deleted: {}.",
                plural(self.works_deleted, "field work", "field works")
            ),
            RecordKind::Field if self.crops_deleted == 0 && self.works_deleted == 0 => {
                "Field deleted successfully.".to_string()
            }
            RecordKind::Field => format!(
                "Field deleted. Also deleted: {} and {}.",
                plural(self.crops_deleted, "crop", "crops"),
                plural(self.works_deleted, "field work", "field works")
            ),
        }
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

/// Errors from planning or running a cascade
#[derive(Debug, Error, Diagnostic)]
pub enum CascadeError {
    #[error("Could not load the records that depend on {target}")]
    #[diagnostic(code(fieldbook::cascade::snapshot), help("Nothing was deleted"))]
    Snapshot {
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("Deleting {failed} failed after {completed} of {total} deletions; the rest were skipped")]
    #[diagnostic(
        code(fieldbook::cascade::step),
        help("Records deleted before the failure stay deleted. Run the delete again to finish.")
    )]
    Step {
        failed: DeleteStep,
        completed: usize,
        total: usize,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] CacheError),
}

impl CascadeError {
    /// Steps that completed before the failure
    pub fn completed(&self) -> usize {
        match self {
            CascadeError::Step { completed, .. } => *completed,
            _ => 0,
        }
    }
}

/// Read the keys out of raw records, skipping records that lack them.
///
/// A skipped record that still looks related to the target is worth a
/// warning: the backend may then refuse to delete the target.
fn refs<T: DeserializeOwned>(
    values: Vec<Value>,
    kind: RecordKind,
    related: impl Fn(&Value) -> bool,
) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match T::deserialize(&value) {
            Ok(r) => Some(r),
            Err(e) if related(&value) => {
                log::warn!("Skipping unreadable {} record {}: {}", kind.noun(), value, e);
                None
            }
            Err(e) => {
                log::debug!("skipping unreadable {} record: {}", kind.noun(), e);
                None
            }
        })
        .collect()
}

/// Plan the deletion of a crop from a fresh field-work list
pub fn plan_crop_delete<T: Transport>(
    store: &RecordStore<T>,
    crop_id: u64,
) -> Result<DeletePlan, CascadeError> {
    let target = DeleteStep::Crop(crop_id).to_string();
    let values = store
        .snapshot::<FieldWork>(false)
        .map_err(|source| CascadeError::Snapshot { target, source })?;
    let works: Vec<WorkRef> = refs(values, RecordKind::FieldWork, |v| {
        v.get("crop_id").and_then(Value::as_u64) == Some(crop_id)
    });
    Ok(DeletePlan::crop(crop_id, &works))
}

/// Plan the deletion of a field from fresh crop and field-work lists
pub fn plan_field_delete<T: Transport>(
    store: &RecordStore<T>,
    field_name: &str,
) -> Result<DeletePlan, CascadeError> {
    let target = DeleteStep::Field(field_name.to_string()).to_string();
    let crop_values = store
        .snapshot::<Crop>(false)
        .map_err(|source| CascadeError::Snapshot {
            target: target.clone(),
            source,
        })?;
    let work_values = store
        .snapshot::<FieldWork>(false)
        .map_err(|source| CascadeError::Snapshot { target, source })?;

    let crops: Vec<CropRef> = refs(crop_values, RecordKind::Crop, |v| {
        v.get("field_name").and_then(Value::as_str) == Some(field_name)
    });
    let crop_ids: Vec<u64> = crops
        .iter()
        .filter(|c| c.field_name == field_name)
        .map(|c| c.crop_id)
        .collect();
    let works: Vec<WorkRef> = refs(work_values, RecordKind::FieldWork, |v| {
        v.get("crop_id")
            .and_then(Value::as_u64)
            .is_some_and(|id| crop_ids.contains(&id))
    });
    Ok(DeletePlan::field(field_name, &crops, &works))
}

/// Run a plan step by step.
///
/// The first failed delete stops the run. Partitions of the kinds deleted so
/// far are dropped from the cache either way.
pub fn execute<T: Transport>(
    store: &RecordStore<T>,
    plan: &DeletePlan,
) -> Result<CascadeSummary, CascadeError> {
    let total = plan.steps().len();

    for (i, step) in plan.steps().iter().enumerate() {
        log::debug!("cascade {}/{}: delete {}", i + 1, total, step);

        let result = match step {
            DeleteStep::FieldWork(id) => store.gateway::<FieldWork>().delete(id),
            DeleteStep::Crop(id) => store.gateway::<Crop>().delete(id),
            DeleteStep::Field(name) => store.gateway::<Field>().delete(name),
        };

        if let Err(source) = result {
            log::debug!("cascade stopped at {}: {}", step, source);
            let mut touched: Vec<RecordKind> =
                plan.steps()[..i].iter().map(DeleteStep::kind).collect();
            touched.sort();
            touched.dedup();
            if let Err(e) = store.invalidate(&touched) {
                log::warn!("Could not invalidate cache after failed delete: {}", e);
            }
            return Err(CascadeError::Step {
                failed: step.clone(),
                completed: i,
                total,
                source,
            });
        }
    }

    store.invalidate(&plan.affected_kinds())?;

    Ok(plan.summary())
}

/// Fetch dependents, then delete a crop and its field works
pub fn delete_crop<T: Transport>(
    store: &RecordStore<T>,
    crop_id: u64,
) -> Result<CascadeSummary, CascadeError> {
    let plan = plan_crop_delete(store, crop_id)?;
    execute(store, &plan)
}

/// Fetch dependents, then delete a field, its crops and their field works
pub fn delete_field<T: Transport>(
    store: &RecordStore<T>,
    field_name: &str,
) -> Result<CascadeSummary, CascadeError> {
    let plan = plan_field_delete(store, field_name)?;
    execute(store, &plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{CacheKey, QueryCache};
    use crate::core::transport::testing::MockTransport;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn crop(id: u64, field: &str) -> Value {
        json!({
            "crop_id": id,
            "field_name": field,
            "cultivated_plant_name": "Wheat",
            "crop_start_date": "2024-03-15",
            "crop_harvest_date": "2024-07-20",
            "actual_harvest_tons": 10,
            "crop_status": "активний"
        })
    }

    fn work(id: u64, crop_id: u64) -> Value {
        json!({
            "work_id": id,
            "crop_id": crop_id,
            "employee_id": 1,
            "machinery_id": 2,
            "work_type": "орка",
            "work_start_date": "2024-03-01",
            "work_end_date": "2024-03-02"
        })
    }

    fn store(mock: MockTransport) -> RecordStore<MockTransport> {
        RecordStore::new(
            mock,
            Some(QueryCache::in_memory(Duration::from_secs(300)).unwrap()),
        )
    }

    fn deletes(store: &RecordStore<MockTransport>) -> Vec<String> {
        store
            .transport()
            .routes()
            .into_iter()
            .filter(|r| r.starts_with("DELETE"))
            .collect()
    }

    #[test]
    fn test_crop_without_works() {
        let store = store(
            MockTransport::new().on("GET /field-works", json!([work(1, 99), work(2, 98)])),
        );
        let summary = delete_crop(&store, 7).unwrap();

        assert_eq!(store.transport().count("GET /field-works"), 1);
        assert_eq!(deletes(&store), vec!["DELETE /crops/7"]);
        assert_eq!(summary.works_deleted, 0);
        assert_eq!(summary.message(), "Crop deleted successfully.");
    }

    #[test]
    fn test_crop_with_works_in_list_order() {
        let store = store(MockTransport::new().on(
            "GET /field-works",
            json!({"data": [work(12, 7), work(3, 8), work(10, 7), work(11, 7)]}),
        ));
        let summary = delete_crop(&store, 7).unwrap();

        assert_eq!(
            deletes(&store),
            vec![
                "DELETE /field-works/12",
                "DELETE /field-works/10",
                "DELETE /field-works/11",
                "DELETE /crops/7",
            ]
        );
        assert_eq!(summary.message(), "Crop deleted. Also deleted: 3 field works.");
    }

    #[test]
    fn test_crop_failure_stops_remaining_steps() {
        let store = store(
            MockTransport::new()
                .on("GET /field-works", json!([work(1, 7), work(2, 7), work(3, 7)]))
                .fail("DELETE /field-works/2", 500, "db locked"),
        );
        let err = delete_crop(&store, 7).unwrap_err();

        assert_eq!(
            deletes(&store),
            vec!["DELETE /field-works/1", "DELETE /field-works/2"]
        );
        match err {
            CascadeError::Step {
                failed,
                completed,
                total,
                ..
            } => {
                assert_eq!(failed, DeleteStep::FieldWork(2));
                assert_eq!(completed, 1);
                assert_eq!(total, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_snapshot_failure_deletes_nothing() {
        let store = store(MockTransport::new().fail("GET /field-works", 503, "down"));
        let err = delete_crop(&store, 7).unwrap_err();
        assert!(matches!(err, CascadeError::Snapshot { .. }));
        assert!(deletes(&store).is_empty());
    }

    #[test]
    fn test_snapshot_bypasses_cache() {
        let store = store(MockTransport::new().on("GET /field-works", json!([work(1, 7)])));
        store
            .cache()
            .unwrap()
            .put(&CacheKey::list(RecordKind::FieldWork, false), &json!([]))
            .unwrap();

        let summary = delete_crop(&store, 7).unwrap();
        assert_eq!(summary.works_deleted, 1);
    }

    #[test]
    fn test_malformed_unrelated_work_does_not_block_crop_delete() {
        let mut broken = work(2, 99);
        broken["employee_id"] = Value::Null;
        let store = store(
            MockTransport::new().on("GET /field-works", json!([broken, work(1, 7)])),
        );
        let summary = delete_crop(&store, 7).unwrap();

        assert_eq!(
            deletes(&store),
            vec!["DELETE /field-works/1", "DELETE /crops/7"]
        );
        assert_eq!(summary.works_deleted, 1);
    }

    #[test]
    fn test_malformed_records_do_not_block_field_delete() {
        let mut odd_crop = crop(102, "North-40");
        odd_crop["crop_status"] = json!("unknown");
        let store = store(
            MockTransport::new()
                .on(
                    "GET /crops",
                    json!([{"crop_id": 300, "field_name": null}, odd_crop]),
                )
                .on(
                    "GET /field-works",
                    json!([{"work_id": "x", "crop_id": 300}, work(501, 102)]),
                ),
        );
        let summary = delete_field(&store, "North-40").unwrap();

        assert_eq!(
            deletes(&store),
            vec![
                "DELETE /field-works/501",
                "DELETE /crops/102",
                "DELETE /fields/North-40",
            ]
        );
        assert_eq!(summary.crops_deleted, 1);
    }

    #[test]
    fn test_north_40_scenario() {
        let store = store(
            MockTransport::new()
                .on(
                    "GET /crops",
                    json!([crop(101, "North-40"), crop(200, "South"), crop(102, "North-40")]),
                )
                .on(
                    "GET /field-works",
                    json!([work(501, 102), work(900, 200), work(502, 102)]),
                ),
        );
        let summary = delete_field(&store, "North-40").unwrap();

        assert_eq!(store.transport().count("GET /crops"), 1);
        assert_eq!(store.transport().count("GET /field-works"), 1);
        assert_eq!(
            deletes(&store),
            vec![
                "DELETE /field-works/501",
                "DELETE /field-works/502",
                "DELETE /crops/101",
                "DELETE /crops/102",
                "DELETE /fields/North-40",
            ]
        );
        assert_eq!(summary.crops_deleted, 2);
        assert_eq!(summary.works_deleted, 2);
        assert_eq!(
            summary.message(),
            "Field deleted. Also deleted: 2 crops and 2 field works."
        );
    }

    #[test]
    fn test_field_without_dependents() {
        let store = store(
            MockTransport::new()
                .on("GET /crops", json!([]))
                .on("GET /field-works", json!([])),
        );
        let summary = delete_field(&store, "Empty").unwrap();
        assert_eq!(deletes(&store), vec!["DELETE /fields/Empty"]);
        assert_eq!(summary.message(), "Field deleted successfully.");
    }

    #[test]
    fn test_field_plan_works_precede_their_crop() {
        let crops: Vec<CropRef> =
            serde_json::from_value(json!([crop(1, "A"), crop(2, "A"), crop(3, "A")])).unwrap();
        let works: Vec<WorkRef> =
            serde_json::from_value(json!([work(30, 3), work(10, 1), work(31, 3)])).unwrap();
        let plan = DeletePlan::field("A", &crops, &works);

        assert_eq!(
            plan.steps(),
            &[
                DeleteStep::FieldWork(10),
                DeleteStep::FieldWork(30),
                DeleteStep::FieldWork(31),
                DeleteStep::Crop(1),
                DeleteStep::Crop(2),
                DeleteStep::Crop(3),
                DeleteStep::Field("A".to_string()),
            ]
        );
        assert_eq!(plan.target(), &DeleteStep::Field("A".to_string()));
        assert_eq!(plan.dependents().len(), 6);
    }

    #[test]
    fn test_failure_invalidates_touched_partitions() {
        let store = store(
            MockTransport::new()
                .on("GET /crops", json!([crop(1, "A")]))
                .on("GET /field-works", json!([work(10, 1)]))
                .fail("DELETE /crops/1", 409, "still referenced"),
        );
        let cache = store.cache().unwrap();
        cache
            .put(&CacheKey::list(RecordKind::FieldWork, true), &json!([work(10, 1)]))
            .unwrap();
        cache
            .put(&CacheKey::list(RecordKind::Field, false), &json!([]))
            .unwrap();

        let err = delete_field(&store, "A").unwrap_err();
        assert_eq!(err.completed(), 1);
        assert!(deletes(&store).iter().all(|r| r != "DELETE /fields/A"));

        assert!(cache
            .get(&CacheKey::list(RecordKind::FieldWork, true))
            .unwrap()
            .is_none());
        assert!(cache
            .get(&CacheKey::list(RecordKind::Field, false))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_success_invalidates_all_affected() {
        let store = store(MockTransport::new().on("GET /field-works", json!([])));
        let cache = store.cache().unwrap();
        cache
            .put(&CacheKey::list(RecordKind::Crop, false), &json!([]))
            .unwrap();

        delete_crop(&store, 4).unwrap();
        assert!(cache
            .get(&CacheKey::list(RecordKind::Crop, false))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_single_work_plan() {
        let plan = DeletePlan::field_work(5);
        assert!(plan.dependents().is_empty());
        assert_eq!(plan.affected_kinds(), vec![RecordKind::FieldWork]);
        assert_eq!(plan.summary().message(), "Field work deleted successfully.");
    }
}
