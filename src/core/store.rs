//! Record store - cached reads and invalidating writes
//!
//! The store is the one place the rest of the crate goes through to reach the
//! backend. Reads consult the query cache first; successful writes drop the
//! whole cache partition of the record's kind.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::cache::{CacheError, CacheKey, QueryCache};
use crate::core::gateway::{decode_list, decode_one, unwrap_list, Gateway, GatewayError};
use crate::core::identity::{Identifier, RecordKind};
use crate::core::record::{ReadOptions, Record};
use crate::core::transport::{HttpTransport, Transport};

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] CacheError),
}

impl StoreError {
    /// HTTP status of an application failure
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Gateway(e) => e.status(),
            StoreError::Cache(_) => None,
        }
    }
}

/// Gateways plus the query cache
pub struct RecordStore<T: Transport = HttpTransport> {
    transport: T,
    cache: Option<QueryCache>,
}

impl<T: Transport> RecordStore<T> {
    /// Create a store; `None` disables caching entirely
    pub fn new(transport: T, cache: Option<QueryCache>) -> Self {
        Self { transport, cache }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> Option<&QueryCache> {
        self.cache.as_ref()
    }

    /// Uncached gateway for a record type
    pub fn gateway<R: Record>(&self) -> Gateway<'_, R> {
        Gateway::new(&self.transport)
    }

    /// List all records of a type, served from cache when fresh
    pub fn list<R: Record>(&self, with_relations: bool) -> Result<Vec<R>, StoreError> {
        let key = CacheKey::list(R::KIND, with_relations);
        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get(&key)? {
                return Ok(decode_list(unwrap_list(payload))?);
            }
        }

        let values = self.gateway::<R>().fetch_list(with_relations)?;
        if let Some(cache) = &self.cache {
            cache.put(&key, &serde_json::Value::Array(values.clone()))?;
        }
        Ok(decode_list(values)?)
    }

    /// List straight from the backend, refreshing the cached entry.
    ///
    /// Records come back undecoded so a caller that needs only a few
    /// members isn't stopped by one malformed record.
    pub fn snapshot<R: Record>(
        &self,
        with_relations: bool,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let values = self.gateway::<R>().fetch_list(with_relations)?;
        if let Some(cache) = &self.cache {
            cache.put(
                &CacheKey::list(R::KIND, with_relations),
                &serde_json::Value::Array(values.clone()),
            )?;
        }
        Ok(values)
    }

    /// Get one record.
    ///
    /// A key that can't address a record (empty name, id 0) yields `None`
    /// without touching the backend.
    pub fn get<R: Record>(
        &self,
        key: &R::Key,
        options: ReadOptions,
    ) -> Result<Option<R>, StoreError> {
        if !key.is_present() {
            return Ok(None);
        }

        let cache_key = CacheKey::record(R::KIND, &key.to_string(), options);
        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get(&cache_key)? {
                return Ok(Some(decode_one(payload)?));
            }
        }

        let value = self.gateway::<R>().fetch_one(key, options)?;
        if let Some(cache) = &self.cache {
            cache.put(&cache_key, &value)?;
        }
        Ok(Some(decode_one(value)?))
    }

    /// Create a record.
    ///
    /// The partition is dropped as soon as the backend accepts the write.
    /// `None` means the backend acknowledged it without echoing a record.
    pub fn create<R: Record>(&self, draft: &R::Draft) -> Result<Option<R>, StoreError> {
        let body = self.gateway::<R>().send_create(draft)?;
        self.invalidate(&[R::KIND])?;
        Ok(written::<R>(body))
    }

    /// Update a record; see [`RecordStore::create`] for the result
    pub fn update<R: Record>(
        &self,
        key: &R::Key,
        patch: &R::Patch,
    ) -> Result<Option<R>, StoreError> {
        let body = self.gateway::<R>().send_update(key, patch)?;
        self.invalidate(&[R::KIND])?;
        Ok(written::<R>(body))
    }

    pub fn delete<R: Record>(&self, key: &R::Key) -> Result<(), StoreError> {
        self.gateway::<R>().delete(key)?;
        self.invalidate(&[R::KIND])?;
        Ok(())
    }

    /// Drop the cache partitions of the given kinds
    pub fn invalidate(&self, kinds: &[RecordKind]) -> Result<(), CacheError> {
        if let Some(cache) = &self.cache {
            for kind in kinds {
                cache.invalidate(*kind)?;
            }
        }
        Ok(())
    }
}

/// Decode the body of an accepted write, if it is a record at all
fn written<R: Record>(body: serde_json::Value) -> Option<R> {
    match decode_one(body) {
        Ok(record) => Some(record),
        Err(e) => {
            log::debug!("{} write acknowledged without a record: {}", R::KIND, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::testing::MockTransport;
    use crate::entities::field::{FieldDraft, FieldPatch};
    use crate::entities::{Crop, Field, SoilType};
    use serde_json::json;
    use std::time::Duration;

    fn store(mock: MockTransport) -> RecordStore<MockTransport> {
        let cache = QueryCache::in_memory(Duration::from_secs(300)).unwrap();
        RecordStore::new(mock, Some(cache))
    }

    fn field_json() -> serde_json::Value {
        json!({
            "field_name": "North-40",
            "area_hectares": 16.25,
            "soil_type": "чорнозем",
            "field_location": "Poltava"
        })
    }

    #[test]
    fn test_list_served_from_cache() {
        let store = store(MockTransport::new().on("GET /fields", json!([field_json()])));
        assert_eq!(store.list::<Field>(false).unwrap().len(), 1);
        assert_eq!(store.list::<Field>(false).unwrap().len(), 1);
        assert_eq!(store.transport().count("GET /fields"), 1);
    }

    #[test]
    fn test_absent_key_skips_network() {
        let store = store(MockTransport::new());
        assert!(store
            .get::<Field>(&String::new(), ReadOptions::default())
            .unwrap()
            .is_none());
        assert!(store
            .get::<Crop>(&0, ReadOptions::default())
            .unwrap()
            .is_none());
        assert!(store.transport().routes().is_empty());
    }

    #[test]
    fn test_update_invalidates_partition() {
        let store = store(
            MockTransport::new()
                .on("GET /fields", json!([field_json()]))
                .on("PUT /fields/North-40", field_json()),
        );
        store.list::<Field>(false).unwrap();

        let patch = FieldPatch {
            area_hectares: Some(20.0),
            ..Default::default()
        };
        store.update::<Field>(&"North-40".to_string(), &patch).unwrap();
        store.list::<Field>(false).unwrap();

        assert_eq!(store.transport().count("GET /fields"), 2);
    }

    #[test]
    fn test_update_acknowledgement_still_invalidates() {
        let store = store(
            MockTransport::new()
                .on("GET /fields", json!([field_json()]))
                .on("PUT /fields/North-40", json!({"message": "Field updated"})),
        );
        store.list::<Field>(false).unwrap();

        let patch = FieldPatch {
            soil_type: Some(SoilType::Clay),
            ..Default::default()
        };
        let updated = store.update::<Field>(&"North-40".to_string(), &patch).unwrap();
        assert!(updated.is_none());
        store.list::<Field>(false).unwrap();

        assert_eq!(store.transport().count("GET /fields"), 2);
    }

    #[test]
    fn test_create_invalidates_partition() {
        let store = store(
            MockTransport::new()
                .on("GET /fields", json!([field_json()]))
                .on("POST /fields", json!({"data": field_json()})),
        );
        store.list::<Field>(false).unwrap();

        let draft: FieldDraft = serde_json::from_value(field_json()).unwrap();
        let created = store.create::<Field>(&draft).unwrap().unwrap();
        assert_eq!(created.field_name, "North-40");
        store.list::<Field>(false).unwrap();

        assert_eq!(store.transport().count("GET /fields"), 2);
    }

    #[test]
    fn test_create_with_empty_body_still_invalidates() {
        let store = store(
            MockTransport::new()
                .on("GET /fields", json!([field_json()]))
                .on("POST /fields", serde_json::Value::Null),
        );
        store.list::<Field>(false).unwrap();

        let draft: FieldDraft = serde_json::from_value(field_json()).unwrap();
        assert!(store.create::<Field>(&draft).unwrap().is_none());
        store.list::<Field>(false).unwrap();

        assert_eq!(store.transport().count("GET /fields"), 2);
    }

    #[test]
    fn test_delete_invalidates_partition() {
        let store = store(MockTransport::new().on("GET /fields", json!([field_json()])));
        store.list::<Field>(false).unwrap();
        store.delete::<Field>(&"North-40".to_string()).unwrap();
        store.list::<Field>(false).unwrap();

        assert_eq!(store.transport().count("DELETE /fields/North-40"), 1);
        assert_eq!(store.transport().count("GET /fields"), 2);
    }

    #[test]
    fn test_snapshot_skips_cache_and_keeps_raw_records() {
        let store = store(
            MockTransport::new().on("GET /crops", json!([{"crop_id": 3, "field_name": null}])),
        );
        let first = store.snapshot::<Crop>(false).unwrap();
        store.snapshot::<Crop>(false).unwrap();

        assert_eq!(first, vec![json!({"crop_id": 3, "field_name": null})]);
        assert_eq!(store.transport().count("GET /crops"), 2);
    }

    #[test]
    fn test_failed_write_keeps_cache() {
        let store = store(
            MockTransport::new()
                .on("GET /fields", json!([field_json()]))
                .fail("DELETE /fields/North-40", 500, "boom"),
        );
        store.list::<Field>(false).unwrap();
        assert!(store.delete::<Field>(&"North-40".to_string()).is_err());
        store.list::<Field>(false).unwrap();

        assert_eq!(store.transport().count("GET /fields"), 1);
    }

    #[test]
    fn test_without_cache_always_fetches() {
        let store = RecordStore::new(MockTransport::new().on("GET /crops", json!([])), None);
        store.list::<Crop>(false).unwrap();
        store.list::<Crop>(false).unwrap();
        assert_eq!(store.transport().count("GET /crops"), 2);
    }
}
