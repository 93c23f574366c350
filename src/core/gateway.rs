//! Record gateway - REST operations for one record type
//!
//! A gateway issues the list/get/create/update/delete requests for a
//! [`Record`] type and normalizes the backend's response envelopes. The
//! backend may answer with the bare payload or wrap it as `{"data": ...}`;
//! callers always see the payload.

use std::marker::PhantomData;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::core::identity::RecordKind;
use crate::core::record::{ReadOptions, Record};
use crate::core::transport::{ApiRequest, Method, Transport, TransportError};

/// Errors from gateway operations
#[derive(Debug, Error, Diagnostic)]
pub enum GatewayError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error("Unexpected {kind} record from backend: {message}")]
    #[diagnostic(code(fieldbook::gateway::decode))]
    Decode { kind: RecordKind, message: String },

    #[error("Cannot encode {kind} request: {message}")]
    #[diagnostic(code(fieldbook::gateway::encode))]
    Encode { kind: RecordKind, message: String },
}

impl GatewayError {
    /// HTTP status of an application failure
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// REST client for one record type
pub struct Gateway<'a, R: Record> {
    transport: &'a dyn Transport,
    _record: PhantomData<R>,
}

impl<'a, R: Record> Gateway<'a, R> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            _record: PhantomData,
        }
    }

    fn collection() -> Vec<String> {
        vec![R::KIND.as_str().to_string()]
    }

    fn member(key: &R::Key) -> Vec<String> {
        vec![R::KIND.as_str().to_string(), key.to_string()]
    }

    /// Fetch the list payload, normalized to a sequence of raw records
    pub fn fetch_list(&self, with_relations: bool) -> Result<Vec<Value>, GatewayError> {
        let request = ApiRequest::new(Method::Get, Self::collection())
            .with_query(ReadOptions::with_relations(with_relations).query(R::KIND));
        let body = self.transport.execute(&request)?;
        Ok(unwrap_list(body))
    }

    /// Fetch one raw record
    pub fn fetch_one(&self, key: &R::Key, options: ReadOptions) -> Result<Value, GatewayError> {
        let request =
            ApiRequest::new(Method::Get, Self::member(key)).with_query(options.query(R::KIND));
        let body = self.transport.execute(&request)?;
        Ok(unwrap_one(body))
    }

    /// List all records
    pub fn list(&self, with_relations: bool) -> Result<Vec<R>, GatewayError> {
        decode_list(self.fetch_list(with_relations)?)
    }

    /// Get one record by key
    pub fn get(&self, key: &R::Key, options: ReadOptions) -> Result<R, GatewayError> {
        decode_one(self.fetch_one(key, options)?)
    }

    /// POST a draft and return the raw (unwrapped) response body
    pub fn send_create(&self, draft: &R::Draft) -> Result<Value, GatewayError> {
        let request =
            ApiRequest::new(Method::Post, Self::collection()).with_body(encode::<R, _>(draft)?);
        Ok(unwrap_one(self.transport.execute(&request)?))
    }

    /// PUT the changed fields and return the raw (unwrapped) response body
    pub fn send_update(&self, key: &R::Key, patch: &R::Patch) -> Result<Value, GatewayError> {
        let request =
            ApiRequest::new(Method::Put, Self::member(key)).with_body(encode::<R, _>(patch)?);
        Ok(unwrap_one(self.transport.execute(&request)?))
    }

    /// Create a record; the result carries the backend-assigned id
    pub fn create(&self, draft: &R::Draft) -> Result<R, GatewayError> {
        decode_one(self.send_create(draft)?)
    }

    /// Update a record with only the changed fields
    pub fn update(&self, key: &R::Key, patch: &R::Patch) -> Result<R, GatewayError> {
        decode_one(self.send_update(key, patch)?)
    }

    /// Delete a record
    pub fn delete(&self, key: &R::Key) -> Result<(), GatewayError> {
        let request = ApiRequest::new(Method::Delete, Self::member(key));
        self.transport.execute(&request)?;
        Ok(())
    }
}

fn encode<R: Record, T: serde::Serialize>(value: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(value).map_err(|e| GatewayError::Encode {
        kind: R::KIND,
        message: e.to_string(),
    })
}

/// Decode raw records into typed ones
pub fn decode_list<R: Record>(values: Vec<Value>) -> Result<Vec<R>, GatewayError> {
    values.into_iter().map(decode_one).collect()
}

/// Decode one raw record
pub fn decode_one<R: Record>(value: Value) -> Result<R, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode {
        kind: R::KIND,
        message: e.to_string(),
    })
}

/// Normalize a list envelope.
///
/// A bare array is the list. An object yields its `data` member when that is
/// an array. Anything else (`{"data": null}`, no `data`, an empty body, a
/// scalar) is an empty list.
pub fn unwrap_list(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Normalize a single-record envelope: a truthy `data` member is the record,
/// otherwise the body itself is
pub fn unwrap_one(body: Value) -> Value {
    let enveloped =
        matches!(&body, Value::Object(map) if map.get("data").is_some_and(is_truthy));
    match body {
        Value::Object(mut map) if enveloped => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::testing::MockTransport;
    use crate::entities::{Crop, CropStatus, Field, FieldWork};
    use serde_json::json;

    fn crop_json(id: u64) -> Value {
        json!({
            "crop_id": id,
            "field_name": "North-40",
            "cultivated_plant_name": "Wheat",
            "crop_start_date": "2024-03-15",
            "crop_harvest_date": "2024-07-20",
            "actual_harvest_tons": 85,
            "crop_status": "активний"
        })
    }

    #[test]
    fn test_list_bare_and_enveloped_match() {
        let bare = MockTransport::new().on("GET /crops", json!([crop_json(1), crop_json(2)]));
        let wrapped =
            MockTransport::new().on("GET /crops", json!({"data": [crop_json(1), crop_json(2)]}));

        let a: Vec<u64> = Gateway::<Crop>::new(&bare)
            .list(false)
            .unwrap()
            .iter()
            .map(|c| c.crop_id)
            .collect();
        let b: Vec<u64> = Gateway::<Crop>::new(&wrapped)
            .list(false)
            .unwrap()
            .iter()
            .map(|c| c.crop_id)
            .collect();
        assert_eq!(a, vec![1, 2]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_list_degenerate_envelopes_are_empty() {
        assert!(unwrap_list(json!({"data": null})).is_empty());
        assert!(unwrap_list(json!({"items": [1]})).is_empty());
        assert!(unwrap_list(json!({"data": {"crop_id": 1}})).is_empty());
        assert!(unwrap_list(Value::Null).is_empty());
        assert!(unwrap_list(json!("oops")).is_empty());

        let mock = MockTransport::new().on("GET /field-works", json!({"data": null}));
        assert!(Gateway::<FieldWork>::new(&mock).list(false).unwrap().is_empty());
    }

    #[test]
    fn test_unwrap_one() {
        assert_eq!(unwrap_one(json!({"data": {"a": 1}})), json!({"a": 1}));
        assert_eq!(unwrap_one(json!({"a": 1})), json!({"a": 1}));
        assert_eq!(
            unwrap_one(json!({"data": null, "a": 1})),
            json!({"data": null, "a": 1})
        );
    }

    #[test]
    fn test_relation_flag_only_when_set() {
        let mock = MockTransport::new().on("GET /crops", json!([]));
        let gateway = Gateway::<Crop>::new(&mock);
        gateway.list(false).unwrap();
        gateway.list(true).unwrap();

        let requests = mock.requests();
        assert!(requests[0].query.is_empty());
        assert_eq!(
            requests[1].query,
            vec![("withRelations".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_get_field_with_options() {
        let mock = MockTransport::new().on(
            "GET /fields/North 40",
            json!({"data": {
                "field_name": "North 40",
                "area_hectares": "12.5",
                "soil_type": "чорнозем",
                "field_location": "Poltava"
            }}),
        );
        let options = ReadOptions {
            with_relations: true,
            for_update: true,
        };
        let field = Gateway::<Field>::new(&mock)
            .get(&"North 40".to_string(), options)
            .unwrap();
        assert_eq!(field.area_hectares, 12.5);

        let query = &mock.requests()[0].query;
        assert!(query.contains(&("withCrops".to_string(), "true".to_string())));
        assert!(query.contains(&("forUpdate".to_string(), "true".to_string())));
    }

    #[test]
    fn test_update_sends_partial_body() {
        let mock = MockTransport::new().on("PUT /crops/7", crop_json(7));
        let patch = crate::entities::crop::CropPatch {
            crop_status: Some(CropStatus::Completed),
            ..Default::default()
        };
        Gateway::<Crop>::new(&mock).update(&7, &patch).unwrap();
        assert_eq!(
            mock.requests()[0].body,
            Some(json!({"crop_status": "завершений"}))
        );
    }

    #[test]
    fn test_create_unwraps_envelope() {
        let mock = MockTransport::new().on("POST /crops", json!({"data": crop_json(41)}));
        let draft: crate::entities::crop::CropDraft = serde_json::from_value(json!({
            "field_name": "North-40",
            "cultivated_plant_name": "Wheat",
            "crop_start_date": "2024-03-15",
            "crop_harvest_date": "2024-07-20",
            "actual_harvest_tons": 85,
            "crop_status": "активний"
        }))
        .unwrap();

        let created = Gateway::<Crop>::new(&mock).create(&draft).unwrap();
        assert_eq!(created.crop_id, 41);
        assert_eq!(
            mock.requests()[0].body.as_ref().unwrap()["field_name"],
            json!("North-40")
        );
    }

    #[test]
    fn test_send_update_keeps_acknowledgement_body() {
        let mock = MockTransport::new().on("PUT /crops/7", json!({"message": "Crop updated"}));
        let body = Gateway::<Crop>::new(&mock)
            .send_update(&7, &Default::default())
            .unwrap();
        assert_eq!(body, json!({"message": "Crop updated"}));
    }

    #[test]
    fn test_delete_propagates_status() {
        let mock = MockTransport::new().fail("DELETE /crops/9", 500, "boom");
        let err = Gateway::<Crop>::new(&mock).delete(&9).unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_decode_error_names_kind() {
        let mock = MockTransport::new().on("GET /crops/3", json!({"crop_id": "x"}));
        let err = Gateway::<Crop>::new(&mock)
            .get(&3, ReadOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("crops"));
    }
}
