//! Record trait - common interface for all record types

use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{Identifier, RecordKind};

/// Common trait for the three record types served by the backend
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Which resource (and cache partition) the record lives in
    const KIND: RecordKind;

    /// Key type used in the resource path
    type Key: Identifier;

    /// Full field set posted on create
    type Draft: Serialize + DeserializeOwned;

    /// Partial field set sent on update
    type Patch: Serialize + DeserializeOwned;

    /// Get the record's key
    fn key(&self) -> Self::Key;
}

/// Options for reading records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Ask the backend to expand related records
    pub with_relations: bool,
    /// Signal that the read feeds an edit form (fields only)
    pub for_update: bool,
}

impl ReadOptions {
    pub fn with_relations(with_relations: bool) -> Self {
        Self {
            with_relations,
            for_update: false,
        }
    }

    /// Query parameters for this read. Flags are only sent when set.
    ///
    /// Fields expand their crops with `withCrops`; crops and field works use
    /// `withRelations`.
    pub fn query(&self, kind: RecordKind) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if self.with_relations {
            let name = match kind {
                RecordKind::Field => "withCrops",
                RecordKind::Crop | RecordKind::FieldWork => "withRelations",
            };
            params.push((name.to_string(), "true".to_string()));
        }
        if self.for_update && kind == RecordKind::Field {
            params.push(("forUpdate".to_string(), "true".to_string()));
        }
        params
    }

    /// Stable text form used in cache keys
    pub fn cache_fragment(&self) -> String {
        format!(
            "rel={};upd={}",
            u8::from(self.with_relations),
            u8::from(self.for_update)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_no_params() {
        assert!(ReadOptions::default().query(RecordKind::Crop).is_empty());
    }

    #[test]
    fn test_field_relation_param_name() {
        let params = ReadOptions::with_relations(true).query(RecordKind::Field);
        assert_eq!(params, vec![("withCrops".to_string(), "true".to_string())]);
    }

    #[test]
    fn test_for_update_only_on_fields() {
        let opts = ReadOptions {
            with_relations: false,
            for_update: true,
        };
        assert_eq!(opts.query(RecordKind::Field).len(), 1);
        assert!(opts.query(RecordKind::FieldWork).is_empty());
    }
}
