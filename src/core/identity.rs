//! Record kinds and identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The three record types kept by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordKind {
    /// Field (natural key: name)
    Field,
    /// Crop grown on a field
    Crop,
    /// Work carried out for a crop
    FieldWork,
}

impl RecordKind {
    /// Resource path segment on the backend (also the cache partition name)
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Field => "fields",
            RecordKind::Crop => "crops",
            RecordKind::FieldWork => "field-works",
        }
    }

    /// Human-readable singular noun
    pub fn noun(&self) -> &'static str {
        match self {
            RecordKind::Field => "field",
            RecordKind::Crop => "crop",
            RecordKind::FieldWork => "field work",
        }
    }

    /// Get all kinds, parents before dependents
    pub fn all() -> &'static [RecordKind] {
        &[RecordKind::Field, RecordKind::Crop, RecordKind::FieldWork]
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fields" | "field" => Ok(RecordKind::Field),
            "crops" | "crop" => Ok(RecordKind::Crop),
            "field-works" | "field-work" | "works" | "work" => Ok(RecordKind::FieldWork),
            _ => Err(KindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown record kind: '{0}' (expected fields, crops or field-works)")]
pub struct KindParseError(pub String);

/// A record key as it appears in a resource path
///
/// Fields are keyed by name, crops and field works by a backend-assigned
/// integer. A key that is empty (or zero) never addresses a record.
pub trait Identifier: fmt::Display + Clone {
    /// Whether the key can address a record at all
    fn is_present(&self) -> bool;
}

impl Identifier for String {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Identifier for u64 {
    fn is_present(&self) -> bool {
        *self != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_paths() {
        assert_eq!(RecordKind::Field.as_str(), "fields");
        assert_eq!(RecordKind::Crop.as_str(), "crops");
        assert_eq!(RecordKind::FieldWork.as_str(), "field-works");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("field".parse::<RecordKind>().unwrap(), RecordKind::Field);
        assert_eq!("CROPS".parse::<RecordKind>().unwrap(), RecordKind::Crop);
        assert_eq!("works".parse::<RecordKind>().unwrap(), RecordKind::FieldWork);
        assert!("tractors".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_identifier_presence() {
        assert!(!String::new().is_present());
        assert!("North-40".to_string().is_present());
        assert!(!0u64.is_present());
        assert!(42u64.is_present());
    }
}
