//! Record type definitions
//!
//! Fieldbook keeps three record types:
//!
//! - [`Field`] - a named plot of land with area, soil type and location
//! - [`Crop`] - a planting on a field, from sowing to harvest
//! - [`FieldWork`] - a job done for a crop (plowing, spraying, ...)
//!
//! Enumerated attributes travel over the wire as the backend's Ukrainian
//! labels. Each enum also has an English slug accepted on the command line.

/// Declare an enum whose serde form is the backend's wire label.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => ($wire:literal, $slug:literal), )+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
        )]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// All values, in the order the backend lists them
            pub fn all() -> &'static [$name] {
                &[$($name::$variant),+]
            }

            /// Label used by the backend
            pub fn wire(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            /// English command-line slug
            pub fn slug(&self) -> &'static str {
                match self {
                    $($name::$variant => $slug,)+
                }
            }

            /// Accept either the slug (any case) or the exact wire label
            pub fn parse_input(input: &str) -> Option<Self> {
                let trimmed = input.trim();
                let lower = trimmed.to_lowercase();
                Self::all()
                    .iter()
                    .copied()
                    .find(|v| v.slug() == lower || v.wire() == trimmed)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.wire())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse_input(s).ok_or_else(|| {
                    let slugs: Vec<&str> = Self::all().iter().map(|v| v.slug()).collect();
                    format!("Unknown value '{}'. Use one of: {}", s, slugs.join(", "))
                })
            }
        }
    };
}

pub mod crop;
pub mod field;
pub mod field_work;

pub use crop::{Crop, CropStatus};
pub use field::{Field, SoilType};
pub use field_work::{FieldWork, WorkType};

/// Deserialize a number the backend may send either as JSON number or as
/// a decimal string (e.g. `"12.500"` from a NUMERIC column)
pub(crate) fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde::Deserialize;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("number out of range")),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("invalid number '{}'", s))),
        other => Err(D::Error::custom(format!("expected number, got {}", other))),
    }
}

/// English slug for any enumerated wire label
pub fn slug_for_label(label: &str) -> Option<&'static str> {
    SoilType::all()
        .iter()
        .find(|v| v.wire() == label)
        .map(|v| v.slug())
        .or_else(|| {
            CropStatus::all()
                .iter()
                .find(|v| v.wire() == label)
                .map(|v| v.slug())
        })
        .or_else(|| {
            WorkType::all()
                .iter()
                .find(|v| v.wire() == label)
                .map(|v| v.slug())
        })
}
