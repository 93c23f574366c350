//! Embedded form schemas

use rust_embed::Embed;
use std::borrow::Cow;

use crate::core::identity::RecordKind;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Which form a schema checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormMode {
    /// Every field required
    Create,
    /// Every field optional, at least one non-empty
    Edit,
}

impl FormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormMode::Create => "create",
            FormMode::Edit => "edit",
        }
    }
}

/// Lookup of the JSON Schema documents compiled into the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaRegistry;

impl SchemaRegistry {
    /// File name of a schema, e.g. `crops.edit.schema.json`
    pub fn file_name(kind: RecordKind, mode: FormMode) -> String {
        format!("{}.{}.schema.json", kind.as_str(), mode.as_str())
    }

    /// Get the schema text for a form
    pub fn get(&self, kind: RecordKind, mode: FormMode) -> Option<Cow<'static, str>> {
        let file = EmbeddedSchemas::get(&Self::file_name(kind, mode))?;
        match file.data {
            Cow::Borrowed(bytes) => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
            Cow::Owned(bytes) => String::from_utf8(bytes).ok().map(Cow::Owned),
        }
    }

    /// Names of every embedded schema
    pub fn names(&self) -> Vec<String> {
        EmbeddedSchemas::iter().map(|name| name.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_form_has_a_schema() {
        let registry = SchemaRegistry;
        for kind in RecordKind::all() {
            for mode in [FormMode::Create, FormMode::Edit] {
                let text = registry.get(*kind, mode);
                assert!(text.is_some(), "missing {}", SchemaRegistry::file_name(*kind, mode));
                let parsed: serde_json::Value = serde_json::from_str(&text.unwrap()).unwrap();
                assert_eq!(parsed["type"], "object");
            }
        }
        assert_eq!(registry.names().len(), 6);
    }
}
