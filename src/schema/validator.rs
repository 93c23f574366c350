//! Form validation with detailed error reporting

use jsonschema::error::ValidationErrorKind;
use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator as JsonValidator};
use miette::Diagnostic;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::identity::RecordKind;
use crate::core::record::Record;
use crate::entities::slug_for_label;
use crate::schema::form::FormInput;
use crate::schema::registry::{FormMode, SchemaRegistry};

/// Message shown when an edit form carries no changes
pub const EMPTY_EDIT_MESSAGE: &str = "Enter at least one field to update";

/// Rejected form input
#[derive(Debug, Error, Diagnostic)]
#[error("Invalid {noun}: {summary}")]
#[diagnostic(code(fieldbook::form::invalid))]
pub struct ValidationError {
    noun: &'static str,
    summary: String,

    /// Error that belongs to the form as a whole
    form_error: Option<String>,

    #[related]
    violations: Vec<FieldViolation>,
}

/// A problem with one form member
#[derive(Debug, Error, Diagnostic)]
#[error("{field}: {message}")]
pub struct FieldViolation {
    pub field: String,
    pub message: String,

    #[help]
    help: Option<String>,
}

impl ValidationError {
    fn new(kind: RecordKind, form_error: Option<String>, violations: Vec<FieldViolation>) -> Self {
        let summary = match (&form_error, violations.len()) {
            (Some(message), 0) => message.clone(),
            (Some(message), n) => format!("{}; {} invalid field(s)", message, n),
            (None, 1) => "1 invalid field".to_string(),
            (None, n) => format!("{} invalid fields", n),
        };
        Self {
            noun: kind.noun(),
            summary,
            form_error,
            violations,
        }
    }

    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Whether a member has at least one violation
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl FieldViolation {
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

/// Form validator with compiled schemas
pub struct FormValidator {
    compiled: HashMap<(RecordKind, FormMode), JsonValidator>,
}

impl FormValidator {
    /// Create a new validator with schemas from the registry
    pub fn new(registry: &SchemaRegistry) -> Self {
        let mut compiled = HashMap::new();

        for kind in RecordKind::all() {
            for mode in [FormMode::Create, FormMode::Edit] {
                let Some(text) = registry.get(*kind, mode) else {
                    continue;
                };
                match serde_json::from_str::<JsonValue>(&text)
                    .map_err(|e| e.to_string())
                    .and_then(|json| validator_for(&json).map_err(|e| e.to_string()))
                {
                    Ok(validator) => {
                        compiled.insert((*kind, mode), validator);
                    }
                    Err(e) => log::warn!(
                        "Skipping schema {}: {}",
                        SchemaRegistry::file_name(*kind, mode),
                        e
                    ),
                }
            }
        }

        Self { compiled }
    }

    /// Check form input against the schema for a record kind and mode
    pub fn validate(
        &self,
        kind: RecordKind,
        mode: FormMode,
        input: &FormInput,
    ) -> Result<(), ValidationError> {
        let Some(schema) = self.compiled.get(&(kind, mode)) else {
            return Err(ValidationError::new(
                kind,
                Some(format!("no {} schema available", mode.as_str())),
                Vec::new(),
            ));
        };

        let instance = input.to_value();
        let mut form_error = None;
        let mut violations = Vec::new();

        for error in schema.iter_errors(&instance) {
            if is_form_level(&error) {
                form_error = Some(match mode {
                    FormMode::Edit => EMPTY_EDIT_MESSAGE.to_string(),
                    FormMode::Create => error.to_string(),
                });
            } else {
                violations.extend(error_to_violations(&error));
            }
        }

        if form_error.is_none() && violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(kind, form_error, violations))
        }
    }

    /// Validate a create form and build the draft to post
    pub fn draft<R: Record>(&self, input: &FormInput) -> Result<R::Draft, ValidationError> {
        self.validate(R::KIND, FormMode::Create, input)?;
        decode::<R, R::Draft>(input.to_value())
    }

    /// Validate an edit form and build a patch of the changed members only
    pub fn patch<R: Record>(&self, input: &FormInput) -> Result<R::Patch, ValidationError> {
        self.validate(R::KIND, FormMode::Edit, input)?;
        decode::<R, R::Patch>(input.changed())
    }
}

impl Default for FormValidator {
    fn default() -> Self {
        Self::new(&SchemaRegistry)
    }
}

fn decode<R: Record, T: DeserializeOwned>(value: JsonValue) -> Result<T, ValidationError> {
    serde_json::from_value(value)
        .map_err(|e| ValidationError::new(R::KIND, Some(e.to_string()), Vec::new()))
}

/// Errors at the document root that aren't about a specific member
fn is_form_level(error: &JsonSchemaError) -> bool {
    error.instance_path.as_str().is_empty()
        && !matches!(
            error.kind,
            ValidationErrorKind::Required { .. } | ValidationErrorKind::AdditionalProperties { .. }
        )
}

/// Convert a JSON Schema validation error to member violations
fn error_to_violations(error: &JsonSchemaError) -> Vec<FieldViolation> {
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let field = property
                .as_str()
                .map(|s| s.to_string())
                .unwrap_or_else(|| property.to_string());
            vec![FieldViolation {
                field,
                message: "is required".to_string(),
                help: None,
            }]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|name| FieldViolation {
                field: name.clone(),
                message: "can't be set on this form".to_string(),
                help: None,
            })
            .collect(),
        _ => vec![FieldViolation {
            field: field_name(error),
            message: format_schema_error(error),
            help: generate_help_message(error),
        }],
    }
}

fn field_name(error: &JsonSchemaError) -> String {
    let path = error.instance_path.as_str();
    path.trim_start_matches('/').to_string()
}

/// Format a JSON Schema error into a user-friendly message
fn format_schema_error(error: &JsonSchemaError) -> String {
    match &error.kind {
        ValidationErrorKind::Type { .. } => match error.instance.as_ref() {
            JsonValue::String(_) => "must be a number".to_string(),
            JsonValue::Number(_) => "must be a whole number".to_string(),
            _ => "has the wrong type".to_string(),
        },
        // The edit-form numeric sentinel only admits the empty string.
        ValidationErrorKind::MaxLength { limit: 0 } => "must be a number".to_string(),
        ValidationErrorKind::MinLength { .. } => "must not be empty".to_string(),
        ValidationErrorKind::ExclusiveMinimum { limit } => {
            format!("must be greater than {}", limit)
        }
        ValidationErrorKind::Minimum { limit } => format!("must be at least {}", limit),
        ValidationErrorKind::Enum { .. } => "is not an allowed value".to_string(),
        _ => error.to_string(),
    }
}

/// Format enum options as a string, preferring command-line slugs
fn format_enum_options(options: &JsonValue) -> String {
    if let Some(arr) = options.as_array() {
        arr.iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| slug_for_label(s).unwrap_or(s))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        options.to_string()
    }
}

/// Generate a help message with suggestions for fixing the error
fn generate_help_message(error: &JsonSchemaError) -> Option<String> {
    match &error.kind {
        ValidationErrorKind::Enum { options } => {
            Some(format!("Valid values: {}", format_enum_options(options)))
        }
        ValidationErrorKind::Type { .. } | ValidationErrorKind::MaxLength { limit: 0 } => {
            Some("Use digits with an optional decimal point, e.g. 12.5".to_string())
        }
        _ => None,
    }
}
