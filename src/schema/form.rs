//! Form input collected from the command line
//!
//! Values are kept as JSON so the schema sees exactly what the user typed:
//! an empty string stays `""` (the "leave unchanged" sentinel in edit forms)
//! and a number that doesn't parse stays a string, which the schema then
//! reports as a type error.

use serde_json::{Map, Number, Value};

/// Raw values of one form, by member name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInput {
    values: Map<String, Value>,
}

impl FormInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a free-text value
    pub fn text(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(v) = value {
            self.values
                .insert(name.to_string(), Value::String(v.to_string()));
        }
        self
    }

    /// Add a numeric value
    pub fn number(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(v) = value {
            self.values.insert(name.to_string(), parse_number(v));
        }
        self
    }

    /// Add an enumerated value, translating a known slug to its wire label
    pub fn choice(
        mut self,
        name: &str,
        value: Option<&str>,
        to_wire: fn(&str) -> Option<&'static str>,
    ) -> Self {
        if let Some(v) = value {
            let wire = if v.is_empty() {
                String::new()
            } else {
                to_wire(v).map(String::from).unwrap_or_else(|| v.to_string())
            };
            self.values.insert(name.to_string(), Value::String(wire));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The form as a JSON object, exactly as entered
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Only the members that carry a value (drops `""` and null)
    pub fn changed(&self) -> Value {
        let changed = self
            .values
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Null) && v.as_str() != Some(""))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(changed)
    }
}

/// Parse user text into a JSON number; keep it as text when it isn't one
fn parse_number(input: &str) -> Value {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Value::String(String::new());
    }
    if let Ok(n) = trimmed.parse::<u64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::Number(n.into());
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(input.to_string()))
}
