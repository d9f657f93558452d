//! # Schema Descriptors
//!
//! Declarative description of the JSON a stage expects back. The schema is
//! embedded into the prompt for the backend and checked again after
//! extraction.

use schemars::JsonSchema;
use serde_json::Value;

/// Top-level JSON type a response must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    pub fn open(self) -> char {
        match self {
            JsonShape::Object => '{',
            JsonShape::Array => '[',
        }
    }

    pub fn close(self) -> char {
        match self {
            JsonShape::Object => '}',
            JsonShape::Array => ']',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonShape::Object => "object",
            JsonShape::Array => "array",
        }
    }

    /// Whether a parsed value has this shape.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            JsonShape::Object => value.is_object(),
            JsonShape::Array => value.is_array(),
        }
    }
}

/// A named JSON Schema for one structured generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    name: String,
    schema: Value,
}

impl SchemaDescriptor {
    /// Wrap a raw JSON Schema value.
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Derive the schema from a Rust output type.
    pub fn of<T: JsonSchema>(name: impl Into<String>) -> Self {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(&schema).unwrap_or(Value::Bool(true));
        Self::new(name, value)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Expected top-level shape. Anything that is not declared as an array
    /// is treated as an object.
    pub fn expected_shape(&self) -> JsonShape {
        match self.schema.get("type").and_then(Value::as_str) {
            Some("array") => JsonShape::Array,
            _ => JsonShape::Object,
        }
    }

    /// Top-level keys that must be present on an object response.
    pub fn required_keys(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Instruction block placed ahead of the user prompt.
    pub fn render_instructions(&self) -> String {
        let pretty =
            serde_json::to_string_pretty(&self.schema).unwrap_or_else(|_| self.schema.to_string());
        format!(
            "Respond with a single JSON {} that matches this schema. Do not add commentary.\n{}",
            self.expected_shape().as_str(),
            pretty
        )
    }
}
