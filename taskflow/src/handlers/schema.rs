//! Declared input and output contracts of a handler.

use crate::core::Outputs;
use crate::errors::UnitError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The JSON type an input must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// A JSON string.
    String,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Bool,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
    /// Anything, including null.
    #[default]
    Any,
}

impl ValueKind {
    /// Returns true if `value` has this kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => true,
        }
    }

    fn of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Bool => write!(f, "bool"),
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// A single declared input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    /// The input name.
    pub name: String,
    /// The expected type.
    #[serde(default)]
    pub kind: ValueKind,
    /// Whether the input must be supplied when there is no default.
    #[serde(default)]
    pub required: bool,
    /// Value used when the input is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human readable description.
    #[serde(default)]
    pub description: String,
}

impl InputSpec {
    /// Creates an optional input of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            description: String::new(),
        }
    }

    /// Marks the input as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// The inputs a handler accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    specs: Vec<InputSpec>,
    #[serde(default)]
    allow_undeclared: bool,
}

impl InputSchema {
    /// Creates an empty schema that accepts no inputs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema that passes undeclared keys through unchecked.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            specs: Vec::new(),
            allow_undeclared: true,
        }
    }

    /// Adds an input. A later spec with the same name replaces the earlier one.
    #[must_use]
    pub fn with(mut self, spec: InputSpec) -> Self {
        if let Some(existing) = self.specs.iter_mut().find(|s| s.name == spec.name) {
            *existing = spec;
        } else {
            self.specs.push(spec);
        }
        self
    }

    /// Gets an input spec by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InputSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Returns the declared specs in declaration order.
    #[must_use]
    pub fn specs(&self) -> &[InputSpec] {
        &self.specs
    }

    /// Returns true if no inputs are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Validates a `with` payload and fills defaults.
    ///
    /// # Errors
    ///
    /// Returns `UnitError::InvalidInput` for an undeclared key, a type
    /// mismatch, or a missing required input.
    pub fn validate(&self, handler: &str, with: &Map<String, Value>) -> Result<Map<String, Value>, UnitError> {
        if !self.allow_undeclared {
            if let Some(key) = with.keys().find(|k| self.get(k).is_none()) {
                return Err(UnitError::invalid_input(
                    handler,
                    format!("unexpected input '{key}'"),
                ));
            }
        }

        let mut resolved = Map::new();
        for spec in &self.specs {
            match with.get(&spec.name).or(spec.default.as_ref()) {
                Some(value) if spec.kind.matches(value) => {
                    resolved.insert(spec.name.clone(), value.clone());
                }
                Some(value) => {
                    return Err(UnitError::invalid_input(
                        handler,
                        format!(
                            "input '{}' must be {}, got {}",
                            spec.name,
                            spec.kind,
                            ValueKind::of(value)
                        ),
                    ));
                }
                None if spec.required => {
                    return Err(UnitError::invalid_input(
                        handler,
                        format!("missing required input '{}'", spec.name),
                    ));
                }
                None => {}
            }
        }

        if self.allow_undeclared {
            for (key, value) in with {
                if !resolved.contains_key(key) {
                    resolved.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(resolved)
    }
}

/// The output names a handler declares.
///
/// An empty schema does not constrain outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    names: Vec<String>,
}

impl OutputSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an output name.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    /// Returns true if `name` is declared.
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Returns the declared names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns output keys that were not declared.
    #[must_use]
    pub fn undeclared(&self, outputs: &Outputs) -> Vec<String> {
        if self.names.is_empty() {
            return Vec::new();
        }
        outputs
            .keys()
            .filter(|k| !self.declares(k))
            .cloned()
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for OutputSchema {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn schema() -> InputSchema {
        InputSchema::new()
            .with(InputSpec::new("image", ValueKind::String).required())
            .with(InputSpec::new("replicas", ValueKind::Number).with_default(1))
            .with(InputSpec::new("labels", ValueKind::Object))
    }

    #[test]
    fn test_fills_defaults_in_declaration_order() {
        let resolved = schema()
            .validate("deploy", &payload(json!({"image": "app:1"})))
            .unwrap();

        assert_eq!(
            resolved.into_iter().collect::<Vec<_>>(),
            vec![
                ("image".to_string(), json!("app:1")),
                ("replicas".to_string(), json!(1)),
            ]
        );
    }

    #[test]
    fn test_rejects_missing_required() {
        let err = schema().validate("deploy", &Map::new()).unwrap_err();
        assert_eq!(
            err,
            UnitError::invalid_input("deploy", "missing required input 'image'")
        );
    }

    #[test]
    fn test_rejects_type_mismatch() {
        let err = schema()
            .validate("deploy", &payload(json!({"image": "a", "replicas": "three"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input for handler 'deploy': input 'replicas' must be number, got string");
    }

    #[test]
    fn test_rejects_undeclared_key() {
        let err = schema()
            .validate("deploy", &payload(json!({"image": "a", "region": "eu"})))
            .unwrap_err();
        assert!(err.to_string().contains("unexpected input 'region'"));
    }

    #[test]
    fn test_permissive_passes_extra_keys() {
        let resolved = InputSchema::permissive()
            .with(InputSpec::new("a", ValueKind::Any).with_default(json!(null)))
            .validate("h", &payload(json!({"b": true})))
            .unwrap();

        assert_eq!(resolved.get("a"), Some(&Value::Null));
        assert_eq!(resolved.get("b"), Some(&json!(true)));
    }

    #[test]
    fn test_output_schema_undeclared() {
        let schema: OutputSchema = ["url", "version"].into_iter().collect();
        let outputs = Outputs::new().with("url", "https://x").with("debug", true);

        assert_eq!(schema.undeclared(&outputs), vec!["debug"]);
        assert!(OutputSchema::new().undeclared(&outputs).is_empty());
    }
}
