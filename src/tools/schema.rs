//! Statically declared tool parameters: typed fields with defaults and
//! validators, checked and coerced before a tool runs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// JSON type of a parameter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

/// Constraint checked after a field has been coerced to its kind.
#[derive(Debug, Clone)]
pub enum Validator {
    /// String must contain a non-whitespace character.
    NonBlank,
    /// String must be one of the listed values.
    OneOf(Vec<String>),
    /// String must match the pattern.
    Pattern(Regex),
    /// Numeric value must lie within the bounds (inclusive).
    Range { min: Option<f64>, max: Option<f64> },
    /// String length in characters must not exceed the limit.
    MaxLength(usize),
}

impl Validator {
    pub fn one_of(values: &[&str]) -> Self {
        Self::OneOf(values.iter().map(|v| v.to_string()).collect())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    fn check(&self, field: &str, value: &Value) -> Result<(), String> {
        match self {
            Self::NonBlank => match value.as_str() {
                Some(s) if s.trim().is_empty() => Err(format!("field '{field}' cannot be empty")),
                _ => Ok(()),
            },
            Self::OneOf(allowed) => match value.as_str() {
                Some(s) if !allowed.iter().any(|a| a == s) => Err(format!(
                    "field '{field}' must be one of [{}], got '{s}'",
                    allowed.join(", ")
                )),
                _ => Ok(()),
            },
            Self::Pattern(regex) => match value.as_str() {
                Some(s) if !regex.is_match(s) => Err(format!(
                    "field '{field}' does not match pattern '{}'",
                    regex.as_str()
                )),
                _ => Ok(()),
            },
            Self::Range { min, max } => {
                let Some(n) = value.as_f64() else {
                    return Ok(());
                };
                if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                    return Err(format!(
                        "field '{field}' must be within [{}, {}], got {n}",
                        min.map(|v| v.to_string()).unwrap_or_else(|| "-inf".into()),
                        max.map(|v| v.to_string()).unwrap_or_else(|| "inf".into()),
                    ));
                }
                Ok(())
            }
            Self::MaxLength(limit) => match value.as_str() {
                Some(s) if s.chars().count() > *limit => Err(format!(
                    "field '{field}' exceeds {limit} characters"
                )),
                _ => Ok(()),
            },
        }
    }

    fn annotate(&self, property: &mut Map<String, Value>) {
        match self {
            Self::OneOf(allowed) => {
                property.insert("enum".into(), serde_json::json!(allowed));
            }
            Self::Pattern(regex) => {
                property.insert("pattern".into(), regex.as_str().into());
            }
            Self::Range { min, max } => {
                if let Some(min) = min {
                    property.insert("minimum".into(), (*min).into());
                }
                if let Some(max) = max {
                    property.insert("maximum".into(), (*max).into());
                }
            }
            Self::MaxLength(limit) => {
                property.insert("maxLength".into(), (*limit).into());
            }
            Self::NonBlank => {
                property.insert("minLength".into(), 1.into());
            }
        }
    }
}

/// One named parameter.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub validators: Vec<Validator>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: false,
            default: None,
            validators: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean, description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        coerce_value(self.kind, value).ok_or_else(|| {
            format!(
                "field '{}' expected type '{}', got {}",
                self.name,
                self.kind,
                json_type_name(value)
            )
        })
    }
}

/// Declared parameters of a tool.
#[derive(Debug, Clone, Default)]
pub struct ParameterSchema {
    fields: Vec<FieldSpec>,
}

impl ParameterSchema {
    /// A schema with no parameters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder: create an object schema with fields.
    pub fn object() -> SchemaBuilder {
        SchemaBuilder { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check raw arguments and return them coerced, with defaults filled in.
    ///
    /// Fields not declared in the schema pass through untouched. The output is
    /// a fixed point: validating it again yields the same value.
    pub fn validate(&self, raw: &Value) -> Result<Value, String> {
        let parsed;
        let raw = match raw {
            Value::Null => return self.validate(&Value::Object(Map::new())),
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return self.validate(&Value::Object(Map::new()));
                }
                parsed = serde_json::from_str::<Value>(trimmed)
                    .map_err(|e| format!("arguments are not valid JSON: {e}"))?;
                &parsed
            }
            other => other,
        };

        let Some(input) = raw.as_object() else {
            return Err(format!(
                "expected object arguments, got {}",
                json_type_name(raw)
            ));
        };

        let mut output = input.clone();
        for field in &self.fields {
            let supplied = input.get(&field.name).filter(|v| !v.is_null());
            let value = match (supplied, &field.default) {
                (Some(value), _) => field.coerce(value)?,
                (None, Some(default)) => default.clone(),
                (None, None) if field.required => {
                    return Err(format!("missing required field '{}'", field.name));
                }
                (None, None) => {
                    output.remove(&field.name);
                    continue;
                }
            };
            for validator in &field.validators {
                validator.check(&field.name, &value)?;
            }
            output.insert(field.name.clone(), value);
        }

        Ok(Value::Object(output))
    }

    /// Render as a JSON Schema object for model tool definitions.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut property = Map::new();
            property.insert("type".into(), field.kind.to_string().into());
            property.insert("description".into(), field.description.clone().into());
            if let Some(default) = &field.default {
                property.insert("default".into(), default.clone());
            }
            for validator in &field.validators {
                validator.annotate(&mut property);
            }
            properties.insert(field.name.clone(), Value::Object(property));
            if field.required && field.default.is_none() {
                required.push(field.name.clone());
            }
        }
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Builder for constructing tool parameter schemas.
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    /// Add a fully specified field.
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a string field.
    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        let field = FieldSpec::string(name, description);
        self.field(if required { field.required() } else { field })
    }

    /// Add an optional string field with a default.
    pub fn string_or(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: &str,
    ) -> Self {
        self.field(FieldSpec::string(name, description).default_value(default))
    }

    pub fn build(self) -> ParameterSchema {
        ParameterSchema {
            fields: self.fields,
        }
    }
}

fn coerce_value(kind: FieldKind, value: &Value) -> Option<Value> {
    match kind {
        FieldKind::String => value.is_string().then(|| value.clone()),
        FieldKind::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        FieldKind::Number => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            _ => None,
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            _ => None,
        },
        FieldKind::Object => value.is_object().then(|| value.clone()),
        FieldKind::Array => value.is_array().then(|| value.clone()),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
