use serde::Serialize;
use serde_json::Value;

use super::error::DomainError;

/// Field inspected by the default filter
pub const DEFAULT_RESULT_FIELD: &str = "FaceSearchResponse";

/// Decoded record body whose result field is known to be non-empty
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Outcome of running a record through the filter
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Result field present and non-empty
    Forward(Payload),
    /// Result field present but empty; the record is dropped
    Empty,
}

/// Decodes record bodies and drops those with an empty result field
#[derive(Debug, Clone)]
pub struct PayloadFilter {
    result_field: String,
}

impl PayloadFilter {
    pub fn new(result_field: impl Into<String>) -> Self {
        Self {
            result_field: result_field.into(),
        }
    }

    pub fn result_field(&self) -> &str {
        &self.result_field
    }

    /// Decode `data` as a JSON object and check its result field
    ///
    /// Arrays, objects and strings are empty when they have no elements.
    /// `null`, numbers and booleans have no length and are reported as a
    /// shape error.
    pub fn classify(&self, data: &[u8]) -> Result<Classification, DomainError> {
        let value: Value =
            serde_json::from_slice(data).map_err(|e| DomainError::InvalidJson(e.to_string()))?;
        self.classify_value(value)
    }

    /// Same check as [`classify`](Self::classify) on an already decoded value
    pub fn classify_value(&self, value: Value) -> Result<Classification, DomainError> {
        let Value::Object(fields) = &value else {
            return Err(DomainError::NotAnObject);
        };

        let result = fields
            .get(&self.result_field)
            .ok_or_else(|| DomainError::MissingResultField(self.result_field.clone()))?;

        let empty = match result {
            Value::Array(items) => items.is_empty(),
            Value::Object(entries) => entries.is_empty(),
            Value::String(text) => text.is_empty(),
            Value::Null | Value::Bool(_) | Value::Number(_) => {
                return Err(DomainError::ResultFieldNotCollection(
                    self.result_field.clone(),
                ));
            }
        };

        if empty {
            Ok(Classification::Empty)
        } else {
            Ok(Classification::Forward(Payload(value)))
        }
    }
}

impl Default for PayloadFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_FIELD)
    }
}
