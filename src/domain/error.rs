use thiserror::Error;

/// Domain-level errors raised while decoding and wrapping record payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Record is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Record payload is not a JSON object")]
    NotAnObject,

    #[error("Missing result field: {0}")]
    MissingResultField(String),

    #[error("Result field {0} is not a collection")]
    ResultFieldNotCollection(String),

    #[error("Event encoding failed: {0}")]
    Encode(String),
}
