use serde_json::Value;
use thiserror::Error;

/// Top-level error for a validation invocation.
///
/// Field-level validation failures never appear here: they are collected into an
/// [`ErrorReport`](crate::report::ErrorReport). Everything in this enum is a genuine fault
/// that the caller must see.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Validator fault on field '{path}': {source}")]
    Validator {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Schema engine error: {0}")]
    Schema(#[from] SchemaEngineError),

    #[error("Validator task for field '{path}' failed: {details}")]
    Task { path: String, details: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No tokio runtime to run validators on: {0}")]
    Runtime(String),
}

/// An expected, recoverable failure of one field against one rule.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct FieldFailure {
    pub message: String,
    /// Machine-readable failure kind, e.g. `string.min`
    pub kind: String,
    pub data: Value,
}

impl FieldFailure {
    pub fn new(message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.into(),
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Rejection reasons a custom validator can produce
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// The value is invalid; aggregated into the report
    #[error(transparent)]
    Invalid(#[from] FieldFailure),

    /// Anything else; propagated to the caller unchanged
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl ValidatorError {
    pub fn invalid(message: impl Into<String>, kind: impl Into<String>) -> Self {
        ValidatorError::Invalid(FieldFailure::new(message, kind))
    }

    pub fn is_validation_failure(&self) -> bool {
        matches!(self, ValidatorError::Invalid(_))
    }
}

/// Schema engine failures that are not rule violations
#[derive(Error, Debug)]
pub enum SchemaEngineError {
    #[error("Invalid rule for field '{field}': {reason}")]
    InvalidRule { field: String, reason: String },

    #[error("Schema engine internal error: {0}")]
    Internal(String),
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Result of a single custom validator call
pub type ValidatorResult = std::result::Result<Value, ValidatorError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
