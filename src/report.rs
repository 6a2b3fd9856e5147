//! Aggregated validation failures for one invocation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldFailure;

/// One failing field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub path: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ErrorDetail {
    pub fn new(path: impl Into<String>, message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind: kind.into(),
            data: Value::Null,
        }
    }

    pub fn from_failure(path: impl Into<String>, failure: FieldFailure) -> Self {
        Self {
            path: path.into(),
            message: failure.message,
            kind: failure.kind,
            data: failure.data,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Ordered list of failure details, created fresh for every invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub details: Vec<ErrorDetail>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, detail: ErrorDetail) {
        self.details.push(detail);
    }

    /// Append every detail of `other`, keeping its order
    pub fn extend(&mut self, other: ErrorReport) {
        self.details.extend(other.details);
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn len(&self) -> usize {
        self.details.len()
    }

    /// Details recorded for a single field
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a ErrorDetail> + 'a {
        self.details.iter().filter(move |d| d.path == path)
    }

    /// Distinct failing paths in first-seen order
    pub fn paths(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for detail in &self.details {
            if !seen.contains(&detail.path.as_str()) {
                seen.push(detail.path.as_str());
            }
        }
        seen
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details.len() {
            0 => write!(f, "no validation errors"),
            1 => write!(f, "{}", self.details[0].message),
            n => {
                write!(f, "{} validation errors: ", n)?;
                for (i, detail) in self.details.iter().enumerate() {
                    if i > 0 {
                        write!(f, ". ")?;
                    }
                    write!(f, "{}", detail.message)?;
                }
                Ok(())
            }
        }
    }
}

impl From<Vec<ErrorDetail>> for ErrorReport {
    fn from(details: Vec<ErrorDetail>) -> Self {
        Self { details }
    }
}
