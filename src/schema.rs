//! The seam between the composer and a declarative schema engine.

use crate::error::SchemaEngineError;
use crate::options::ValidationOptions;
use crate::report::ErrorReport;
use crate::values::Values;

/// Field rules assembled into one object schema, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema<R> {
    keys: Vec<(String, R)>,
}

impl<R> ObjectSchema<R> {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Add or replace the rule for `field`
    pub fn key(mut self, field: impl Into<String>, rule: R) -> Self {
        self.insert(field, rule);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, rule: R) {
        let field = field.into();
        match self.keys.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = rule,
            None => self.keys.push((field, rule)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&R> {
        self.keys.iter().find(|(name, _)| name == field).map(|(_, rule)| rule)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.keys.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<R> Default for ObjectSchema<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, R> FromIterator<(K, R)> for ObjectSchema<R> {
    fn from_iter<I: IntoIterator<Item = (K, R)>>(iter: I) -> Self {
        let mut schema = Self::new();
        for (field, rule) in iter {
            schema.insert(field, rule);
        }
        schema
    }
}

/// What a schema engine hands back for one run
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaOutcome {
    /// Validated and possibly coerced values
    pub values: Values,
    /// `None` when every rule passed
    pub errors: Option<ErrorReport>,
}

impl SchemaOutcome {
    pub fn valid(values: Values) -> Self {
        Self {
            values,
            errors: None,
        }
    }

    pub fn invalid(values: Values, errors: ErrorReport) -> Self {
        Self {
            values,
            errors: Some(errors),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// A declarative validation engine.
///
/// Implementations must honor `options.abort_early` and may read `options.context`, which
/// carries the invocation's values under `values`.
#[cfg_attr(test, mockall::automock(type Rule = String;))]
pub trait SchemaEngine: Send + Sync {
    type Rule: Send + Sync;

    fn validate(
        &self,
        values: &Values,
        schema: &ObjectSchema<Self::Rule>,
        options: &ValidationOptions,
    ) -> Result<SchemaOutcome, SchemaEngineError>;
}
