//! Bundled declarative engine.
//!
//! A deliberately small rule set: presence, primitive types, bounds, a pattern, and a
//! couple of string normalizations. Richer engines plug in through
//! [`SchemaEngine`](crate::schema::SchemaEngine).

use regex::Regex;
use serde::Serialize;
use serde_json::{Number, Value, json};

use crate::error::SchemaEngineError;
use crate::options::ValidationOptions;
use crate::report::{ErrorDetail, ErrorReport};
use crate::schema::{ObjectSchema, SchemaEngine, SchemaOutcome};
use crate::values::Values;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Any,
    String,
    Number,
    Boolean,
}

/// Constraint for a single field.
///
/// `min` and `max` bound the character count for strings and the value for numbers.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    #[serde(rename = "type")]
    kind: RuleKind,
    #[serde(skip_serializing_if = "is_false")]
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(skip_serializing_if = "is_false")]
    integer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(skip)]
    compiled: Option<Regex>,
    #[serde(skip_serializing_if = "is_false")]
    trim: bool,
    #[serde(skip_serializing_if = "is_false")]
    lowercase: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Rule {
    fn of(kind: RuleKind) -> Self {
        Self {
            kind,
            required: false,
            min: None,
            max: None,
            integer: false,
            pattern: None,
            compiled: None,
            trim: false,
            lowercase: false,
        }
    }

    pub fn any() -> Self {
        Self::of(RuleKind::Any)
    }

    pub fn string() -> Self {
        Self::of(RuleKind::String)
    }

    pub fn number() -> Self {
        Self::of(RuleKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(RuleKind::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn min(mut self, limit: impl Into<f64>) -> Self {
        self.min = Some(limit.into());
        self
    }

    pub fn max(mut self, limit: impl Into<f64>) -> Self {
        self.max = Some(limit.into());
        self
    }

    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    /// An uncompilable pattern is reported when the rule is first used
    pub fn pattern(mut self, pattern: &str) -> Self {
        self.compiled = Regex::new(pattern).ok();
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn describe(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Check one present value, returning the (possibly coerced) value
    fn check(&self, field: &str, value: &Value, convert: bool) -> Result<Value, ErrorDetail> {
        match self.kind {
            RuleKind::Any => Ok(value.clone()),
            RuleKind::String => self.check_string(field, value, convert),
            RuleKind::Number => self.check_number(field, value, convert),
            RuleKind::Boolean => check_boolean(field, value, convert),
        }
    }

    fn check_string(&self, field: &str, value: &Value, convert: bool) -> Result<Value, ErrorDetail> {
        let Some(raw) = value.as_str() else {
            return Err(detail(field, "must be a string", "string.base", value));
        };

        let mut s = if convert && self.trim {
            raw.trim().to_string()
        } else {
            raw.to_string()
        };

        if s.is_empty() {
            return Err(detail(field, "is not allowed to be empty", "string.empty", value));
        }

        if self.lowercase {
            if convert {
                s = s.to_lowercase();
            } else if s.chars().any(char::is_uppercase) {
                return Err(detail(
                    field,
                    "must only contain lowercase characters",
                    "string.lowercase",
                    value,
                ));
            }
        }

        let length = s.chars().count() as f64;
        if let Some(min) = self.min.filter(|min| length < *min) {
            return Err(detail(
                field,
                &format!("length must be at least {} characters long", min),
                "string.min",
                value,
            )
            .with_limit(min));
        }
        if let Some(max) = self.max.filter(|max| length > *max) {
            return Err(detail(
                field,
                &format!("length must be less than or equal to {} characters long", max),
                "string.max",
                value,
            )
            .with_limit(max));
        }

        if let Some(pattern) = &self.pattern {
            let matched = self.compiled.as_ref().is_some_and(|re| re.is_match(&s));
            if !matched {
                return Err(detail(
                    field,
                    &format!("with value \"{}\" fails to match the required pattern: {}", s, pattern),
                    "string.pattern.base",
                    value,
                ));
            }
        }

        Ok(Value::String(s))
    }

    fn check_number(&self, field: &str, value: &Value, convert: bool) -> Result<Value, ErrorDetail> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if convert => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        };
        let Some(n) = n else {
            return Err(detail(field, "must be a number", "number.base", value));
        };

        if self.integer && n.fract() != 0.0 {
            return Err(detail(field, "must be an integer", "number.integer", value));
        }
        if let Some(min) = self.min.filter(|min| n < *min) {
            return Err(detail(
                field,
                &format!("must be greater than or equal to {}", min),
                "number.min",
                value,
            )
            .with_limit(min));
        }
        if let Some(max) = self.max.filter(|max| n > *max) {
            return Err(detail(
                field,
                &format!("must be less than or equal to {}", max),
                "number.max",
                value,
            )
            .with_limit(max));
        }

        match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Ok(to_number(n)),
        }
    }
}

fn check_boolean(field: &str, value: &Value, convert: bool) -> Result<Value, ErrorDetail> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if convert && s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Value::String(s) if convert && s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        _ => Err(detail(field, "must be a boolean", "boolean.base", value)),
    }
}

fn to_number(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn detail(field: &str, text: &str, kind: &str, value: &Value) -> ErrorDetail {
    ErrorDetail::new(field, format!("\"{}\" {}", field, text), kind).with_data(json!({
        "key": field,
        "label": field,
        "value": value,
    }))
}

trait WithLimit {
    fn with_limit(self, limit: f64) -> Self;
}

impl WithLimit for ErrorDetail {
    fn with_limit(mut self, limit: f64) -> Self {
        if let Value::Object(map) = &mut self.data {
            map.insert("limit".to_string(), to_number(limit));
        }
        self
    }
}

/// The engine that interprets [`Rule`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarativeEngine;

impl DeclarativeEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaEngine for DeclarativeEngine {
    type Rule = Rule;

    fn validate(
        &self,
        values: &Values,
        schema: &ObjectSchema<Rule>,
        options: &ValidationOptions,
    ) -> Result<SchemaOutcome, SchemaEngineError> {
        let mut output = values.clone();
        let mut errors = ErrorReport::new();

        for (field, rule) in schema.iter() {
            if rule.pattern.is_some() && rule.compiled.is_none() {
                return Err(SchemaEngineError::InvalidRule {
                    field: field.to_string(),
                    reason: format!("pattern {:?} does not compile", rule.pattern),
                });
            }

            let result = match values.get(field) {
                None | Some(Value::Null) if rule.required => Err(detail(
                    field,
                    "is required",
                    "any.required",
                    &Value::Null,
                )),
                None | Some(Value::Null) => continue,
                Some(value) => rule.check(field, value, options.convert),
            };

            match result {
                Ok(coerced) => output.set(field, coerced),
                Err(detail) => {
                    errors.push(detail);
                    if options.abort_early {
                        return Ok(SchemaOutcome::invalid(output, errors));
                    }
                }
            }
        }

        if !options.allow_unknown {
            for (field, value) in values.iter() {
                if schema.contains(field) {
                    continue;
                }
                errors.push(detail(field, "is not allowed", "object.unknown", value));
                if options.abort_early {
                    break;
                }
            }
        }

        if errors.is_empty() {
            Ok(SchemaOutcome::valid(output))
        } else {
            Ok(SchemaOutcome::invalid(output, errors))
        }
    }
}
