//! Schema validation merged with concurrent custom validators.
//!
//! A [`ValidationFunction`] runs in two phases:
//! - **Schema phase**: the engine checks every declared rule synchronously
//! - **Custom phase**: each provided field's validator chain runs as its own tokio task,
//!   and the results are folded into the values and a single [`ErrorReport`]
//!
//! Schema errors seed the report, so callers see schema and custom failures together.
//! With `abort_early` the first failure wins: schema errors return before any custom
//! validator starts, and the first failing chain ends the join. Tasks still running at that
//! point are detached, not cancelled; their results are dropped.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::error::{ComposeError, Result};
use crate::options::ValidationOptions;
use crate::report::ErrorReport;
use crate::rules::{DeclarativeEngine, Rule};
use crate::schema::{ObjectSchema, SchemaEngine};
use crate::validator::{CustomValidators, FieldReport, run_field};
use crate::values::{Values, is_truthy};

/// What a validation run resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// Every rule and validator passed; carries the normalized values
    Valid(Values),
    /// At least one failure; `values` holds whatever normalization had been applied
    Invalid { errors: ErrorReport, values: Values },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    pub fn errors(&self) -> Option<&ErrorReport> {
        match self {
            ValidationOutcome::Valid(_) => None,
            ValidationOutcome::Invalid { errors, .. } => Some(errors),
        }
    }

    pub fn values(&self) -> &Values {
        match self {
            ValidationOutcome::Valid(values) => values,
            ValidationOutcome::Invalid { values, .. } => values,
        }
    }

    pub fn into_result(self) -> std::result::Result<Values, ErrorReport> {
        match self {
            ValidationOutcome::Valid(values) => Ok(values),
            ValidationOutcome::Invalid { errors, .. } => Err(errors),
        }
    }
}

/// Compose the bundled [`DeclarativeEngine`] with custom validators
pub fn compose<K, I>(schema_rules: I, custom_validators: CustomValidators) -> ValidationFunction
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Rule)>,
{
    compose_with(DeclarativeEngine, schema_rules, custom_validators)
}

/// Compose any [`SchemaEngine`] with custom validators
pub fn compose_with<E, K, I>(
    engine: E,
    schema_rules: I,
    custom_validators: CustomValidators,
) -> ValidationFunction<E>
where
    E: SchemaEngine,
    K: Into<String>,
    I: IntoIterator<Item = (K, E::Rule)>,
{
    ValidationFunction {
        engine: Arc::new(engine),
        schema: Arc::new(schema_rules.into_iter().collect()),
        validators: Arc::new(custom_validators),
    }
}

/// The composed validator.
///
/// Cheap to clone; clones share the read-only rules and validators, and concurrent
/// invocations share no mutable state.
pub struct ValidationFunction<E: SchemaEngine = DeclarativeEngine> {
    engine: Arc<E>,
    schema: Arc<ObjectSchema<E::Rule>>,
    validators: Arc<CustomValidators>,
}

impl<E: SchemaEngine> Clone for ValidationFunction<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            schema: Arc::clone(&self.schema),
            validators: Arc::clone(&self.validators),
        }
    }
}

impl<E: SchemaEngine> ValidationFunction<E> {
    /// The rules this function was composed from
    pub fn schema_rules(&self) -> &ObjectSchema<E::Rule> {
        &self.schema
    }

    pub fn custom_validators(&self) -> &CustomValidators {
        &self.validators
    }

    /// Validate `values`.
    ///
    /// Validator chains are spawned as tasks, so any custom validator that has a value to
    /// check needs a tokio runtime; without one the call fails with
    /// [`ComposeError::Runtime`]. Field failures come back as
    /// [`ValidationOutcome::Invalid`]; `Err` is reserved for faults.
    pub async fn validate(&self, values: Values, options: &ValidationOptions) -> Result<ValidationOutcome> {
        let mut options = options.clone();
        options.set_context_values(&values);

        debug!(
            fields = values.len(),
            rules = self.schema.len(),
            validated_fields = self.validators.len(),
            abort_early = options.abort_early,
            "starting validation"
        );

        let schema_outcome = self.engine.validate(&values, &self.schema, &options)?;

        // Custom validators always see the caller's values. Engine coercions only seed the
        // resolved record, and a field's chain output takes precedence over them.
        let mut errors = ErrorReport::new();
        let resolved = if schema_outcome.has_errors() {
            let schema_errors = schema_outcome.errors.unwrap_or_default();
            debug!(errors = schema_errors.len(), "schema validation failed");
            if options.abort_early {
                return Ok(ValidationOutcome::Invalid {
                    errors: schema_errors,
                    values,
                });
            }
            errors = schema_errors;
            values.clone()
        } else {
            schema_outcome.values
        };

        let options = Arc::new(options);
        let mut pending = FuturesUnordered::new();

        for (index, (path, chain)) in self.validators.iter().enumerate() {
            let Some(value) = values.get(path).filter(|v| is_truthy(v)).cloned() else {
                trace!(path = %path, "skipping field without a value");
                continue;
            };

            let runtime = Handle::try_current().map_err(|e| ComposeError::Runtime(e.to_string()))?;
            let path = path.clone();
            let handle = runtime.spawn(run_field(
                path.clone(),
                value,
                chain.to_vec(),
                Arc::clone(&options),
            ));
            pending.push(async move { (index, path, handle.await) });
        }

        let mut settled: Vec<(usize, FieldReport)> = Vec::with_capacity(pending.len());

        while let Some((index, path, joined)) = pending.next().await {
            let report = match joined {
                Ok(Ok(report)) => report,
                Ok(Err(fault)) => return Err(fault),
                Err(join_error) => {
                    warn!(path = %path, error = %join_error, "validator task failed");
                    return Err(ComposeError::Task {
                        path,
                        details: join_error.to_string(),
                    });
                }
            };

            if options.abort_early && !report.errors.is_empty() {
                debug!(path = %report.path, remaining = pending.len(), "aborting early");
                settled.push((index, report));
                return Ok(Self::fold(settled, resolved, errors));
            }

            settled.push((index, report));
        }

        let outcome = Self::fold(settled, resolved, errors);
        debug!(valid = outcome.is_valid(), "validation finished");
        Ok(outcome)
    }

    /// Merge settled chains back in declaration order
    fn fold(
        mut settled: Vec<(usize, FieldReport)>,
        mut values: Values,
        mut errors: ErrorReport,
    ) -> ValidationOutcome {
        settled.sort_by_key(|(index, _)| *index);

        for (_, report) in settled {
            values.set(report.path, report.value);
            errors.extend(report.errors);
        }

        if errors.is_empty() {
            ValidationOutcome::Valid(values)
        } else {
            ValidationOutcome::Invalid { errors, values }
        }
    }
}

impl<E> ValidationFunction<E>
where
    E: SchemaEngine,
    E::Rule: Serialize,
{
    /// JSON description of the declared rules, keyed by field
    pub fn describe(&self) -> serde_json::Result<Value> {
        let mut fields = Map::new();
        for (field, rule) in self.schema.iter() {
            fields.insert(field.to_string(), serde_json::to_value(rule)?);
        }
        Ok(Value::Object(fields))
    }
}
