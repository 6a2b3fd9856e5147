//! Custom asynchronous field validators and their per-field invocation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::{ComposeError, Result, ValidatorError, ValidatorResult};
use crate::options::ValidationOptions;
use crate::report::{ErrorDetail, ErrorReport};

/// An asynchronous check on one field value.
///
/// Resolves to the value to store back into the record (return the input unchanged if the
/// validator does not normalize), [`ValidatorError::Invalid`] when the value fails, or
/// [`ValidatorError::Fault`] for anything that is not a validation failure.
pub trait CustomValidator: Send + Sync {
    fn call(&self, value: Value, options: Arc<ValidationOptions>) -> BoxFuture<'static, ValidatorResult>;
}

/// Shared, type-erased validator
pub type SharedValidator = Arc<dyn CustomValidator>;

impl CustomValidator for Arc<dyn CustomValidator> {
    fn call(&self, value: Value, options: Arc<ValidationOptions>) -> BoxFuture<'static, ValidatorResult> {
        self.as_ref().call(value, options)
    }
}

/// Validator backed by an async closure, see [`from_fn`]
pub struct FnValidator<F>(F);

impl<F, Fut> CustomValidator for FnValidator<F>
where
    F: Fn(Value, Arc<ValidationOptions>) -> Fut + Send + Sync,
    Fut: Future<Output = ValidatorResult> + Send + 'static,
{
    fn call(&self, value: Value, options: Arc<ValidationOptions>) -> BoxFuture<'static, ValidatorResult> {
        Box::pin((self.0)(value, options))
    }
}

/// Build a validator from an async closure.
///
/// ```
/// use async_validation::{ValidatorError, from_fn};
/// use serde_json::Value;
///
/// let not_reserved = from_fn(|value: Value, _options| async move {
///     if value.as_str() == Some("admin") {
///         Err(ValidatorError::invalid("\"name\" is reserved", "name.reserved"))
///     } else {
///         Ok(value)
///     }
/// });
/// # let _ = not_reserved;
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnValidator<F>
where
    F: Fn(Value, Arc<ValidationOptions>) -> Fut + Send + Sync,
    Fut: Future<Output = ValidatorResult> + Send + 'static,
{
    FnValidator(f)
}

/// Validator that turns an overrun into a fault, see [`with_timeout`]
pub struct Timeout<V> {
    inner: V,
    duration: Duration,
}

impl<V: CustomValidator> CustomValidator for Timeout<V> {
    fn call(&self, value: Value, options: Arc<ValidationOptions>) -> BoxFuture<'static, ValidatorResult> {
        let fut = self.inner.call(value, options);
        let duration = self.duration;
        Box::pin(async move {
            match tokio::time::timeout(duration, fut).await {
                Ok(result) => result,
                Err(_) => Err(ValidatorError::Fault(anyhow::anyhow!(
                    "validator timed out after {:?}",
                    duration
                ))),
            }
        })
    }
}

/// Bound a validator's running time.
///
/// The composer applies no timeout of its own; a validator that never settles stalls the
/// invocation unless wrapped here.
pub fn with_timeout<V: CustomValidator>(validator: V, duration: Duration) -> Timeout<V> {
    Timeout {
        inner: validator,
        duration,
    }
}

/// Field name to an ordered chain of validators, in declaration order
#[derive(Clone, Default)]
pub struct CustomValidators {
    fields: Vec<(String, Vec<SharedValidator>)>,
}

impl CustomValidators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `validator` to the chain for `field`
    pub fn field(mut self, field: impl Into<String>, validator: impl CustomValidator + 'static) -> Self {
        self.push(field, Arc::new(validator));
        self
    }

    /// Append several validators to the chain for `field`, keeping their order
    pub fn chain(mut self, field: impl Into<String>, validators: Vec<SharedValidator>) -> Self {
        let field = field.into();
        for validator in validators {
            self.push(field.clone(), validator);
        }
        self
    }

    pub fn push(&mut self, field: impl Into<String>, validator: SharedValidator) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, chain)) => chain.push(validator),
            None => self.fields.push((field, vec![validator])),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[SharedValidator]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, chain)| chain.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &[SharedValidator])> {
        self.fields.iter().map(|(name, chain)| (name, chain.as_slice()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of fields with at least one validator
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Debug for CustomValidators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.fields.iter().map(|(name, chain)| (name, chain.len())))
            .finish()
    }
}

/// How one validator call settled
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Transformed(Value),
    Failed(ErrorDetail),
}

/// Call one validator for `path`.
///
/// Validation failures come back as [`Invocation::Failed`]; faults are returned as errors so
/// the caller can stop the whole run.
pub async fn invoke(
    validator: &dyn CustomValidator,
    value: Value,
    path: &str,
    options: Arc<ValidationOptions>,
) -> Result<Invocation> {
    match validator.call(value, options).await {
        Ok(transformed) => Ok(Invocation::Transformed(transformed)),
        Err(ValidatorError::Invalid(failure)) => {
            trace!(path, kind = %failure.kind, "validator rejected value");
            Ok(Invocation::Failed(ErrorDetail::from_failure(path, failure)))
        }
        Err(ValidatorError::Fault(source)) => {
            warn!(path, error = %source, "validator fault");
            Err(ComposeError::Validator {
                path: path.to_string(),
                source,
            })
        }
    }
}

/// Final state of one field after its chain has run
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldReport {
    pub path: String,
    pub value: Value,
    pub errors: ErrorReport,
}

/// Run a field's validators in order, each seeing the value left by the previous one.
///
/// A failed validator leaves the value untouched and the chain continues, unless
/// `abort_early` is set, in which case the chain stops at the first failure.
pub(crate) async fn run_field(
    path: String,
    value: Value,
    validators: Vec<SharedValidator>,
    options: Arc<ValidationOptions>,
) -> Result<FieldReport> {
    let mut current = value;
    let mut errors = ErrorReport::new();

    for (position, validator) in validators.iter().enumerate() {
        trace!(path = %path, position, "invoking validator");
        match invoke(validator.as_ref(), current.clone(), &path, Arc::clone(&options)).await? {
            Invocation::Transformed(next) => current = next,
            Invocation::Failed(detail) => {
                errors.push(detail);
                if options.abort_early {
                    break;
                }
            }
        }
    }

    Ok(FieldReport {
        path,
        value: current,
        errors,
    })
}
