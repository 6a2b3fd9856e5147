//! # async-validation
//!
//! Merge declarative schema validation with asynchronous, per-field custom validators into
//! a single validation function that resolves to the normalized values or one report
//! listing every failing field.
//!
//! ```no_run
//! use async_validation::{CustomValidators, Rule, ValidationOptions, ValidatorError, Values, compose, from_fn};
//! use serde_json::{Value, json};
//!
//! # async fn run() -> async_validation::Result<()> {
//! let validate = compose(
//!     [("name", Rule::string().required())],
//!     CustomValidators::new().field(
//!         "name",
//!         from_fn(|value: Value, _options| async move {
//!             if value.as_str() == Some("admin") {
//!                 Err(ValidatorError::invalid("\"name\" is reserved", "name.reserved"))
//!             } else {
//!                 Ok(value)
//!             }
//!         }),
//!     ),
//! );
//!
//! let values = Values::try_from(json!({"name": "ada"})).expect("object");
//! let outcome = validate.validate(values, &ValidationOptions::default()).await?;
//! assert!(outcome.is_valid());
//! # Ok(())
//! # }
//! ```

pub mod composer;
pub mod error;
pub mod options;
pub mod report;
pub mod rules;
pub mod schema;
pub mod validator;
pub mod values;

pub use composer::{ValidationFunction, ValidationOutcome, compose, compose_with};
pub use error::{
    ComposeError, ConfigError, FieldFailure, Result, SchemaEngineError, ValidatorError,
    ValidatorResult,
};
pub use options::{EnvProvider, OptionsLoader, SystemEnvProvider, ValidationOptions};
pub use report::{ErrorDetail, ErrorReport};
pub use rules::{DeclarativeEngine, Rule, RuleKind};
pub use schema::{ObjectSchema, SchemaEngine, SchemaOutcome};
pub use validator::{
    CustomValidator, CustomValidators, FnValidator, Invocation, SharedValidator, Timeout,
    from_fn, invoke, with_timeout,
};
pub use values::Values;
