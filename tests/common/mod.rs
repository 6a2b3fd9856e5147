//! Validators and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_validation::{
    CustomValidator, SharedValidator, ValidationOptions, ValidatorError, Values, from_fn,
};
use serde_json::Value;

pub const RESERVED_NAMES: [&str; 3] = ["admin", "root", "system"];

pub fn values(value: Value) -> Values {
    Values::try_from(value).expect("test values must be a JSON object")
}

pub fn to_lowercase() -> SharedValidator {
    Arc::new(from_fn(|value: Value, _| async move {
        Ok(value
            .as_str()
            .map(|s| Value::String(s.to_lowercase()))
            .unwrap_or(value))
    }))
}

pub fn check_not_reserved() -> SharedValidator {
    Arc::new(from_fn(|value: Value, _| async move {
        let reserved = value
            .as_str()
            .is_some_and(|s| RESERVED_NAMES.contains(&s));
        if reserved {
            Err(ValidatorError::invalid(
                format!("\"name\" {} is reserved", value),
                "name.reserved",
            ))
        } else {
            Ok(value)
        }
    }))
}

/// Fails every value and counts how often it ran
pub fn always_fails(kind: &'static str, calls: Arc<AtomicUsize>) -> SharedValidator {
    Arc::new(from_fn(move |_value: Value, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Err(ValidatorError::invalid(format!("failed {}", kind), kind)) }
    }))
}

/// Passes every value and counts how often it ran
pub fn counting_pass(calls: Arc<AtomicUsize>) -> SharedValidator {
    Arc::new(from_fn(move |value: Value, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(value) }
    }))
}

pub fn faulty(message: &'static str) -> SharedValidator {
    Arc::new(from_fn(move |_value: Value, _| async move {
        Err(ValidatorError::Fault(anyhow::anyhow!(message)))
    }))
}

/// Panics on any string value
pub fn panics() -> SharedValidator {
    Arc::new(from_fn(|value: Value, _| async move {
        if value.is_string() {
            panic!("validator crashed on {}", value);
        }
        Ok(value)
    }))
}

/// Sleeps, then marks completion and passes
pub fn slow_pass(delay: Duration, completed: Arc<AtomicUsize>) -> SharedValidator {
    Arc::new(from_fn(move |value: Value, _| {
        let completed = Arc::clone(&completed);
        async move {
            tokio::time::sleep(delay).await;
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }))
}

/// Sleeps, then fails
pub fn slow_fail(delay: Duration, kind: &'static str) -> SharedValidator {
    Arc::new(from_fn(move |_value: Value, _| async move {
        tokio::time::sleep(delay).await;
        Err(ValidatorError::invalid(format!("failed {}", kind), kind))
    }))
}

/// Checks that `password_confirmation` matches the sibling `password` in the context
pub fn matches_password() -> SharedValidator {
    Arc::new(from_fn(|value: Value, options: Arc<ValidationOptions>| async move {
        let password = options
            .context_values()
            .and_then(|values| values.get("password"))
            .cloned();
        if password.as_ref() == Some(&value) {
            Ok(value)
        } else {
            Err(ValidatorError::invalid(
                "\"password_confirmation\" must match \"password\"",
                "any.ref",
            ))
        }
    }))
}

pub fn shared<V: CustomValidator + 'static>(validator: V) -> SharedValidator {
    Arc::new(validator)
}
