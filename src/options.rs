use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::values::Values;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Per-invocation options shared by the schema engine and every custom validator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationOptions {
    /// Stop at the first error instead of aggregating all of them
    pub abort_early: bool,
    /// Accept fields that have no schema rule
    pub allow_unknown: bool,
    /// Let the schema engine coerce and normalize values
    pub convert: bool,
    /// Free-form bag readable by the engine and validators
    pub context: Map<String, Value>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            abort_early: false,
            allow_unknown: false,
            convert: true,
            context: Map::new(),
        }
    }
}

impl ValidationOptions {
    pub fn abort_early() -> Self {
        Self {
            abort_early: true,
            ..Self::default()
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// The invocation's values, injected under `context.values`
    pub fn context_values(&self) -> Option<&Map<String, Value>> {
        self.context.get("values").and_then(Value::as_object)
    }

    pub(crate) fn set_context_values(&mut self, values: &Values) {
        self.context
            .insert("values".to_string(), Value::Object(values.as_map().clone()));
    }
}

/// Loads [`ValidationOptions`] defaults from files and the environment
pub struct OptionsLoader;

impl OptionsLoader {
    const FILE_NAMES: [&'static str; 4] = [
        "async-validation.toml",
        "async-validation.json",
        ".async-validation.toml",
        ".async-validation.json",
    ];

    /// Load options with precedence: defaults -> file -> environment
    pub async fn load(path: Option<&Path>) -> ConfigResult<ValidationOptions> {
        let options = match path {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::find_options_file().await?.unwrap_or_default(),
        };

        Self::apply_environment_overrides(options)
    }

    /// Load options from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> ConfigResult<ValidationOptions> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(options) = toml::from_str::<ValidationOptions>(&content) {
                    Ok(options)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find an options file in the current directory, then the user config directory
    pub async fn find_options_file() -> ConfigResult<Option<ValidationOptions>> {
        for name in &Self::FILE_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("async-validation");
            for name in &Self::FILE_NAMES {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(options: ValidationOptions) -> ConfigResult<ValidationOptions> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, options)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut options: ValidationOptions,
    ) -> ConfigResult<ValidationOptions> {
        if let Some(v) = parse_bool(env, "ASYNC_VALIDATION_ABORT_EARLY")? {
            options.abort_early = v;
        }
        if let Some(v) = parse_bool(env, "ASYNC_VALIDATION_ALLOW_UNKNOWN")? {
            options.allow_unknown = v;
        }
        if let Some(v) = parse_bool(env, "ASYNC_VALIDATION_CONVERT")? {
            options.convert = v;
        }

        Ok(options)
    }
}

fn parse_bool(env: &impl EnvProvider, key: &str) -> ConfigResult<Option<bool>> {
    match env.get(key) {
        Some(raw) => raw
            .trim()
            .parse::<bool>()
            .map(Some)
            .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    /// Mock environment variable provider for testing
    #[derive(Default)]
    struct MockEnvProvider {
        vars: HashMap<String, String>,
    }

    impl MockEnvProvider {
        fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
            self.vars.insert(key.into(), value.into());
        }
    }

    impl EnvProvider for MockEnvProvider {
        fn get(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn test_default_options() {
        let options = ValidationOptions::default();

        assert!(!options.abort_early);
        assert!(!options.allow_unknown);
        assert!(options.convert);
        assert!(options.context.is_empty());
        assert!(options.context_values().is_none());
    }

    #[test]
    fn test_context_values_injection() {
        let values: Values = [("name", json!("ada"))].into_iter().collect();
        let mut options = ValidationOptions::default().with_context("tenant", json!("acme"));
        options.set_context_values(&values);

        assert_eq!(options.context["tenant"], "acme");
        assert_eq!(options.context_values().unwrap()["name"], "ada");
    }

    #[tokio::test]
    async fn test_load_toml_options() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("options.toml");
        fs::write(
            &path,
            r#"
abort_early = true
convert = false

[context]
locale = "fr"
"#,
        )
        .unwrap();

        let options = OptionsLoader::load_from_file(&path).await.unwrap();

        assert!(options.abort_early);
        assert!(!options.allow_unknown);
        assert!(!options.convert);
        assert_eq!(options.context["locale"], "fr");
    }

    #[tokio::test]
    async fn test_load_json_options() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("options.json");
        fs::write(&path, r#"{ "allow_unknown": true }"#).unwrap();

        let options = OptionsLoader::load_from_file(&path).await.unwrap();

        assert!(options.allow_unknown);
        assert!(!options.abort_early);
        assert!(options.convert);
    }

    #[tokio::test]
    async fn test_load_without_extension_falls_back_to_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("options");
        fs::write(&path, r#"{ "abort_early": true }"#).unwrap();

        let options = OptionsLoader::load_from_file(&path).await.unwrap();
        assert!(options.abort_early);
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("options.yaml");
        fs::write(&path, "abort_early: true").unwrap();

        let result = OptionsLoader::load_from_file(&path).await;
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }

    #[test]
    fn test_environment_overrides() {
        let mut env = MockEnvProvider::default();
        env.set("ASYNC_VALIDATION_ABORT_EARLY", "true");
        env.set("ASYNC_VALIDATION_CONVERT", "false");

        let options =
            OptionsLoader::apply_environment_overrides_with(&env, ValidationOptions::default())
                .unwrap();

        assert!(options.abort_early);
        assert!(!options.convert);
        assert!(!options.allow_unknown);
    }

    #[test]
    fn test_invalid_environment_value() {
        let mut env = MockEnvProvider::default();
        env.set("ASYNC_VALIDATION_ALLOW_UNKNOWN", "maybe");

        let result =
            OptionsLoader::apply_environment_overrides_with(&env, ValidationOptions::default());

        match result {
            Err(ConfigError::Environment(msg)) => {
                assert!(msg.contains("ASYNC_VALIDATION_ALLOW_UNKNOWN"));
                assert!(msg.contains("maybe"));
            }
            other => panic!("Expected environment error, got {:?}", other),
        }
    }
}
