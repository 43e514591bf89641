//! Provider configuration.
//!
//! Values set in the provider block win; `personal_access_token` and
//! `catalog_url` otherwise fall back to `AUTONOMI_PAT` and
//! `AUTONOMI_CATALOG_URL`. Every problem is reported as a diagnostic on the
//! offending attribute.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Number, Value};

use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::validate;

/// Environment variable holding the personal access token.
pub const ENV_PAT: &str = "AUTONOMI_PAT";

/// Environment variable holding the catalog (search index) URL.
pub const ENV_CATALOG_URL: &str = "AUTONOMI_CATALOG_URL";

/// Default timeout for one catalog request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    terms_and_conditions: Option<bool>,
    personal_access_token: Option<String>,
    catalog_url: Option<String>,
    timeout_secs: Option<Number>,
}

/// Resolved catalog configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Base URL of the search index.
    pub catalog_url: String,
    /// Token sent to the search index and the control plane.
    pub personal_access_token: String,
    /// The user accepted the API terms and conditions.
    pub terms_and_conditions: bool,
    /// Upper bound for a single backend call.
    pub timeout: Duration,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("catalog_url", &self.catalog_url)
            .field("personal_access_token", &"<redacted>")
            .field("terms_and_conditions", &self.terms_and_conditions)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CatalogConfig {
    /// Create a configuration directly, with the default timeout.
    pub fn new(catalog_url: impl Into<String>, personal_access_token: impl Into<String>) -> Self {
        Self {
            catalog_url: catalog_url.into(),
            personal_access_token: personal_access_token.into(),
            terms_and_conditions: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "terms_and_conditions",
                Attribute::optional_bool()
                    .with_description("Must be set to true to accept the API terms and conditions."),
            )
            .with_attribute(
                "personal_access_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("Personal access token. Defaults to `{ENV_PAT}`.")),
            )
            .with_attribute(
                "catalog_url",
                Attribute::optional_string()
                    .with_description(format!("Catalog URL. Defaults to `{ENV_CATALOG_URL}`.")),
            )
            .with_attribute(
                "timeout_secs",
                Attribute::optional_int64().with_description("Timeout of a catalog request in seconds."),
            )
    }

    /// Resolve the provider block, falling back to the process environment.
    pub fn from_value(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Resolve the provider block with `env` as the environment lookup.
    pub fn resolve<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = validate(&Self::schema(), config);
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let raw: RawConfig = match config {
            Value::Null => RawConfig::default(),
            _ => serde_json::from_value(config.clone()).map_err(|err| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(err.to_string())]
            })?,
        };

        let personal_access_token = raw
            .personal_access_token
            .or_else(|| env(ENV_PAT))
            .unwrap_or_default();
        let catalog_url = raw
            .catalog_url
            .or_else(|| env(ENV_CATALOG_URL))
            .unwrap_or_default();
        let terms_and_conditions = raw.terms_and_conditions.unwrap_or(false);

        if !terms_and_conditions {
            diagnostics.push(
                Diagnostic::error("API Terms and Conditions not accepted")
                    .with_detail("Set terms_and_conditions to true in the provider configuration.")
                    .with_attribute("terms_and_conditions"),
            );
        }
        if personal_access_token.is_empty() {
            diagnostics.push(
                Diagnostic::error("Empty API Personal Access Token")
                    .with_detail(format!(
                        "Set personal_access_token in the provider configuration or use the {ENV_PAT} environment variable."
                    ))
                    .with_attribute("personal_access_token"),
            );
        }
        if catalog_url.is_empty() {
            diagnostics.push(
                Diagnostic::error("Empty Catalog URL")
                    .with_detail(format!(
                        "Set catalog_url in the provider configuration or use the {ENV_CATALOG_URL} environment variable."
                    ))
                    .with_attribute("catalog_url"),
            );
        }
        let timeout = match &raw.timeout_secs {
            None => DEFAULT_TIMEOUT,
            Some(secs) => match whole_seconds(secs) {
                Some(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    diagnostics.push(
                        Diagnostic::error("Invalid timeout")
                            .with_detail(format!(
                                "timeout_secs must be a whole number of seconds greater than zero, got {}",
                                secs
                            ))
                            .with_attribute("timeout_secs"),
                    );
                    DEFAULT_TIMEOUT
                },
            },
        };

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        Ok(Self {
            catalog_url,
            personal_access_token,
            terms_and_conditions,
            timeout,
        })
    }
}

// `30.0` is a valid int64 for the schema, so integral floats are accepted.
fn whole_seconds(secs: &Number) -> Option<u64> {
    secs.as_u64().or_else(|| {
        secs.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_explicit_config() {
        let config = CatalogConfig::resolve(
            &json!({
                "terms_and_conditions": true,
                "personal_access_token": "pat",
                "catalog_url": "https://catalog.example",
                "timeout_secs": 5,
            }),
            no_env,
        )
        .unwrap();
        assert_eq!(config.catalog_url, "https://catalog.example");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_env_fallback() {
        let env = |key: &str| match key {
            ENV_PAT => Some("from-env".to_string()),
            ENV_CATALOG_URL => Some("https://env.example".to_string()),
            _ => None,
        };
        let config =
            CatalogConfig::resolve(&json!({"terms_and_conditions": true}), env).unwrap();
        assert_eq!(config.personal_access_token, "from-env");
        assert_eq!(config.catalog_url, "https://env.example");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);

        let config = CatalogConfig::resolve(
            &json!({"terms_and_conditions": true, "personal_access_token": "explicit"}),
            env,
        )
        .unwrap();
        assert_eq!(config.personal_access_token, "explicit");
    }

    #[test]
    fn test_missing_values_reported_per_attribute() {
        let diagnostics = CatalogConfig::resolve(&Value::Null, no_env).unwrap_err();
        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(
            attributes,
            vec!["terms_and_conditions", "personal_access_token", "catalog_url"]
        );
    }

    #[test]
    fn test_wrong_type_is_a_schema_error() {
        let diagnostics =
            CatalogConfig::resolve(&json!({"terms_and_conditions": "true"}), no_env).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("terms_and_conditions")
        );
    }

    fn with_timeout(timeout: Value) -> Value {
        json!({
            "terms_and_conditions": true,
            "personal_access_token": "pat",
            "catalog_url": "https://catalog.example",
            "timeout_secs": timeout,
        })
    }

    #[test]
    fn test_integral_float_timeout() {
        let config = CatalogConfig::resolve(&with_timeout(json!(30.0)), no_env).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_timeouts_point_at_attribute() {
        for timeout in [json!(-1), json!(0), json!(-2.0)] {
            let diagnostics =
                CatalogConfig::resolve(&with_timeout(timeout.clone()), no_env).unwrap_err();
            assert_eq!(diagnostics.len(), 1, "{}", timeout);
            assert_eq!(diagnostics[0].summary, "Invalid timeout");
            assert_eq!(diagnostics[0].attribute.as_deref(), Some("timeout_secs"));
        }
    }

    #[test]
    fn test_token_is_redacted() {
        let config = CatalogConfig::new("https://catalog.example", "secret");
        assert!(!format!("{:?}", config).contains("secret"));
        assert!(CatalogConfig::schema().block.attributes["personal_access_token"]
            .flags
            .sensitive);
    }
}
