use std::fmt;

use anyhow::{Context, Result};
use bon::Builder;
use reqwest::Url;

pub const DEFAULT_ENDPOINT: &str = "https://sqladmin.googleapis.com/";

/// Runtime settings, read from the environment on every invocation.
#[derive(Builder, Clone)]
pub struct Config {
    #[builder(default = DEFAULT_ENDPOINT.to_string(), into)]
    pub endpoint: String,

    /// Pre-minted OAuth token. Application Default Credentials are used when
    /// unset.
    #[builder(into)]
    pub access_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let endpoint = var("SQLADMIN_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Url::parse(&endpoint)
            .with_context(|| format!("SQLADMIN_ENDPOINT is not a valid URL: {}", endpoint))?;

        Ok(Self::builder()
            .endpoint(endpoint)
            .maybe_access_token(var("GOOGLE_OAUTH_ACCESS_TOKEN"))
            .build())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.access_token, None);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SQLADMIN_ENDPOINT", "http://localhost:9000/"),
            ("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.token"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "http://localhost:9000/");
        assert_eq!(config.access_token.as_deref(), Some("ya29.token"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_lookup(lookup(&[("GOOGLE_OAUTH_ACCESS_TOKEN", "  ")])).unwrap();
        assert_eq!(config.access_token, None);
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = Config::from_lookup(lookup(&[("SQLADMIN_ENDPOINT", "not a url")])).unwrap_err();
        assert!(err.to_string().contains("SQLADMIN_ENDPOINT"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::builder().access_token("secret").build();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
