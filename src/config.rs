use crate::Error;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Credential key holding the platform API key.
pub const API_KEY_CREDENTIAL: &str = "apiKey";

/// Optional per-handler settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerOptions {
    /// Bound on the whole request/response exchange, including stream consumption.
    pub timeout: Option<Duration>,
    /// Override of the platform endpoint (e.g. a proxy or a mock server).
    pub base_url: Option<String>,
}

/// Configuration used to resolve and construct a platform handler.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Registered platform name, e.g. "volcengine".
    pub provider: String,
    /// Platform credentials, e.g. `apiKey`.
    pub credentials: HashMap<String, String>,
    pub options: HandlerOptions,
}

impl ProviderConfig {
    /// Create an empty configuration for `provider`.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..Default::default()
        }
    }

    /// Create a configuration for `provider` authenticated with an API key.
    pub fn with_api_key(provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::new(provider).credential(API_KEY_CREDENTIAL, api_key)
    }

    /// Add or replace a credential.
    pub fn credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.options.base_url = Some(base_url.into());
        self
    }

    /// Look up a credential, treating an empty value as absent.
    pub fn get_credential(&self, key: &str) -> Option<&str> {
        self.credentials
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Create configuration from environment variables.
    ///
    /// * `MODELBRIDGE_PROVIDER` - platform name (required)
    /// * `MODELBRIDGE_API_KEY` or `<PROVIDER>_API_KEY` - API key
    /// * `MODELBRIDGE_TIMEOUT_SECS` - request timeout in seconds
    /// * `MODELBRIDGE_BASE_URL` - endpoint override
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = lookup("MODELBRIDGE_PROVIDER")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                Error::config("MODELBRIDGE_PROVIDER environment variable is required")
            })?;
        let provider = provider.trim().to_lowercase();

        let mut config = Self::new(provider.clone());

        let provider_key = format!("{}_API_KEY", provider.to_uppercase());
        if let Some(api_key) = lookup("MODELBRIDGE_API_KEY").or_else(|| lookup(&provider_key)) {
            config = config.credential(API_KEY_CREDENTIAL, api_key);
        }

        if let Some(raw) = lookup("MODELBRIDGE_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::config(format!(
                    "Invalid MODELBRIDGE_TIMEOUT_SECS '{raw}': expected a whole number of seconds"
                ))
            })?;
            config = config.timeout(Duration::from_secs(secs));
        }

        if let Some(base_url) = lookup("MODELBRIDGE_BASE_URL") {
            config = config.base_url(base_url);
        }

        Ok(config)
    }
}
