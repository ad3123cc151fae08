use common_crypto::{ConfigError, ConfigMap, Secret};
use serde_json::Value;

/// Issuer stamped on tokens whose payload has no `iss`.
pub const DEFAULT_ISSUER: &str = "Bach beo";
/// `exp` used when the payload has none, in seconds.
pub const DEFAULT_EXPIRES_IN_SECONDS: u64 = 86_400;

const RECOGNIZED_KEYS: &[&str] = &["secret"];

/// Values filled into reserved claims the caller left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDefaults {
    pub issuer: String,
    pub expires_in_seconds: u64,
}

impl Default for ClaimDefaults {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            expires_in_seconds: DEFAULT_EXPIRES_IN_SECONDS,
        }
    }
}

/// Runtime configuration for the token codec. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct TokenConfig {
    secret: Secret,
    defaults: ClaimDefaults,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Secret>) -> Self {
        Self {
            secret: secret.into(),
            defaults: ClaimDefaults::default(),
        }
    }

    /// Build from a partial mapping; only `secret` is recognized.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let map = ConfigMap::from_value(value, RECOGNIZED_KEYS)?;
        let mut config = Self::default();
        if let Some(secret) = map.string("secret")? {
            config.secret = Secret::new(secret);
        }
        Ok(config)
    }

    /// Replace the reserved-claim defaults.
    pub fn with_defaults(mut self, defaults: ClaimDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &ClaimDefaults {
        &self.defaults
    }

    pub(crate) fn secret(&self) -> &Secret {
        &self.secret
    }
}
