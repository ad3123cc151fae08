use common_crypto::{ConfigError, ConfigMap, HashAlgorithm};
use serde_json::Value;

/// Width of one time step, in seconds.
pub const DEFAULT_FACTOR_SECONDS: f64 = 5.0;
/// Hex characters kept from the end of the digest.
pub const DEFAULT_HEX_LENGTH: usize = 4;
/// 15 hex characters is the widest suffix that always fits a `u64`.
pub const MAX_HEX_LENGTH: usize = 15;

const RECOGNIZED_KEYS: &[&str] = &["algorithm", "factor", "hexLength", "codeDigits"];
const HEX_LENGTH_KEYS: &[&str] = &["hexLength", "codeDigits"];

#[derive(Debug, Clone, PartialEq)]
pub struct StepCodeConfig {
    algorithm: HashAlgorithm,
    factor: f64,
    hex_length: usize,
}

impl Default for StepCodeConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            factor: DEFAULT_FACTOR_SECONDS,
            hex_length: DEFAULT_HEX_LENGTH,
        }
    }
}

impl StepCodeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a partial mapping. Recognized keys: `algorithm`, `factor`,
    /// `hexLength` (`codeDigits` is accepted as an alias).
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let map = ConfigMap::from_value(value, RECOGNIZED_KEYS)?;
        let mut config = Self::default();
        if let Some(algorithm) = map.string("algorithm")? {
            config = config.with_algorithm(parse_algorithm(&algorithm)?);
        }
        if let Some(factor) = map.f64("factor")? {
            config = config.with_factor(factor)?;
        }
        if let Some(hex_length) = map.first_u64(HEX_LENGTH_KEYS)? {
            config = config.with_hex_length(to_usize("hexLength", hex_length)?)?;
        }
        Ok(config)
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Step width in seconds. Fractions are allowed; zero, negative and
    /// non-finite widths are not.
    pub fn with_factor(mut self, seconds: f64) -> Result<Self, ConfigError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(ConfigError::invalid(
                "factor",
                format!("must be a positive number of seconds, got {seconds}"),
            ));
        }
        self.factor = seconds;
        Ok(self)
    }

    pub fn with_hex_length(mut self, hex_length: usize) -> Result<Self, ConfigError> {
        if !(1..=MAX_HEX_LENGTH).contains(&hex_length) {
            return Err(ConfigError::invalid(
                "hexLength",
                format!("must be between 1 and {MAX_HEX_LENGTH}, got {hex_length}"),
            ));
        }
        self.hex_length = hex_length;
        Ok(self)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn hex_length(&self) -> usize {
        self.hex_length
    }
}

fn parse_algorithm(value: &str) -> Result<HashAlgorithm, ConfigError> {
    value
        .parse::<HashAlgorithm>()
        .map_err(|err| ConfigError::invalid("algorithm", err.to_string()))
}

fn to_usize(key: &str, value: u64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::invalid(key, format!("{value} is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let config = StepCodeConfig::from_value(&json!({})).expect("config");
        assert_eq!(config.algorithm(), HashAlgorithm::Sha256);
        assert_eq!(config.factor(), DEFAULT_FACTOR_SECONDS);
        assert_eq!(config.hex_length(), 4);
    }

    #[test]
    fn recognized_keys_apply() {
        let config = StepCodeConfig::from_value(&json!({
            "algorithm": "sha1",
            "factor": 30,
            "hexLength": 6,
            "unrelated": true,
        }))
        .expect("config");
        assert_eq!(config.algorithm(), HashAlgorithm::Sha1);
        assert_eq!(config.factor(), 30.0);
        assert_eq!(config.hex_length(), 6);
    }

    #[test]
    fn fractional_and_float_values_are_accepted() {
        let whole = StepCodeConfig::from_value(&json!({"factor": 5.0, "hexLength": 6.0}))
            .expect("config");
        assert_eq!(whole.factor(), 5.0);
        assert_eq!(whole.hex_length(), 6);
        let half = StepCodeConfig::from_value(&json!({"factor": 0.5})).expect("config");
        assert_eq!(half.factor(), 0.5);
        assert!(StepCodeConfig::from_value(&json!({"hexLength": 6.5})).is_err());
    }

    #[test]
    fn code_digits_alias() {
        let config = StepCodeConfig::from_value(&json!({"codeDigits": 5})).expect("config");
        assert_eq!(config.hex_length(), 5);
        let both = StepCodeConfig::from_value(&json!({"codeDigits": 5, "hexLength": 3})).unwrap();
        assert_eq!(both.hex_length(), 3);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(StepCodeConfig::from_value(&json!({"factor": 0})).is_err());
        assert!(StepCodeConfig::from_value(&json!({"hexLength": 0})).is_err());
        assert!(StepCodeConfig::from_value(&json!({"hexLength": 16})).is_err());
        assert!(StepCodeConfig::from_value(&json!({"factor": -5})).is_err());
        assert!(StepCodeConfig::from_value(&json!({"factor": -0.5})).is_err());
        assert!(StepCodeConfig::new().with_factor(f64::INFINITY).is_err());
        assert!(StepCodeConfig::new().with_factor(f64::NAN).is_err());
        assert!(StepCodeConfig::from_value(&json!({"algorithm": "md5"})).is_err());
    }

    #[test]
    fn non_mapping_is_fatal() {
        assert_eq!(
            StepCodeConfig::from_value(&json!("sha256")).unwrap_err(),
            ConfigError::NotAMapping("string")
        );
    }
}
