use common_crypto::{constant_time_eq, hmac_hex};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::config::StepCodeConfig;
use crate::error::{OtpError, OtpResult};

/// Codes shorter than this are left-padded with `'0'`. Longer codes are never cut,
/// which only happens when the hex suffix is wider than the default.
pub const MIN_CODE_LENGTH: usize = 6;

const MILLIS_PER_SECOND: f64 = 1_000.0;

/// Time-bucketed numeric codes derived from a shared secret.
#[derive(Debug, Clone, Default)]
pub struct StepCode {
    config: StepCodeConfig,
}

impl StepCode {
    pub fn new(config: StepCodeConfig) -> Self {
        Self { config }
    }

    pub fn from_value(value: &Value) -> OtpResult<Self> {
        Ok(Self::new(StepCodeConfig::from_value(value)?))
    }

    pub fn config(&self) -> &StepCodeConfig {
        &self.config
    }

    /// `floor(now_millis / (factor * 1000))`.
    pub fn current_time_step(&self) -> OtpResult<u64> {
        Ok(self.time_step_at(now_millis()?))
    }

    pub fn time_step_at(&self, epoch_millis: u64) -> u64 {
        let width = self.config.factor() * MILLIS_PER_SECOND;
        if width >= 1.0 && width.fract() == 0.0 {
            // Whole-millisecond steps divide exactly in integers.
            epoch_millis / width as u64
        } else {
            (epoch_millis as f64 / width).floor() as u64
        }
    }

    /// Lowercase hex HMAC where key and message are both `"{step}{secret}"`.
    ///
    /// NOTE: a standard construction keys the HMAC with the secret and hashes only the
    /// step counter. Existing codes depend on this exact derivation, so it is kept.
    pub fn derive_hash(&self, step: u64, secret: &str) -> OtpResult<String> {
        let material = format!("{step}{secret}");
        Ok(hmac_hex(
            self.config.algorithm(),
            material.as_bytes(),
            material.as_bytes(),
        )?)
    }

    /// Last `hex_length` characters of the digest, or all of it when shorter.
    pub fn truncate<'a>(&self, hex_digest: &'a str) -> &'a str {
        let start = hex_digest.len().saturating_sub(self.config.hex_length());
        hex_digest.get(start..).unwrap_or(hex_digest)
    }

    pub fn generate(&self, secret: &str) -> OtpResult<String> {
        self.generate_at(secret, now_millis()?)
    }

    pub fn generate_at(&self, secret: &str, epoch_millis: u64) -> OtpResult<String> {
        self.code_for_step(self.time_step_at(epoch_millis), secret)
    }

    pub fn code_for_step(&self, step: u64, secret: &str) -> OtpResult<String> {
        let digest = self.derive_hash(step, secret)?;
        let suffix = self.truncate(&digest);
        let value = u64::from_str_radix(suffix, 16)
            .map_err(|_| OtpError::InvalidDigest(suffix.to_string()))?;
        Ok(format!("{value:0width$}", width = MIN_CODE_LENGTH))
    }

    /// True when `value` is the code for the current step. Adjacent steps are not
    /// accepted; see [`matches_within`](Self::matches_within).
    pub fn matches(&self, value: &str, secret: &str) -> bool {
        match now_millis() {
            Ok(millis) => self.matches_at(value, secret, millis),
            Err(err) => {
                warn!(error = %err, "step code check skipped");
                false
            }
        }
    }

    pub fn matches_at(&self, value: &str, secret: &str, epoch_millis: u64) -> bool {
        self.matches_step(value, secret, self.time_step_at(epoch_millis))
    }

    /// Like [`matches`](Self::matches), also accepting up to `window` steps either
    /// side of the current one to absorb clock drift.
    pub fn matches_within(&self, value: &str, secret: &str, window: u64) -> bool {
        match now_millis() {
            Ok(millis) => self.matches_within_at(value, secret, window, millis),
            Err(err) => {
                warn!(error = %err, "step code check skipped");
                false
            }
        }
    }

    pub fn matches_within_at(
        &self,
        value: &str,
        secret: &str,
        window: u64,
        epoch_millis: u64,
    ) -> bool {
        let current = self.time_step_at(epoch_millis);
        let first = current.saturating_sub(window);
        let last = current.saturating_add(window);
        (first..=last).any(|step| self.matches_step(value, secret, step))
    }

    fn matches_step(&self, value: &str, secret: &str, step: u64) -> bool {
        match self.code_for_step(step, secret) {
            Ok(expected) => constant_time_eq(expected.as_bytes(), value.as_bytes()),
            Err(err) => {
                warn!(step, error = %err, "failed to derive step code");
                false
            }
        }
    }
}

fn now_millis() -> OtpResult<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| OtpError::Clock(err.to_string()))?;
    Ok(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
