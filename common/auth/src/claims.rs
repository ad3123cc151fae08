use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::config::ClaimDefaults;
use crate::error::{AuthError, AuthResult};

const ISSUER_CLAIM: &str = "iss";
const EXPIRATION_CLAIM: &str = "exp";
const MILLIS_PER_SECOND: i64 = 1_000;

/// Copy `payload` and fill the reserved claims.
///
/// `iss` falls back to `defaults.issuer`. `exp` is read in seconds (falling back to
/// `defaults.expires_in_seconds`) and always stored in milliseconds, even when the
/// caller already passed milliseconds. Caller keys keep their order; added claims
/// go last.
///
/// Order is plain insertion order. Encoders that hoist integer-like keys (`"2"`)
/// ahead of the rest, as JavaScript's `JSON.stringify` does, produce different
/// bytes for a payload such as `{"b":1,"2":0}`, and so a different signature.
pub fn build_payload<T>(payload: &T, defaults: &ClaimDefaults) -> AuthResult<Map<String, Value>>
where
    T: Serialize + ?Sized,
{
    let mut claims = match serde_json::to_value(payload)
        .map_err(|err| AuthError::Encoding(err.to_string()))?
    {
        Value::Object(map) => map,
        other => {
            return Err(AuthError::Encoding(format!(
                "payload must serialize to a JSON object, got {other}"
            )))
        }
    };

    if !claims.contains_key(ISSUER_CLAIM) {
        claims.insert(
            ISSUER_CLAIM.to_string(),
            Value::String(defaults.issuer.clone()),
        );
    }

    let expiration = match claims.get(EXPIRATION_CLAIM) {
        Some(seconds) => seconds_to_millis(seconds)?,
        None => seconds_to_millis(&Value::from(defaults.expires_in_seconds))?,
    };
    claims.insert(EXPIRATION_CLAIM.to_string(), expiration);

    Ok(claims)
}

fn seconds_to_millis(value: &Value) -> AuthResult<Value> {
    let invalid = || AuthError::InvalidClaim(EXPIRATION_CLAIM, value.to_string());
    let Value::Number(number) = value else {
        return Err(invalid());
    };

    if let Some(seconds) = number.as_i64() {
        return seconds
            .checked_mul(MILLIS_PER_SECOND)
            .map(Value::from)
            .ok_or_else(invalid);
    }
    if let Some(seconds) = number.as_u64() {
        return seconds
            .checked_mul(MILLIS_PER_SECOND as u64)
            .map(Value::from)
            .ok_or_else(invalid);
    }

    let millis = number
        .as_f64()
        .map(|seconds| seconds * MILLIS_PER_SECOND as f64)
        .filter(|millis| millis.is_finite())
        .ok_or_else(invalid)?;
    if millis.fract() == 0.0 && millis.abs() < i64::MAX as f64 {
        Ok(Value::from(millis as i64))
    } else {
        Number::from_f64(millis).map(Value::Number).ok_or_else(invalid)
    }
}

/// Decoded payload of a token.
///
/// Nothing here is consulted by signature verification; expiry policy belongs to
/// the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    raw: Map<String, Value>,
}

impl Claims {
    pub fn issuer(&self) -> Option<&str> {
        self.raw.get(ISSUER_CLAIM).and_then(Value::as_str)
    }

    /// `exp` as stored, in milliseconds.
    pub fn expiration_millis(&self) -> Option<i64> {
        self.raw.get(EXPIRATION_CLAIM).and_then(Value::as_i64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.raw
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(raw: Map<String, Value>) -> Self {
        Self { raw }
    }
}

impl TryFrom<Value> for Claims {
    type Error = AuthError;

    fn try_from(value: Value) -> AuthResult<Self> {
        match value {
            Value::Object(raw) => Ok(Self { raw }),
            other => Err(AuthError::InvalidJson(format!(
                "expected a claims object, got {other}"
            ))),
        }
    }
}
