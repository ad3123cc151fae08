use common_crypto::{base64url_decode, base64url_encode, constant_time_eq, hmac_sha256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::claims::{build_payload, Claims};
use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};

pub const TOKEN_ALGORITHM: &str = "HS256";
pub const TOKEN_TYPE: &str = "JWT";
const SEGMENT_SEPARATOR: char = '.';

/// Token header. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    pub typ: String,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Header and payload segments of a token, still encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub header: &'a str,
    /// `None` when the token has no `.` at all.
    pub payload: Option<&'a str>,
}

/// JSON-serialize `obj` and encode the bytes as unpadded base64url.
pub fn encode_segment<T>(obj: &T) -> AuthResult<String>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_vec(obj).map_err(|err| AuthError::Encoding(err.to_string()))?;
    Ok(base64url_encode(json))
}

/// First two `.`-separated segments. Anything after them, the signature included,
/// is dropped: verification re-derives it instead of trusting it.
pub fn split(token: &str) -> TokenParts<'_> {
    let mut segments = token.split(SEGMENT_SEPARATOR);
    let header = segments.next().unwrap_or_default();
    let payload = segments.next();
    TokenParts { header, payload }
}

/// Issues and verifies HS256 tokens under a single shared secret.
#[derive(Debug, Clone, Default)]
pub struct TokenCodec {
    config: TokenConfig,
}

impl TokenCodec {
    pub fn new(config: TokenConfig) -> Self {
        if config.secret().is_empty() {
            debug!("token codec configured with an empty secret");
        }
        Self { config }
    }

    /// Build from a partial mapping such as `{"secret": "..."}`.
    pub fn from_value(value: &Value) -> AuthResult<Self> {
        Ok(Self::new(TokenConfig::from_value(value)?))
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Payload augmented with `iss`/`exp` using this codec's defaults.
    pub fn build_payload<T>(&self, payload: &T) -> AuthResult<Map<String, Value>>
    where
        T: Serialize + ?Sized,
    {
        build_payload(payload, self.config.defaults())
    }

    /// base64url(HMAC-SHA256(secret, "<header>.<payload>")).
    pub fn sign(&self, encoded_header: &str, encoded_payload: &str) -> AuthResult<String> {
        let signing_input = format!("{encoded_header}{SEGMENT_SEPARATOR}{encoded_payload}");
        let digest = hmac_sha256(self.config.secret().as_bytes(), signing_input.as_bytes())?;
        Ok(base64url_encode(digest))
    }

    pub fn issue<T>(&self, payload: &T) -> AuthResult<String>
    where
        T: Serialize + ?Sized,
    {
        let encoded_header = encode_segment(&Header::default())?;
        let encoded_payload = encode_segment(&self.build_payload(payload)?)?;
        self.assemble(&encoded_header, &encoded_payload)
    }

    /// Recompute the token from its own header and payload segments and compare it
    /// with the presented string. Claims are never inspected, so an expired `exp`
    /// still verifies.
    pub fn check(&self, token: &str) -> AuthResult<()> {
        let parts = split(token);
        let encoded_payload = parts
            .payload
            .ok_or(AuthError::MalformedToken("missing payload segment"))?;
        let expected = self.assemble(parts.header, encoded_payload)?;
        if constant_time_eq(expected.as_bytes(), token.as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::SignatureMismatch)
        }
    }

    pub fn verify(&self, token: &str) -> bool {
        match self.check(token) {
            Ok(()) => {
                debug!("token signature verified");
                true
            }
            Err(err) if err.is_rejection() => {
                debug!(error = %err, "token rejected");
                false
            }
            Err(err) => {
                warn!(error = %err, "token verification failed");
                false
            }
        }
    }

    /// [`check`](Self::check) the token, then decode its payload.
    pub fn verified_claims(&self, token: &str) -> AuthResult<Claims> {
        self.check(token)?;
        decode_payload(token)
    }

    fn assemble(&self, encoded_header: &str, encoded_payload: &str) -> AuthResult<String> {
        let signature = self.sign(encoded_header, encoded_payload)?;
        Ok(format!(
            "{encoded_header}{SEGMENT_SEPARATOR}{encoded_payload}{SEGMENT_SEPARATOR}{signature}"
        ))
    }
}

/// Decode the payload segment without checking the signature.
pub fn decode_payload(token: &str) -> AuthResult<Claims> {
    let encoded_payload = split(token)
        .payload
        .ok_or(AuthError::MalformedToken("missing payload segment"))?;
    let bytes = base64url_decode(encoded_payload)
        .map_err(|_| AuthError::MalformedToken("payload segment is not base64url"))?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|err| AuthError::InvalidJson(err.to_string()))?;
    Claims::try_from(value)
}

/// Decode the header segment without checking the signature.
pub fn decode_header(token: &str) -> AuthResult<Header> {
    let bytes = base64url_decode(split(token).header)
        .map_err(|_| AuthError::MalformedToken("header segment is not base64url"))?;
    serde_json::from_slice(&bytes).map_err(|err| AuthError::InvalidJson(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(TokenConfig::new(secret))
    }

    #[test]
    fn header_segment_is_fixed() {
        let token = codec("k").issue(&json!({"sub": "u1"})).expect("issue");
        let segments: Vec<_> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
        let header = base64url_decode(segments[0]).unwrap();
        assert_eq!(header, br#"{"alg":"HS256","typ":"JWT"}"#);
    }

    #[test]
    fn payload_segment_carries_reserved_claims() {
        let token = codec("k").issue(&json!({"sub": "u1"})).expect("issue");
        let payload = base64url_decode(token.split('.').nth(1).unwrap()).unwrap();
        assert_eq!(payload, br#"{"sub":"u1","iss":"Bach beo","exp":86400000}"#);
    }

    #[test]
    fn signature_is_hmac_over_first_two_segments() {
        let codec = codec("k");
        let token = codec.issue(&json!({"sub": "u1"})).expect("issue");
        let parts = split(&token);
        let signature = codec.sign(parts.header, parts.payload.unwrap()).unwrap();
        let expected = base64url_encode(
            hmac_sha256(b"k", format!("{}.{}", parts.header, parts.payload.unwrap()).as_bytes())
                .unwrap(),
        );
        assert_eq!(signature, expected);
        assert!(token.ends_with(&signature));
        assert!(!signature.contains('='));
    }

    #[test]
    fn issue_verify_round_trip() {
        let codec = codec("k");
        let token = codec.issue(&json!({"sub": "u1", "roles": ["admin"]})).unwrap();
        assert!(codec.verify(&token));
        assert!(codec.check(&token).is_ok());
    }

    #[test]
    fn issue_is_deterministic() {
        let codec = codec("k");
        let a = codec.issue(&json!({"sub": "u1"})).unwrap();
        let b = codec.issue(&json!({"sub": "u1"})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_secret_fails() {
        let token = codec("k1").issue(&json!({"sub": "u1"})).unwrap();
        assert!(!codec("k2").verify(&token));
        assert!(matches!(
            codec("k2").check(&token),
            Err(AuthError::SignatureMismatch)
        ));
    }

    #[test]
    fn empty_secret_still_signs() {
        let codec = TokenCodec::default();
        let token = codec.issue(&json!({})).unwrap();
        assert!(codec.verify(&token));
        assert!(!self::codec("k").verify(&token));
    }

    #[test]
    fn malformed_tokens_are_rejected_softly() {
        let codec = codec("k");
        assert!(!codec.verify(""));
        assert!(!codec.verify("no-dots-here"));
        assert!(matches!(
            codec.check("no-dots-here"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(!codec.verify("a.b"));
        assert!(!codec.verify("!!.??.**"));
        assert!(!codec.verify(".."));
    }

    #[test]
    fn token_faults_are_rejections() {
        let codec = codec("k");
        assert!(codec.check("no-dots-here").unwrap_err().is_rejection());
        assert!(codec.check("a.b").unwrap_err().is_rejection());
        assert!(decode_payload("h.bm90IGpzb24.s").unwrap_err().is_rejection());
        assert!(!AuthError::Encoding("bad".into()).is_rejection());
        assert!(!AuthError::Signing(common_crypto::CryptoError::InvalidMacKey).is_rejection());
    }

    #[test]
    fn extra_segments_are_rejected() {
        let codec = codec("k");
        let token = codec.issue(&json!({"sub": "u1"})).unwrap();
        assert!(!codec.verify(&format!("{token}.extra")));
        assert!(!codec.verify(&format!("{token}.")));
    }

    #[test]
    fn split_keeps_first_two_segments() {
        assert_eq!(
            split("h.p.s"),
            TokenParts {
                header: "h",
                payload: Some("p")
            }
        );
        assert_eq!(
            split("h"),
            TokenParts {
                header: "h",
                payload: None
            }
        );
        assert_eq!(split("h.").payload, Some(""));
    }

    #[test]
    fn verify_ignores_expiration() {
        let codec = codec("k");
        let token = codec.issue(&json!({"exp": 0})).unwrap();
        assert!(codec.verify(&token));
        let claims = codec.verified_claims(&token).unwrap();
        assert_eq!(claims.expiration_millis(), Some(0));
    }

    #[test]
    fn verified_claims_rejects_forged_tokens() {
        let token = codec("k1").issue(&json!({"sub": "u1"})).unwrap();
        assert!(codec("k2").verified_claims(&token).is_err());
        let claims = decode_payload(&token).unwrap();
        assert_eq!(claims.get("sub"), Some(&json!("u1")));
    }

    #[test]
    fn decode_helpers_report_malformed_segments() {
        assert!(matches!(
            decode_payload("abc"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(matches!(
            decode_payload("abc.!!!"),
            Err(AuthError::MalformedToken(_))
        ));
        let not_json = base64url_encode(b"not json");
        assert!(matches!(
            decode_payload(&format!("h.{not_json}.s")),
            Err(AuthError::InvalidJson(_))
        ));
        let token = codec("k").issue(&json!({})).unwrap();
        assert_eq!(decode_header(&token).unwrap(), Header::default());
    }

    #[test]
    fn encode_segment_rejects_non_serializable_input() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(vec![1u8], 1);
        assert!(matches!(encode_segment(&map), Err(AuthError::Encoding(_))));
        assert_eq!(encode_segment(&json!({"a": 1})).unwrap(), "eyJhIjoxfQ");
    }

    #[test]
    fn codec_from_value_rejects_non_mapping() {
        assert!(matches!(
            TokenCodec::from_value(&json!("secret")),
            Err(AuthError::Config(_))
        ));
        let codec = TokenCodec::from_value(&json!({"secret": "k"})).unwrap();
        let token = codec.issue(&json!({"sub": "u1"})).unwrap();
        assert!(self::codec("k").verify(&token));
    }
}
