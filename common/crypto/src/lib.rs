use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

pub mod config;

pub use config::{ConfigError, ConfigMap};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Errors produced by the common-crypto helpers.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
    #[error("invalid HMAC key length")]
    InvalidMacKey,
    #[error("unsupported hash algorithm '{0}'")]
    UnsupportedAlgorithm(String),
}

/// Hash functions accepted for keyed hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    Sha1,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sha1" => Ok(HashAlgorithm::Sha1),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared secret held in memory that is wiped on drop and never printed.
#[derive(Clone, Default)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&"***redacted***").finish()
    }
}

/// Encode bytes with the URL-safe base64 alphabet, without padding.
pub fn base64url_encode<B>(bytes: B) -> String
where
    B: AsRef<[u8]>,
{
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe base64 text produced by [`base64url_encode`].
pub fn base64url_decode(value: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(URL_SAFE_NO_PAD.decode(value)?)
}

/// Compute an HMAC of `message` under `key` with the chosen hash function.
pub fn hmac_digest(
    algorithm: HashAlgorithm,
    key: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match algorithm {
        HashAlgorithm::Sha1 => keyed_digest::<HmacSha1>(key, message),
        HashAlgorithm::Sha256 => keyed_digest::<HmacSha256>(key, message),
        HashAlgorithm::Sha384 => keyed_digest::<HmacSha384>(key, message),
        HashAlgorithm::Sha512 => keyed_digest::<HmacSha512>(key, message),
    }
}

/// HMAC-SHA256 of `message` under `key`.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    keyed_digest::<HmacSha256>(key, message)
}

/// Same as [`hmac_digest`], rendered as lowercase hex.
pub fn hmac_hex(
    algorithm: HashAlgorithm,
    key: &[u8],
    message: &[u8],
) -> Result<String, CryptoError> {
    hmac_digest(algorithm, key, message).map(hex::encode)
}

/// Byte comparison whose running time does not depend on where the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).unwrap_u8() == 1
}

fn keyed_digest<M>(key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidMacKey)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
