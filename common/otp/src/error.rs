use common_crypto::{ConfigError, CryptoError};
use thiserror::Error;

pub type OtpResult<T> = Result<T, OtpError>;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("invalid step code config: {0}")]
    Config(#[from] ConfigError),
    #[error("system clock is before the unix epoch: {0}")]
    Clock(String),
    #[error("keyed hash failed: {0}")]
    Hash(#[from] CryptoError),
    #[error("digest suffix '{0}' is not hexadecimal")]
    InvalidDigest(String),
}
