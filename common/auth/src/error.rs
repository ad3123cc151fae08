use common_crypto::{ConfigError, CryptoError};
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token codec config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to encode token segment: {0}")]
    Encoding(String),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),
    #[error("malformed claim payload: {0}")]
    InvalidJson(String),
    #[error("token signature mismatch")]
    SignatureMismatch,
    #[error("signing failed: {0}")]
    Signing(#[from] CryptoError),
}

impl AuthError {
    /// True for failures caused by the presented token rather than by the codec.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::MalformedToken(_) | AuthError::InvalidJson(_) | AuthError::SignatureMismatch
        )
    }
}
