pub mod config;
pub mod error;
pub mod step;

pub use common_crypto::HashAlgorithm;
pub use config::{StepCodeConfig, DEFAULT_FACTOR_SECONDS, DEFAULT_HEX_LENGTH, MAX_HEX_LENGTH};
pub use error::{OtpError, OtpResult};
pub use step::{StepCode, MIN_CODE_LENGTH};
