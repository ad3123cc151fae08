pub mod claims;
pub mod codec;
pub mod config;
pub mod error;

pub use claims::{build_payload, Claims};
pub use codec::{
    decode_header, decode_payload, encode_segment, split, Header, TokenCodec, TokenParts,
    TOKEN_ALGORITHM, TOKEN_TYPE,
};
pub use config::{ClaimDefaults, TokenConfig, DEFAULT_EXPIRES_IN_SECONDS, DEFAULT_ISSUER};
pub use error::{AuthError, AuthResult};
