use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Failure categories for every crypto operation.
///
/// `DecryptionAuth` carries no detail on purpose: wrong password, wrong salt,
/// wrong nonce and tampered bytes all look the same to the caller.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("incorrect password or corrupted data")]
    DecryptionAuth,
}

impl CryptoError {
    /// Stable category name, safe to put in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::KeyDerivation(_) => "key_derivation",
            Self::Encryption(_) => "encryption",
            Self::DecryptionAuth => "decryption_auth",
        }
    }

    /// True for the recoverable "wrong password / corrupted data" case.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::DecryptionAuth)
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
