//! Key derivation: PBKDF2-HMAC-SHA256 password → AES-256 key

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::codec::to_array;
use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// A 256-bit AES-GCM key derived from a password.
///
/// Only usable for the encrypt/decrypt operations in [`crate::aead`]. The raw
/// bytes stay inside this crate unless the `key-export` feature is enabled.
/// Zeroized on drop.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Copy the raw key bytes out. The copy is zeroized when dropped.
    #[cfg(feature = "key-export")]
    pub fn export(&self) -> zeroize::Zeroizing<[u8; KEY_SIZE]> {
        zeroize::Zeroizing::new(self.bytes)
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2 parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// HMAC-SHA256 iteration count (default: 100 000)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

/// Generate a fresh random salt from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive a key from `password` using the default work factor.
///
/// With `salt = None` a new random salt is generated; otherwise the given salt
/// must be exactly 16 bytes. The salt actually used is returned next to the key
/// so it can be stored in the envelope.
pub fn derive_key(
    password: &SecretString,
    salt: Option<&[u8]>,
) -> CryptoResult<(DerivedKey, [u8; SALT_SIZE])> {
    derive_key_with_params(password, salt, &KdfParams::default())
}

/// [`derive_key`] with an explicit work factor.
pub fn derive_key_with_params(
    password: &SecretString,
    salt: Option<&[u8]>,
    params: &KdfParams,
) -> CryptoResult<(DerivedKey, [u8; SALT_SIZE])> {
    let password = password.expose_secret();
    if password.is_empty() {
        return Err(CryptoError::invalid("password must not be empty"));
    }

    let salt: [u8; SALT_SIZE] = match salt {
        Some(bytes) => to_array("salt", bytes)?,
        None => generate_salt(),
    };

    if params.iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "PBKDF2 iteration count must be non-zero".into(),
        ));
    }

    let mut key = DerivedKey {
        bytes: [0u8; KEY_SIZE],
    };
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, params.iterations, &mut key.bytes);

    Ok((key, salt))
}
