//! Password envelope: salt + nonce + ciphertext as one transportable unit
//!
//! JSON transport form (each field standard base64):
//! ```text
//! { "salt": "...", "nonce": "...", "ciphertext": "..." }
//! ```
//!
//! Blob form (fixed widths, no version tag):
//! ```text
//! [16 bytes: salt][12 bytes: nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! ```

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::codec::{base64_array, base64_bytes, to_array};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key_with_params, KdfParams};
use crate::{aead, NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// Smallest valid blob: salt + nonce + tag of an empty payload.
pub const MIN_BLOB_SIZE: usize = SALT_SIZE + NONCE_SIZE + TAG_SIZE;

/// The only artifact that leaves the trust boundary.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// PBKDF2 salt
    #[serde(with = "base64_array")]
    pub salt: [u8; SALT_SIZE],
    /// AES-GCM nonce
    #[serde(with = "base64_array")]
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with trailing 16-byte tag
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("salt", &crate::codec::encode(&self.salt))
            .field("nonce", &crate::codec::encode(&self.nonce))
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

impl Envelope {
    /// Seal `data` under `password` with the default work factor.
    pub fn seal(data: &[u8], password: &SecretString) -> CryptoResult<Self> {
        encrypt_file_with_password(data, password)
    }

    /// Verify and decrypt with the default work factor.
    pub fn open(&self, password: &SecretString) -> CryptoResult<Vec<u8>> {
        decrypt_file_with_password(&self.ciphertext, password, &self.salt, &self.nonce)
    }

    /// Verify and decrypt with an explicit work factor.
    pub fn open_with_params(
        &self,
        password: &SecretString,
        params: &KdfParams,
    ) -> CryptoResult<Vec<u8>> {
        decrypt_file_with_password_with_params(
            &self.ciphertext,
            password,
            &self.salt,
            &self.nonce,
            params,
        )
    }

    /// Length of the payload this envelope decrypts to.
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }

    /// Serialize to the three-field JSON form.
    pub fn to_json(&self) -> CryptoResult<String> {
        serde_json::to_string(self)
            .map_err(|e| CryptoError::Encryption(format!("envelope serialization: {e}")))
    }

    /// Parse the three-field JSON form.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CryptoError::invalid(format!("envelope deserialization: {e}")))
    }

    /// Serialize to the fixed-layout blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse the fixed-layout blob.
    pub fn from_bytes(blob: &[u8]) -> CryptoResult<Self> {
        if blob.len() < MIN_BLOB_SIZE {
            return Err(CryptoError::invalid(format!(
                "envelope blob too short: {} bytes (minimum {MIN_BLOB_SIZE})",
                blob.len()
            )));
        }

        let (salt, rest) = blob.split_at(SALT_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        Ok(Self {
            salt: to_array("salt", salt)?,
            nonce: to_array("nonce", nonce)?,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypt `data` under `password`.
///
/// Draws a fresh nonce and a fresh salt, derives the key, encrypts, and drops
/// (zeroizes) the key before returning.
pub fn encrypt_file_with_password(data: &[u8], password: &SecretString) -> CryptoResult<Envelope> {
    encrypt_file_with_password_with_params(data, password, &KdfParams::default())
}

/// [`encrypt_file_with_password`] with an explicit work factor.
pub fn encrypt_file_with_password_with_params(
    data: &[u8],
    password: &SecretString,
    params: &KdfParams,
) -> CryptoResult<Envelope> {
    let result = seal_inner(data, password, params);
    match &result {
        Ok(env) => tracing::debug!(
            plaintext_len = data.len(),
            ciphertext_len = env.ciphertext.len(),
            "envelope sealed"
        ),
        Err(e) => tracing::debug!(error = e.kind(), "envelope seal failed"),
    }
    result
}

fn seal_inner(data: &[u8], password: &SecretString, params: &KdfParams) -> CryptoResult<Envelope> {
    let nonce = aead::generate_nonce();
    let (key, salt) = derive_key_with_params(password, None, params)?;
    let ciphertext = aead::encrypt(data, &key, &nonce)?;

    Ok(Envelope {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt `ciphertext` with the key re-derived from `password` and `salt`.
///
/// Fails with [`CryptoError::InvalidInput`] for a bad password, salt or nonce
/// shape, and with [`CryptoError::DecryptionAuth`] when verification fails.
pub fn decrypt_file_with_password(
    ciphertext: &[u8],
    password: &SecretString,
    salt: &[u8],
    nonce: &[u8],
) -> CryptoResult<Vec<u8>> {
    decrypt_file_with_password_with_params(ciphertext, password, salt, nonce, &KdfParams::default())
}

/// [`decrypt_file_with_password`] with an explicit work factor.
pub fn decrypt_file_with_password_with_params(
    ciphertext: &[u8],
    password: &SecretString,
    salt: &[u8],
    nonce: &[u8],
    params: &KdfParams,
) -> CryptoResult<Vec<u8>> {
    let result = open_inner(ciphertext, password, salt, nonce, params);
    match &result {
        Ok(plaintext) => tracing::debug!(plaintext_len = plaintext.len(), "envelope opened"),
        Err(e) => tracing::debug!(error = e.kind(), "envelope open failed"),
    }
    result
}

fn open_inner(
    ciphertext: &[u8],
    password: &SecretString,
    salt: &[u8],
    nonce: &[u8],
    params: &KdfParams,
) -> CryptoResult<Vec<u8>> {
    // Shape checks first so no PBKDF2 work is spent on malformed input
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::invalid(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    let (key, _) = derive_key_with_params(password, Some(salt), params)?;
    aead::decrypt(ciphertext, &key, nonce)
}
