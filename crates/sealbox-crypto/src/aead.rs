//! AES-256-GCM encryption/decryption
//!
//! Ciphertext format (binary):
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! No associated data is bound. The nonce is supplied by the caller and must
//! never repeat under the same key; [`generate_nonce`] draws a fresh one.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::DerivedKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Generate a fresh random 96-bit nonce from the OS CSPRNG.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

fn cipher(key: &DerivedKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn check_nonce(nonce: &[u8]) -> CryptoResult<()> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::invalid(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    Ok(())
}

/// Encrypt `plaintext` under `key` and a 12-byte `nonce`.
///
/// Returns `plaintext.len() + 16` bytes: ciphertext followed by the GCM tag.
pub fn encrypt(plaintext: &[u8], key: &DerivedKey, nonce: &[u8]) -> CryptoResult<Vec<u8>> {
    check_nonce(nonce)?;

    cipher(key)
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AES-256-GCM: {e}")))
}

/// Verify and decrypt `ciphertext` (including its trailing tag).
///
/// Any verification failure, including input too short to hold a tag, is
/// reported as [`CryptoError::DecryptionAuth`]. Nothing is returned unless the
/// tag checks out.
pub fn decrypt(ciphertext: &[u8], key: &DerivedKey, nonce: &[u8]) -> CryptoResult<Vec<u8>> {
    check_nonce(nonce)?;

    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::DecryptionAuth);
    }

    cipher(key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionAuth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{derive_key_with_params, KdfParams};
    use secrecy::SecretString;

    fn test_key(password: &str) -> DerivedKey {
        let params = KdfParams { iterations: 1_000 };
        derive_key_with_params(&SecretString::from(password), Some(&[9u8; 16]), &params)
            .unwrap()
            .0
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key("k");
        let nonce = generate_nonce();
        let plaintext = b"hello, encrypted world!";

        let ciphertext = encrypt(plaintext, &key, &nonce).unwrap();
        let decrypted = decrypt(&ciphertext, &key, &nonce).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_ciphertext_size() {
        let key = test_key("k");
        let nonce = generate_nonce();

        for len in [0usize, 1, 15, 16, 17, 1000] {
            let ciphertext = encrypt(&vec![0u8; len], &key, &nonce).unwrap();
            assert_eq!(ciphertext.len(), len + TAG_SIZE);
        }
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let nonce = generate_nonce();
        let ciphertext = encrypt(b"secret data", &test_key("a"), &nonce).unwrap();

        let err = decrypt(&ciphertext, &test_key("b"), &nonce).unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_decrypt_wrong_nonce() {
        let key = test_key("k");
        let ciphertext = encrypt(b"secret data", &key, &[1u8; NONCE_SIZE]).unwrap();

        let err = decrypt(&ciphertext, &key, &[2u8; NONCE_SIZE]).unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[test]
    fn test_tampered_tag() {
        let key = test_key("k");
        let nonce = generate_nonce();
        let mut ciphertext = encrypt(b"secret data", &key, &nonce).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        assert!(decrypt(&ciphertext, &key, &nonce).unwrap_err().is_auth_failure());
    }

    #[test]
    fn test_truncated_ciphertext() {
        let key = test_key("k");
        let nonce = generate_nonce();

        for len in [0usize, 1, TAG_SIZE - 1] {
            let err = decrypt(&vec![0u8; len], &key, &nonce).unwrap_err();
            assert!(err.is_auth_failure(), "{len}-byte input must fail authentication");
        }
    }

    #[test]
    fn test_bad_nonce_length() {
        let key = test_key("k");

        let err = encrypt(b"x", &key, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidInput(_)));

        let err = decrypt(&[0u8; 32], &key, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidInput(_)));
    }

    #[test]
    fn test_nonces_are_fresh() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
