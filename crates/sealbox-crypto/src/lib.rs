//! sealbox-crypto: password-based encryption of whole file payloads
//!
//! Pipeline: password + random salt → PBKDF2-HMAC-SHA256 → AES-256-GCM (random nonce) → envelope
//!
//! Envelope layout:
//! ```text
//! JSON:  { "salt": b64(16 bytes), "nonce": b64(12 bytes), "ciphertext": b64(N + 16 bytes) }
//! Blob:  [16 bytes salt][12 bytes nonce][N bytes ciphertext][16 bytes GCM tag]
//! ```
//!
//! The salt and nonce are public and travel with the ciphertext. The derived key
//! never leaves this crate (unless the `key-export` feature is enabled) and is
//! zeroized as soon as the operation that needed it returns.

pub mod aead;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod task;

pub use aead::{decrypt, encrypt, generate_nonce};
pub use envelope::{
    decrypt_file_with_password, decrypt_file_with_password_with_params,
    encrypt_file_with_password, encrypt_file_with_password_with_params, Envelope,
};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive_key, derive_key_with_params, generate_salt, DerivedKey, KdfParams};

/// Size of a derived key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a PBKDF2 salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 work factor
pub const PBKDF2_ITERATIONS: u32 = 100_000;
