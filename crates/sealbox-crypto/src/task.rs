//! Async wrappers: run seal/open on tokio's blocking pool
//!
//! PBKDF2 at the default work factor takes tens of milliseconds of pure CPU, so
//! calling it directly from an async task would stall the executor. These
//! wrappers own their inputs, share nothing between calls, and can run
//! concurrently without coordination. Dropping the returned future does not stop
//! the computation; its result is simply discarded.

use secrecy::SecretString;

use crate::envelope::Envelope;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KdfParams;

/// Encrypt `data` under `password` on the blocking pool.
pub async fn seal(data: Vec<u8>, password: SecretString) -> CryptoResult<Envelope> {
    seal_with_params(data, password, KdfParams::default()).await
}

/// [`seal`] with an explicit work factor.
pub async fn seal_with_params(
    data: Vec<u8>,
    password: SecretString,
    params: KdfParams,
) -> CryptoResult<Envelope> {
    tokio::task::spawn_blocking(move || {
        crate::envelope::encrypt_file_with_password_with_params(&data, &password, &params)
    })
    .await
    .map_err(|e| CryptoError::Encryption(format!("seal task failed: {e}")))?
}

/// Verify and decrypt `envelope` on the blocking pool.
pub async fn open(envelope: Envelope, password: SecretString) -> CryptoResult<Vec<u8>> {
    open_with_params(envelope, password, KdfParams::default()).await
}

/// [`open`] with an explicit work factor.
pub async fn open_with_params(
    envelope: Envelope,
    password: SecretString,
    params: KdfParams,
) -> CryptoResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || envelope.open_with_params(&password, &params))
        .await
        .map_err(|e| CryptoError::Encryption(format!("open task failed: {e}")))?
}
