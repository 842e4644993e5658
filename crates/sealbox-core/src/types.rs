use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SealboxError;

/// Suffix appended when a decrypted file has no recognisable encrypted suffix
pub const DECRYPTED_SUFFIX: &str = ".decrypted";

/// On-disk / on-wire representation of an envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    /// `{"salt": .., "nonce": .., "ciphertext": ..}` with base64 fields
    #[default]
    Json,
    /// `[16 salt][12 nonce][ciphertext + tag]`
    Blob,
}

impl EnvelopeFormat {
    /// Guess the format of stored envelope bytes.
    ///
    /// JSON only if the whole input is UTF-8 and, trimmed, is a `{...}` object.
    /// A random blob passing that test is not a practical concern.
    pub fn detect(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                let text = text.trim();
                if text.starts_with('{') && text.ends_with('}') {
                    Self::Json
                } else {
                    Self::Blob
                }
            }
            Err(_) => Self::Blob,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Blob => "blob",
        }
    }
}

impl std::fmt::Display for EnvelopeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvelopeFormat {
    type Err = SealboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "blob" | "bin" | "binary" => Ok(Self::Blob),
            other => Err(SealboxError::Format(format!(
                "unknown envelope format '{other}' (expected json or blob)"
            ))),
        }
    }
}

/// Default output path for an encrypted file: `<input><suffix>`.
pub fn encrypted_output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = input.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Default output path for a decrypted file.
///
/// Strips `suffix` when the file name ends with it (and something remains),
/// otherwise appends [`DECRYPTED_SUFFIX`].
pub fn decrypted_output_path(input: &Path, suffix: &str) -> PathBuf {
    if let Some(name) = input.file_name().and_then(|n| n.to_str()) {
        if !suffix.is_empty() {
            if let Some(stem) = name.strip_suffix(suffix) {
                if !stem.is_empty() {
                    return input.with_file_name(stem);
                }
            }
        }
    }
    encrypted_output_path(input, DECRYPTED_SUFFIX)
}
