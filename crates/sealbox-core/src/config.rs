use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SealboxError, SealboxResult};
use crate::types::EnvelopeFormat;

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SealboxConfig {
    /// Warn if the config file is writable by other users (default: true)
    pub config_file_mode_check: bool,
    pub log: LogConfig,
    pub envelope: EnvelopeConfig,
}

impl SealboxConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> SealboxResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content)
            .map_err(|e| SealboxError::Config(format!("{}: {e}", path.display())))
    }
}

impl Default for SealboxConfig {
    fn default() -> Self {
        Self {
            config_file_mode_check: true,
            log: LogConfig::default(),
            envelope: EnvelopeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// How envelopes are written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Output format for `encrypt` (default: json)
    pub format: EnvelopeFormat,
    /// File name suffix for encrypted output (default: .encrypted)
    pub suffix: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            format: EnvelopeFormat::Json,
            suffix: ".encrypted".into(),
        }
    }
}

/// True if users other than the owner and group can modify `path`.
/// Always false off Unix.
pub fn is_world_writable(path: &Path) -> std::io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(path)?.permissions().mode();
        Ok(mode & 0o002 != 0)
    }
    #[cfg(not(unix))]
    {
        let _ = std::fs::metadata(path)?;
        Ok(false)
    }
}
