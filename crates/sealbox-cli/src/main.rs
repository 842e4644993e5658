//! sealbox: password-based file encryption CLI
//!
//! Commands:
//!   encrypt <file>...   - seal files into password envelopes (JSON or blob)
//!   decrypt <file>...   - open envelopes back into the original bytes
//!   inspect <file>      - show the public fields of an envelope
//!   config show         - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use zeroize::Zeroizing;

use sealbox_core::config::SealboxConfig;
use sealbox_core::types::{decrypted_output_path, encrypted_output_path, EnvelopeFormat};
use sealbox_crypto::{codec, task, Envelope};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealbox",
    version,
    about = "Password-based file encryption",
    long_about = "sealbox: encrypt files with a password (PBKDF2-HMAC-SHA256 + AES-256-GCM) \
                  into self-contained envelopes, and decrypt them again"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "SEALBOX_CONFIG",
        default_value = "~/.config/sealbox/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(long, env = "SEALBOX_LOG")]
    log: Option<String>,

    /// Log format; overrides config
    #[arg(long, env = "SEALBOX_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt one or more files with a password
    ///
    /// The password is read from SEALBOX_PASSWORD if set, otherwise prompted
    /// for (twice). Files are encrypted concurrently.
    Encrypt {
        /// Files to encrypt
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output path (single input only; default: <file><suffix>)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Envelope format: json or blob (default: from config)
        #[arg(long, short = 'f')]
        format: Option<EnvelopeFormat>,
        /// Overwrite existing output files
        #[arg(long)]
        force: bool,
    },

    /// Decrypt one or more envelopes with a password
    Decrypt {
        /// Envelope files to decrypt
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output path (single input only; default: strip suffix or append .decrypted)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Envelope format (default: detect)
        #[arg(long, short = 'f')]
        format: Option<EnvelopeFormat>,
        /// Overwrite existing output files
        #[arg(long)]
        force: bool,
    },

    /// Show the public fields of an envelope (salt, nonce, sizes)
    Inspect {
        /// Envelope file
        file: PathBuf,
        /// Envelope format (default: detect)
        #[arg(long, short = 'f')]
        format: Option<EnvelopeFormat>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = SealboxConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "sealbox starting"
    );
    check_config_mode(&config, &config_path);

    match cli.command {
        Commands::Encrypt { files, output, format, force } => {
            let format = format.unwrap_or(config.envelope.format);
            cmd_encrypt(&config, &files, output.as_deref(), format, force).await
        }
        Commands::Decrypt { files, output, format, force } => {
            cmd_decrypt(&config, &files, output.as_deref(), format, force).await
        }
        Commands::Inspect { file, format } => cmd_inspect(&file, format).await,
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

fn check_config_mode(config: &SealboxConfig, path: &Path) {
    if !config.config_file_mode_check || !path.exists() {
        return;
    }
    match sealbox_core::config::is_world_writable(path) {
        Ok(true) => tracing::warn!(
            "config file {} is writable by other users, who can change output format and naming",
            path.display()
        ),
        Ok(false) => {}
        Err(e) => tracing::debug!("could not stat config file {}: {e}", path.display()),
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is for command output; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Password input ────────────────────────────────────────────────────────────

const PASSWORD_ENV: &str = "SEALBOX_PASSWORD";

/// Read the password from SEALBOX_PASSWORD or the terminal.
fn read_password(confirm: bool) -> Result<SecretString> {
    if let Ok(value) = std::env::var(PASSWORD_ENV) {
        let value = Zeroizing::new(value);
        anyhow::ensure!(!value.is_empty(), "{PASSWORD_ENV} is set but empty");
        return Ok(SecretString::from(value.as_str()));
    }

    let first = Zeroizing::new(rpassword::prompt_password("Password: ").context("reading password")?);
    anyhow::ensure!(!first.is_empty(), "password must not be empty");

    if confirm {
        let second = Zeroizing::new(
            rpassword::prompt_password("Confirm password: ").context("reading password")?,
        );
        anyhow::ensure!(*first == *second, "passwords do not match");
    }

    Ok(SecretString::from(first.as_str()))
}

/// Independent copy for a concurrent task; each copy is zeroized on drop.
fn copy_secret(password: &SecretString) -> SecretString {
    SecretString::from(password.expose_secret())
}

// ── File helpers ──────────────────────────────────────────────────────────────

/// Resolve output paths, rejecting `-o` with several inputs and existing targets.
///
/// Every output must be distinct and must not be any of the inputs, since the
/// files are processed concurrently.
fn plan_outputs(
    files: &[PathBuf],
    output: Option<&Path>,
    force: bool,
    default_for: impl Fn(&Path) -> PathBuf,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    if output.is_some() && files.len() > 1 {
        anyhow::bail!("--output can only be used with a single input file");
    }

    let inputs: HashSet<&Path> = files.iter().map(PathBuf::as_path).collect();
    if inputs.len() != files.len() {
        anyhow::bail!("the same input file was given more than once");
    }

    let mut outputs = HashSet::with_capacity(files.len());
    let mut plan = Vec::with_capacity(files.len());
    for input in files {
        let out = output.map(Path::to_path_buf).unwrap_or_else(|| default_for(input));
        if inputs.contains(out.as_path()) {
            anyhow::bail!("output would overwrite an input: {}", out.display());
        }
        if !outputs.insert(out.clone()) {
            anyhow::bail!("two inputs map to the same output: {}", out.display());
        }
        if !force && out.exists() {
            anyhow::bail!(
                "output exists: {} (use --force to overwrite)",
                out.display()
            );
        }
        plan.push((input.clone(), out));
    }
    Ok(plan)
}

/// Permissions for decrypted plaintext
const PLAINTEXT_MODE: u32 = 0o600;
/// Permissions for envelopes (before umask)
const ENVELOPE_MODE: u32 = 0o644;

/// Write via a sibling temp file + rename so a failed run leaves no partial output.
///
/// `mode` applies on Unix when the temp file is created; rename keeps it.
async fn write_atomic(path: &Path, data: &[u8], mode: u32) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".sealbox-tmp");
    let tmp = PathBuf::from(tmp);

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(&tmp)
        .await
        .with_context(|| format!("creating {}", tmp.display()))?;

    let written = async {
        file.write_all(data).await?;
        file.flush().await
    }
    .await;
    drop(file);

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("writing {}", tmp.display()));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("renaming into {}", path.display()));
    }
    Ok(())
}

fn parse_envelope(bytes: &[u8], format: Option<EnvelopeFormat>) -> Result<(EnvelopeFormat, Envelope)> {
    let format = format.unwrap_or_else(|| EnvelopeFormat::detect(bytes));
    let envelope = match format {
        EnvelopeFormat::Json => {
            let text = std::str::from_utf8(bytes).context("JSON envelope is not UTF-8")?;
            Envelope::from_json(text)?
        }
        EnvelopeFormat::Blob => Envelope::from_bytes(bytes)?,
    };
    Ok((format, envelope))
}

fn render_envelope(envelope: &Envelope, format: EnvelopeFormat) -> Result<Vec<u8>> {
    Ok(match format {
        EnvelopeFormat::Json => {
            let mut json = envelope.to_json()?;
            json.push('\n');
            json.into_bytes()
        }
        EnvelopeFormat::Blob => envelope.to_bytes(),
    })
}

/// Print per-file failures and turn them into one error.
fn report_failures(verb: &str, failures: Vec<(PathBuf, anyhow::Error)>, total: usize) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    for (path, err) in &failures {
        eprintln!("  {} failed: {}: {err:#}", verb, path.display());
    }
    anyhow::bail!("{} of {} file(s) failed to {}", failures.len(), total, verb)
}

// ── `sealbox encrypt` ─────────────────────────────────────────────────────────

async fn cmd_encrypt(
    config: &SealboxConfig,
    files: &[PathBuf],
    output: Option<&Path>,
    format: EnvelopeFormat,
    force: bool,
) -> Result<()> {
    let suffix = config.envelope.suffix.clone();
    let plan = plan_outputs(files, output, force, |p| encrypted_output_path(p, &suffix))?;
    let password = read_password(true)?;

    let mut set = JoinSet::new();
    for (input, out) in plan {
        let password = copy_secret(&password);
        set.spawn(async move {
            let result = encrypt_one(&input, &out, password, format).await;
            (input, out, result)
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (input, out, result) = joined.context("encrypt task panicked")?;
        match result {
            Ok(bytes) => {
                tracing::info!(file = %input.display(), format = %format, "encrypted");
                println!("{} → {} ({})", input.display(), out.display(), fmt_bytes(bytes));
            }
            Err(e) => failures.push((input, e)),
        }
    }

    report_failures("encrypt", failures, files.len())
}

async fn encrypt_one(
    input: &Path,
    out: &Path,
    password: SecretString,
    format: EnvelopeFormat,
) -> Result<u64> {
    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let size = data.len() as u64;

    let envelope = task::seal(data, password).await?;
    write_atomic(out, &render_envelope(&envelope, format)?, ENVELOPE_MODE).await?;
    Ok(size)
}

// ── `sealbox decrypt` ─────────────────────────────────────────────────────────

async fn cmd_decrypt(
    config: &SealboxConfig,
    files: &[PathBuf],
    output: Option<&Path>,
    format: Option<EnvelopeFormat>,
    force: bool,
) -> Result<()> {
    let suffix = config.envelope.suffix.clone();
    let plan = plan_outputs(files, output, force, |p| decrypted_output_path(p, &suffix))?;
    let password = read_password(false)?;

    let mut set = JoinSet::new();
    for (input, out) in plan {
        let password = copy_secret(&password);
        set.spawn(async move {
            let result = decrypt_one(&input, &out, password, format).await;
            (input, out, result)
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (input, out, result) = joined.context("decrypt task panicked")?;
        match result {
            Ok(bytes) => {
                tracing::info!(file = %input.display(), "decrypted");
                println!("{} → {} ({})", input.display(), out.display(), fmt_bytes(bytes));
            }
            Err(e) => {
                tracing::warn!(file = %input.display(), "decrypt failed");
                failures.push((input, e));
            }
        }
    }

    report_failures("decrypt", failures, files.len())
}

async fn decrypt_one(
    input: &Path,
    out: &Path,
    password: SecretString,
    format: Option<EnvelopeFormat>,
) -> Result<u64> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("reading {}", input.display()))?;
    let (_, envelope) = parse_envelope(&bytes, format)?;

    let plaintext = Zeroizing::new(task::open(envelope, password).await?);
    write_atomic(out, &plaintext, PLAINTEXT_MODE).await?;
    Ok(plaintext.len() as u64)
}

// ── `sealbox inspect` ─────────────────────────────────────────────────────────

async fn cmd_inspect(file: &Path, format: Option<EnvelopeFormat>) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let (format, envelope) = parse_envelope(&bytes, format)
        .with_context(|| format!("parsing envelope: {}", file.display()))?;

    println!("file:        {}", file.display());
    println!("format:      {format}");
    println!("salt:        {}", codec::encode(&envelope.salt));
    println!("nonce:       {}", codec::encode(&envelope.nonce));
    println!("ciphertext:  {}", fmt_bytes(envelope.ciphertext.len() as u64));
    println!("plaintext:   {}", fmt_bytes(envelope.plaintext_len() as u64));
    Ok(())
}

// ── `sealbox config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &SealboxConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── Formatting ────────────────────────────────────────────────────────────────

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_crypto::{encrypt_file_with_password_with_params, KdfParams};
    use tempfile::TempDir;

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(11), "11 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_plan_outputs_rejects_output_with_many_inputs() {
        let files = vec![PathBuf::from("a"), PathBuf::from("b")];
        let err = plan_outputs(&files, Some(Path::new("x")), false, |p| p.to_path_buf()).unwrap_err();
        assert!(err.to_string().contains("single input"));
    }

    #[test]
    fn test_plan_outputs_refuses_existing_without_force() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("doc.txt");
        let existing = tmp.path().join("doc.txt.encrypted");
        std::fs::write(&existing, b"old").unwrap();

        let files = vec![input.clone()];
        let default = |p: &Path| encrypted_output_path(p, ".encrypted");
        assert!(plan_outputs(&files, None, false, default).is_err());

        let plan = plan_outputs(&files, None, true, default).unwrap();
        assert_eq!(plan, vec![(input, existing)]);
    }

    #[test]
    fn test_plan_outputs_rejects_output_that_is_another_input() {
        let files = vec![PathBuf::from("a"), PathBuf::from("a.encrypted")];
        let default = |p: &Path| encrypted_output_path(p, ".encrypted");

        let err = plan_outputs(&files, None, true, default).unwrap_err();
        assert!(err.to_string().contains("overwrite an input"), "got {err:#}");
    }

    #[test]
    fn test_plan_outputs_rejects_duplicate_inputs() {
        let files = vec![PathBuf::from("a"), PathBuf::from("a")];
        let default = |p: &Path| encrypted_output_path(p, ".encrypted");

        assert!(plan_outputs(&files, None, true, default).is_err());
    }

    #[test]
    fn test_plan_outputs_rejects_colliding_outputs() {
        // Dropping the directory sends both inputs to "doc"
        let files = vec![PathBuf::from("x/doc.encrypted"), PathBuf::from("y/doc.encrypted")];
        let flatten = |p: &Path| PathBuf::from(p.file_name().unwrap()).with_extension("");

        let err = plan_outputs(&files, None, true, flatten).unwrap_err();
        assert!(err.to_string().contains("same output"), "got {err:#}");
    }

    #[test]
    fn test_parse_envelope_detects_both_formats() {
        let env = encrypt_file_with_password_with_params(
            b"abc",
            &SecretString::from("pw"),
            &KdfParams { iterations: 1_000 },
        )
        .unwrap();

        for format in [EnvelopeFormat::Json, EnvelopeFormat::Blob] {
            let rendered = render_envelope(&env, format).unwrap();
            let (detected, parsed) = parse_envelope(&rendered, None).unwrap();
            assert_eq!(detected, format);
            assert_eq!(parsed, env);
        }
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out.bin");

        write_atomic(&out, b"payload", ENVELOPE_MODE).await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"payload");
        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_write_atomic_removes_temp_file_when_write_fails() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("secret.txt");
        let staging = tmp.path().join("secret.txt.sealbox-tmp");
        // Every write to /dev/full fails with ENOSPC
        std::os::unix::fs::symlink("/dev/full", &staging).unwrap();

        let err = write_atomic(&out, &[7u8; 64 * 1024], PLAINTEXT_MODE)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("writing"), "got {err:#}");
        assert!(!out.exists());
        assert!(
            std::fs::symlink_metadata(&staging).is_err(),
            "temp file must be removed after a failed write"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_atomic_plaintext_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("plain.txt");

        write_atomic(&out, b"private", PLAINTEXT_MODE).await.unwrap();

        let mode = std::fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_encrypt_then_decrypt_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("note.txt");
        let sealed = tmp.path().join("note.txt.encrypted");
        let opened = tmp.path().join("note.txt");
        std::fs::write(&input, b"hello world").unwrap();

        encrypt_one(&input, &sealed, SecretString::from("correct-horse"), EnvelopeFormat::Json)
            .await
            .unwrap();
        std::fs::remove_file(&input).unwrap();

        let err = decrypt_one(&sealed, &opened, SecretString::from("wrong"), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("incorrect password or corrupted data"));
        assert!(!opened.exists(), "failed decrypt must not create output");

        let n = decrypt_one(&sealed, &opened, SecretString::from("correct-horse"), None)
            .await
            .unwrap();
        assert_eq!(n, 11);
        assert_eq!(std::fs::read(&opened).unwrap(), b"hello world");
    }

    #[test]
    fn test_expand_tilde() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(
            expand_tilde(Path::new("~/.config/sealbox/config.toml")),
            PathBuf::from(home).join(".config/sealbox/config.toml")
        );
        assert_eq!(expand_tilde(Path::new("/etc/x")), PathBuf::from("/etc/x"));
    }
}
