use thiserror::Error;

pub type SealboxResult<T> = Result<T, SealboxError>;

#[derive(Debug, Error)]
pub enum SealboxError {
    #[error("config error: {0}")]
    Config(String),

    #[error("envelope format error: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
