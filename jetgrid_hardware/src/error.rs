use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("uart error: {0}")]
    Uart(String),
    #[error("device reply timeout")]
    Timeout,
    #[error("device link closed")]
    Closed,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
