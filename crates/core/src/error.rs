use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}
