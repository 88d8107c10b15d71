// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid flag name: {0:?}")]
    InvalidFlag(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
