//! Security specific errors for the Citadel sanitizer audit.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Invalid security configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unknown policy preset: {name}")]
    UnknownPreset { name: String },
}

pub type SecurityResult<T> = Result<T, SecurityError>;
