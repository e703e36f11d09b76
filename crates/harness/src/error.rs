use citadel_parser::ParserError;
use citadel_security::SecurityError;
use thiserror::Error;

/// Errors raised while configuring or running an audit
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Invalid or unreadable harness configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors while reading payloads or writing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parser, sanitizer or input-size errors
    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    /// Classifier policy errors
    #[error("Security policy error: {0}")]
    Security(#[from] SecurityError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// True if the error came out of parsing or cleaning the input itself
    pub fn is_parser_failure(&self) -> bool {
        matches!(self, HarnessError::Parser(_))
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
