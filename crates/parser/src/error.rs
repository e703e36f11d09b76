use std::fmt;
use std::error::Error;
use url::ParseError as UrlParseError;

/// Error types for the parser
#[derive(Debug)]
pub enum ParserError {
    /// HTML parsing error
    HtmlParseError(String),
    /// Input exceeds the configured size limit
    InputTooLarge { len: usize, limit: usize },
    /// URL parsing error
    InvalidUrl(UrlParseError),
    /// Allow-list rejected by the sanitizer
    InvalidAllowPolicy(String),
    /// IO Error
    IoError(String),
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::HtmlParseError(msg) => write!(f, "HTML parse error: {}", msg),
            ParserError::InputTooLarge { len, limit } => {
                write!(f, "Input too large: {} bytes (limit {})", len, limit)
            }
            ParserError::InvalidUrl(e) => write!(f, "Invalid URL: {}", e),
            ParserError::InvalidAllowPolicy(msg) => write!(f, "Invalid allow policy: {}", msg),
            ParserError::IoError(msg) => write!(f, "IO Error: {}", msg),
        }
    }
}

impl Error for ParserError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParserError::InvalidUrl(e) => Some(e),
            _ => None,
        }
    }
}

impl From<UrlParseError> for ParserError {
    fn from(e: UrlParseError) -> Self {
        ParserError::InvalidUrl(e)
    }
}

/// Result type for parser operations
pub type ParserResult<T> = Result<T, ParserError>;
