use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShellError {
    #[error("client storage is unavailable")]
    StorageUnavailable,

    #[error("storage access failed: {0}")]
    Storage(String),

    #[error("required element missing: {0}")]
    MissingElement(&'static str),

    #[error("failed to create <{0}> element")]
    CreateElement(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("dom operation failed: {0}")]
    Dom(String),
}

impl From<url::ParseError> for ShellError {
    fn from(err: url::ParseError) -> Self {
        ShellError::InvalidUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
