use thiserror::Error;

/// Failures reported by a record store backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Operation not supported by backend: {0}")]
    Unsupported(String),

    #[error("Malformed backend response: {0}")]
    Malformed(String),
}

/// Errors surfaced to callers of the storefront core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Like toggle already in flight for item {0}")]
    ToggleInFlight(u64),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        CoreError::Persistence(e.to_string())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Persistence(format!("local store: {}", e))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
