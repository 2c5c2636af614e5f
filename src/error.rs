use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    ResolutionError(String),
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Calculation was cancelled")]
    Cancelled,
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TaxError {
    /// Errors caused by the caller's input, whose message is safe to show back.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TaxError::ValidationError(_) | TaxError::ResolutionError(_) | TaxError::Cancelled
        )
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for TaxError {
    fn from(e: rocksdb::Error) -> Self {
        TaxError::PersistenceError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TaxError>;
