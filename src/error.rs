use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrateError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Column '{0}' does not exist in the table")]
    MissingColumn(String),

    #[error("Unknown column requested: {0}")]
    UnknownColumn(String),

    #[error("Row {row} has {found} cells, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid column selection: {0}")]
    InvalidColumnSelection(String),

    #[error("Invalid rename '{0}', expected OLD=NEW")]
    InvalidRename(String),

    #[error("Expected a binomial name (genus and species), got '{0}'")]
    InvalidBinomial(String),

    #[error("API request error: {0}")]
    ApiRequestError(reqwest::Error),

    #[error("API returned an error status: {status} for {endpoint}")]
    ApiStatusError {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("Failed to decode API JSON response: {0}")]
    ApiJsonDecodeError(reqwest::Error),

    #[error("Unexpected API response format: {0}")]
    ApiResponseFormatError(String),
}

pub type Result<T> = std::result::Result<T, CrateError>;
