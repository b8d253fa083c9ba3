use std::fmt;

/// Terminal outcomes of a stats request. Every variant is surfaced to the
/// caller; nothing is retried.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    InvalidColumnName,
    InvalidSeparator,
    MissingFile,
    InvalidFileFormat,
    MissingRequiredColumns,
    ColumnNotFound(String),
    ParseError(String),
    Internal(String),
    /// Raised by the transport layer before the upload reaches parsing
    PayloadTooLarge(usize),
}

impl AppError {
    /// Status code reported for this error. The 401-406 range is part of the
    /// public contract and does not follow the usual HTTP meaning.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidColumnName => 401,
            AppError::InvalidSeparator => 402,
            AppError::MissingFile => 403,
            AppError::InvalidFileFormat => 404,
            AppError::MissingRequiredColumns => 405,
            AppError::ColumnNotFound(_) => 406,
            AppError::PayloadTooLarge(_) => 413,
            AppError::ParseError(_) | AppError::Internal(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidColumnName => write!(f, "Column name is not given correctly"),
            AppError::InvalidSeparator => write!(f, "The separator is not given correctly"),
            AppError::MissingFile => write!(f, "No file part in the request"),
            AppError::InvalidFileFormat => {
                write!(f, "Invalid file format. Expected a CSV file")
            }
            AppError::MissingRequiredColumns => write!(
                f,
                "File does not contain one of these columns: 'PID', 'Zeitindex'"
            ),
            AppError::ColumnNotFound(column) => {
                write!(f, "File does not contain the entered column: {}", column)
            }
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::PayloadTooLarge(limit) => {
                write!(f, "Request body exceeds the limit of {} bytes", limit)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        AppError::ParseError(format!("Invalid separator pattern: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
