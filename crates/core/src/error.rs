//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Upload extension is neither `.csv` nor `.xlsx`
    #[error("Unsupported file format: {0}. Please upload a .csv or .xlsx file")]
    UnsupportedFormat(String),

    /// Spreadsheet header row has no email column
    #[error("Missing column: the first row must contain an '{0}' header")]
    MissingColumn(String),

    /// File could not be read or decoded
    #[error("Failed to read file: {0}")]
    FileRead(String),

    /// Every row was dropped during validation
    #[error("No valid rows found in the uploaded file ({checked} checked)")]
    NoValidRows { checked: usize },

    /// A single typed-in value failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a FileRead error from any displayable cause
    pub fn file_read(cause: impl std::fmt::Display) -> Self {
        Self::FileRead(cause.to_string())
    }
}
