//! Import module
//!
//! Turns an uploaded file into raw roster records.

mod delimited;
mod record;
mod workbook;

use std::path::Path;

use tracing::{debug, info};

use crate::{Error, Result};

pub use record::{RosterRecord, EMAIL_COLUMN, PASSWORD_COLUMN};

/// Tabular formats accepted for roster uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Determine the format from a file name's extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(Error::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// An uploaded file held in memory
#[derive(Debug, Clone)]
pub struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an upload from disk.
    ///
    /// The extension is checked before the file is read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        FileFormat::from_file_name(&file_name)?;

        let bytes = tokio::fs::read(path).await.map_err(Error::file_read)?;
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> Result<FileFormat> {
        FileFormat::from_file_name(&self.file_name)
    }

    /// Parse the upload into raw records, in file order
    pub fn extract(&self) -> Result<Vec<RosterRecord>> {
        let format = self.format()?;
        debug!(file = %self.file_name, ?format, bytes = self.bytes.len(), "Extracting roster rows");

        let records = match format {
            FileFormat::Csv => delimited::read_records(&self.bytes)?,
            FileFormat::Xlsx => workbook::read_records(&self.bytes)?,
        };

        info!(file = %self.file_name, rows = records.len(), "Extracted roster rows");
        Ok(records)
    }
}
