//! File-level failures surfaced by the ingestion pipeline.
//!
//! Row-level problems never become an [`IngestError`]; they are collected as
//! [`crate::model::RowError`] values on the result instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("empty file")]
    EmptyFile,

    #[error("no data rows after header")]
    NoDataRows,

    #[error("failed to decode input as {encoding}")]
    Decode { encoding: &'static str },

    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// True for the "nothing to ingest" outcomes, as opposed to unreadable input.
    pub fn is_empty_input(&self) -> bool {
        matches!(self, IngestError::EmptyFile | IngestError::NoDataRows)
    }
}
