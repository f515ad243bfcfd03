//! Custom error types for export operations

use std::fmt;
use std::io;

use crate::coordinate::BoundingBox;

/// Export-specific error types
///
/// Every stage of an export maps its failures onto one of these kinds.
/// All of them abort the current export operation; there is no partial
/// success mode.
#[derive(Debug)]
pub enum ExportError {
    /// Service metadata is missing or unusable (no resolvable reference system)
    Configuration(String),
    /// Requested area does not intersect the service's declared coverage
    OutOfExtent(BoundingBox),
    /// Network failure, timeout, or non-success response
    Transport(String),
    /// Mosaic or raster encoding failure
    Encoding(String),
    /// Malformed caller input (bbox string, CSV row, compression name)
    Parse(String),
    /// I/O error
    Io(io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Configuration(msg) => write!(f, "Service configuration error: {}", msg),
            ExportError::OutOfExtent(bbox) => write!(
                f, "Requested area {} does not intersect the service extent", bbox),
            ExportError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ExportError::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            ExportError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<io::Error> for ExportError {
    fn from(error: io::Error) -> Self {
        ExportError::Io(error)
    }
}

impl From<String> for ExportError {
    fn from(msg: String) -> Self {
        ExportError::Parse(msg)
    }
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
