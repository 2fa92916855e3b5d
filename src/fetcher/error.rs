//! Fetcher error types

use thiserror::Error;

use crate::container::ContainerError;
use crate::filters::FilterError;

/// Errors surfaced by the fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    /// Publication metadata has no root file entry
    #[error("Missing root file")]
    MissingRootFile,

    /// Root mimetype has no content filter (absent mimetype is `None`)
    #[error("Unsupported format: {}", .0.as_deref().unwrap_or("missing mimetype"))]
    UnsupportedFormat(Option<String>),

    /// Resource is not declared by the publication
    #[error("Missing resource: {0}")]
    MissingResource(String),

    /// Archive failure, propagated unchanged
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Content filter failure
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// IO error while normalizing a stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fetcher operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;
