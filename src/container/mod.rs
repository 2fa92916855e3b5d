//! Archive access
//!
//! The [`Container`] trait is the narrow read interface the fetcher consumes.
//! Implementations:
//!
//! - [`ZipContainer`]: zip-packaged publications (EPUB, CBZ)
//! - [`DirectoryContainer`]: exploded publications on disk
//! - [`MemoryContainer`]: in-memory entries

mod archive;
mod directory;
mod memory;

use std::io::Read;

use thiserror::Error;

pub use self::archive::ZipContainer;
pub use self::directory::DirectoryContainer;
pub use self::memory::MemoryContainer;

/// Readable byte stream handed out by containers and filters
pub type ByteStream = Box<dyn Read + Send>;

/// Archive access errors
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Entry does not exist in the archive
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Path rejected by the container (escapes the root, absolute, ...)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Result type alias for container operations
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// Read interface over a packaged publication
///
/// Implementations must be safe to share between threads; the fetcher adds
/// no locking of its own.
pub trait Container: Send + Sync {
    /// Declared mimetype of the root entry, if any
    fn root_mimetype(&self) -> Option<&str>;

    /// Raw bytes of an entry; `Ok(None)` when the entry does not exist
    fn data(&self, path: &str) -> ContainerResult<Option<Vec<u8>>>;

    /// Readable stream over an entry; fails with `NotFound` when absent
    fn data_stream(&self, path: &str) -> ContainerResult<ByteStream>;

    /// Stored (untransformed) byte length of an entry
    fn data_length(&self, path: &str) -> ContainerResult<u64>;
}
