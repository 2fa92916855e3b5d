//! Folio Library
//!
//! Resource access for archive-packaged publications (EPUB, comic archives).
//! The server binary is in main.rs.
//!
//! # Modules
//!
//! - `publication`: already-parsed publication context (root file, resources)
//! - `container`: archive read interface and its zip/directory/memory backends
//! - `filters`: pluggable content filters per publication format
//! - `fetcher`: the resource pipeline tying the three together

pub mod container;
pub mod fetcher;
pub mod filters;
pub mod publication;

pub use container::{Container, ContainerError, DirectoryContainer, MemoryContainer, ZipContainer};
pub use fetcher::{FetchError, FetchResult, Fetcher};
pub use filters::{ContentFilter, FilterContext, FilterOptions, PublicationFormat};
pub use publication::{Link, Publication};
