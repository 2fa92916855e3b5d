//! Content filters
//!
//! A content filter rewrites a resource before it is handed to the rendering
//! client (stylesheet and script injection, user preference styles, ...).
//! Exactly one filter is active per fetcher, chosen from the publication's
//! [`PublicationFormat`].
//!
//! - [`EpubContentFilter`]: HTML/XHTML injection for reflowable EPUB
//! - [`ComicContentFilter`]: identity, comic archives are served as stored

mod comic;
mod epub;

use std::io::{Cursor, Read};
use std::path::PathBuf;

use thiserror::Error;

use crate::container::{ByteStream, Container};
use crate::publication::Publication;

pub use comic::ComicContentFilter;
pub use epub::{EpubContentFilter, EpubFilterConfig, UserProperty};

/// Content filter errors
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTML rewriting failed
    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),

    /// User properties file could not be parsed
    #[error("Invalid user properties: {0}")]
    UserProperties(String),
}

/// Result type alias for filter operations
pub type FilterResult<T> = std::result::Result<T, FilterError>;

/// Per-call context handed to a filter
#[derive(Clone, Copy)]
pub struct FilterContext<'a> {
    pub publication: &'a Publication,
    pub container: &'a dyn Container,
    /// Requested resource path, as supplied by the caller
    pub path: &'a str,
}

/// Pluggable content transform
///
/// The buffered and streaming entry points are invoked independently; a
/// streaming transform only has to be behaviorally equivalent to the
/// buffered one.
pub trait ContentFilter: Send + Sync {
    /// Transform a fully buffered resource
    fn apply(&self, data: Vec<u8>, ctx: &FilterContext<'_>) -> FilterResult<Vec<u8>>;

    /// Transform a resource stream
    ///
    /// The default implementation buffers the whole stream and delegates to
    /// [`ContentFilter::apply`].
    fn apply_stream(&self, mut input: ByteStream, ctx: &FilterContext<'_>) -> FilterResult<ByteStream> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        let data = self.apply(data, ctx)?;
        Ok(Box::new(Cursor::new(data)))
    }
}

/// Packaging formats with a dedicated content filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicationFormat {
    Epub,
    ComicBook,
}

impl PublicationFormat {
    /// Recognize a declared root mimetype (exact, case-sensitive)
    pub fn from_mimetype(mimetype: &str) -> Option<Self> {
        match mimetype {
            "application/epub+zip" | "application/oebps-package+xml" => Some(Self::Epub),
            "application/vnd.comicbook+zip" | "application/x-cbr" => Some(Self::ComicBook),
            _ => None,
        }
    }
}

/// Settings handed to the filter a fetcher selects
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// JSON file with user style overrides (EPUB only)
    pub user_properties_path: Option<PathBuf>,
    /// Injection settings for EPUB content
    pub epub: EpubFilterConfig,
}

impl FilterOptions {
    pub fn with_user_properties(path: Option<PathBuf>) -> Self {
        Self {
            user_properties_path: path,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_mimetypes() {
        assert_eq!(
            PublicationFormat::from_mimetype("application/epub+zip"),
            Some(PublicationFormat::Epub)
        );
        assert_eq!(
            PublicationFormat::from_mimetype("application/oebps-package+xml"),
            Some(PublicationFormat::Epub)
        );
        assert_eq!(
            PublicationFormat::from_mimetype("application/vnd.comicbook+zip"),
            Some(PublicationFormat::ComicBook)
        );
        assert_eq!(
            PublicationFormat::from_mimetype("application/x-cbr"),
            Some(PublicationFormat::ComicBook)
        );
    }

    #[test]
    fn test_unrecognized_mimetypes() {
        for mimetype in [
            "",
            "text/plain",
            "Application/EPUB+zip",
            "application/epub+zip ",
            "application/vnd.comicbook-rar",
            "application/pdf",
        ] {
            assert_eq!(PublicationFormat::from_mimetype(mimetype), None, "{mimetype}");
        }
    }
}
