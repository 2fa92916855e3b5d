//! Resource fetcher
//!
//! Resolves publication resources against the container and pipes them
//! through the publication's content filter.
//!
//! # Access modes
//!
//! - [`Fetcher::fetch`]: buffered; an entry missing from the archive is an
//!   expected case and comes back as `Ok(None)`
//! - [`Fetcher::fetch_stream`]: streaming; a missing entry is a container
//!   error. The default viewport meta tag is stripped before filtering.
//! - [`Fetcher::length`]: stored size of a declared resource
//!
//! A fetcher holds only state fixed at construction (root directory and
//! content filter), so it can be shared between concurrent callers as long
//! as the container and filter are.

mod error;
mod selector;

use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::bytes::Regex;

use crate::container::{ByteStream, Container};
use crate::filters::{ContentFilter, FilterContext, FilterOptions};
use crate::publication::Publication;

pub use error::{FetchError, FetchResult};
pub use selector::select_content_filter;

/// Viewport declaration removed from streamed content so it cannot override
/// the one injected by the content filter or shipped by the publication
pub const DEFAULT_VIEWPORT: &str =
    "<meta name=\"viewport\" content=\"initial-scale=2.3, user-scalable=no\" />";

static DEFAULT_VIEWPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&regex::escape(DEFAULT_VIEWPORT)).expect("escaped literal"));

/// Resource access pipeline for one opened publication
pub struct Fetcher {
    publication: Arc<Publication>,
    container: Arc<dyn Container>,
    root_file_directory: String,
    content_filter: Option<Arc<dyn ContentFilter>>,
}

impl Fetcher {
    /// Create a fetcher, selecting the content filter from the container's
    /// root mimetype
    ///
    /// `user_properties_path` points at the user style overrides consumed by
    /// the EPUB filter.
    pub fn new(
        publication: Arc<Publication>,
        container: Arc<dyn Container>,
        user_properties_path: Option<PathBuf>,
    ) -> FetchResult<Self> {
        let options = FilterOptions::with_user_properties(user_properties_path);
        Self::with_options(publication, container, &options)
    }

    /// Create a fetcher with explicit filter settings
    pub fn with_options(
        publication: Arc<Publication>,
        container: Arc<dyn Container>,
        options: &FilterOptions,
    ) -> FetchResult<Self> {
        let root_file_directory = root_directory_of(&publication)?;
        let content_filter = select_content_filter(container.root_mimetype(), options)?;

        tracing::debug!(
            root_file_directory = %root_file_directory,
            mimetype = ?container.root_mimetype(),
            "Created fetcher"
        );

        Ok(Self {
            publication,
            container,
            root_file_directory,
            content_filter: Some(content_filter),
        })
    }

    /// Create a fetcher with a caller-chosen filter (or none), bypassing
    /// mimetype selection
    pub fn with_content_filter(
        publication: Arc<Publication>,
        container: Arc<dyn Container>,
        content_filter: Option<Arc<dyn ContentFilter>>,
    ) -> FetchResult<Self> {
        let root_file_directory = root_directory_of(&publication)?;
        Ok(Self {
            publication,
            container,
            root_file_directory,
            content_filter,
        })
    }

    pub fn publication(&self) -> &Publication {
        &self.publication
    }

    /// Directory of the root file, with its trailing separator (may be empty)
    pub fn root_file_directory(&self) -> &str {
        &self.root_file_directory
    }

    fn context<'a>(&'a self, path: &'a str) -> FilterContext<'a> {
        FilterContext {
            publication: &self.publication,
            container: self.container.as_ref(),
            path,
        }
    }

    /// Buffered access
    ///
    /// `path` is handed to the container verbatim. Returns `Ok(None)` when
    /// the container has no such entry; the filter is not invoked then.
    pub fn fetch(&self, path: &str) -> FetchResult<Option<Vec<u8>>> {
        let Some(data) = self.container.data(path)? else {
            return Ok(None);
        };

        match &self.content_filter {
            Some(filter) => Ok(Some(filter.apply(data, &self.context(path))?)),
            None => Ok(Some(data)),
        }
    }

    /// Streaming access
    ///
    /// The entry is fully read to strip [`DEFAULT_VIEWPORT`], so memory use is
    /// proportional to the resource size. Buffered [`Fetcher::fetch`] does
    /// not perform this removal.
    pub fn fetch_stream(&self, path: &str) -> FetchResult<ByteStream> {
        let mut input = self.container.data_stream(path)?;

        let mut content = Vec::new();
        input.read_to_end(&mut content)?;
        let stripped = match strip_default_viewport(&content) {
            Cow::Borrowed(_) => None,
            Cow::Owned(stripped) => Some(stripped),
        };
        let normalized: ByteStream = Box::new(Cursor::new(stripped.unwrap_or(content)));

        match &self.content_filter {
            Some(filter) => Ok(filter.apply_stream(normalized, &self.context(path))?),
            None => Ok(normalized),
        }
    }

    /// Stored (unfiltered) length of a declared resource
    ///
    /// The resource must be declared by the publication; the archive entry is
    /// looked up relative to the root file directory.
    pub fn length(&self, path: &str) -> FetchResult<u64> {
        if self.publication.resource(path).is_none() {
            return Err(FetchError::MissingResource(path.to_string()));
        }
        let relative_path = format!("{}{}", self.root_file_directory, path);
        Ok(self.container.data_length(&relative_path)?)
    }
}

fn root_directory_of(publication: &Publication) -> FetchResult<String> {
    publication
        .root_file()
        .map(root_file_directory)
        .ok_or(FetchError::MissingRootFile)
}

/// Directory component of a root file path, keeping the trailing `/`
///
/// `OEBPS/content.opf` gives `OEBPS/`; a path without `/` gives an empty
/// string.
pub fn root_file_directory(root_file: &str) -> String {
    match root_file.rfind('/') {
        Some(index) => root_file[..=index].to_string(),
        None => String::new(),
    }
}

/// Remove every occurrence of the default viewport declaration
///
/// Repeats until nothing matches, since a removal can join its surroundings
/// into a new occurrence.
fn strip_default_viewport(content: &[u8]) -> Cow<'_, [u8]> {
    let mut stripped = match DEFAULT_VIEWPORT_RE.replace_all(content, &b""[..]) {
        Cow::Borrowed(_) => return Cow::Borrowed(content),
        Cow::Owned(stripped) => stripped,
    };
    loop {
        match DEFAULT_VIEWPORT_RE.replace_all(&stripped, &b""[..]) {
            Cow::Borrowed(_) => return Cow::Owned(stripped),
            Cow::Owned(next) => stripped = next,
        }
    }
}
