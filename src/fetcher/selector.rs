//! Content filter selection

use std::sync::Arc;

use crate::filters::{
    ComicContentFilter, ContentFilter, EpubContentFilter, FilterOptions, PublicationFormat,
};

use super::error::{FetchError, FetchResult};

/// Pick the content filter for a declared root mimetype
///
/// Pure and deterministic: the same mimetype always yields the same kind of
/// filter. Unknown or missing mimetypes fail with `UnsupportedFormat`.
pub fn select_content_filter(
    mimetype: Option<&str>,
    options: &FilterOptions,
) -> FetchResult<Arc<dyn ContentFilter>> {
    let format = mimetype
        .and_then(PublicationFormat::from_mimetype)
        .ok_or_else(|| FetchError::UnsupportedFormat(mimetype.map(str::to_string)))?;

    let filter: Arc<dyn ContentFilter> = match format {
        PublicationFormat::Epub => Arc::new(EpubContentFilter::new(options)),
        PublicationFormat::ComicBook => Arc::new(ComicContentFilter),
    };
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_supported() {
        let options = FilterOptions::default();
        for mimetype in [
            "application/epub+zip",
            "application/oebps-package+xml",
            "application/vnd.comicbook+zip",
            "application/x-cbr",
        ] {
            assert!(select_content_filter(Some(mimetype), &options).is_ok(), "{mimetype}");
        }
    }

    #[test]
    fn test_select_unsupported() {
        let options = FilterOptions::default();

        match select_content_filter(Some("text/plain"), &options) {
            Err(FetchError::UnsupportedFormat(Some(m))) => assert_eq!(m, "text/plain"),
            _ => panic!("expected UnsupportedFormat"),
        }
        assert!(matches!(
            select_content_filter(None, &options),
            Err(FetchError::UnsupportedFormat(None))
        ));
        assert!(matches!(
            select_content_filter(Some(""), &options),
            Err(FetchError::UnsupportedFormat(Some(_)))
        ));
    }
}
