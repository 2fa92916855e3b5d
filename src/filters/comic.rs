//! Comic archive filter

use crate::container::ByteStream;

use super::{ContentFilter, FilterContext, FilterResult};

/// Serves comic archive pages (images) exactly as stored
#[derive(Debug, Clone, Copy, Default)]
pub struct ComicContentFilter;

impl ContentFilter for ComicContentFilter {
    fn apply(&self, data: Vec<u8>, _ctx: &FilterContext<'_>) -> FilterResult<Vec<u8>> {
        Ok(data)
    }

    fn apply_stream(&self, input: ByteStream, _ctx: &FilterContext<'_>) -> FilterResult<ByteStream> {
        Ok(input)
    }
}
