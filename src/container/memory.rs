//! In-memory container

use std::collections::HashMap;
use std::io::Cursor;

use super::{ByteStream, Container, ContainerError, ContainerResult};

/// Container backed by a map of entry name to bytes
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    mimetype: Option<String>,
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryContainer {
    pub fn new(mimetype: Option<&str>) -> Self {
        Self {
            mimetype: mimetype.map(str::to_string),
            entries: HashMap::new(),
        }
    }

    /// Add an entry, replacing any previous one with the same name
    pub fn with_entry(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(path.into(), data.into());
        self
    }
}

impl Container for MemoryContainer {
    fn root_mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    fn data(&self, path: &str) -> ContainerResult<Option<Vec<u8>>> {
        Ok(self.entries.get(path).cloned())
    }

    fn data_stream(&self, path: &str) -> ContainerResult<ByteStream> {
        let data = self
            .entries
            .get(path)
            .cloned()
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn data_length(&self, path: &str) -> ContainerResult<u64> {
        self.entries
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))
    }
}
