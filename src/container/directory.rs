//! Exploded (unzipped) publication on disk

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{ByteStream, Container, ContainerError, ContainerResult};

/// Container reading entries from a directory tree
#[derive(Debug, Clone)]
pub struct DirectoryContainer {
    root: PathBuf,
    mimetype: Option<String>,
}

impl DirectoryContainer {
    /// Open a publication directory
    ///
    /// The mimetype is read from a `mimetype` file; a directory holding
    /// `META-INF/container.xml` without one is treated as EPUB.
    pub fn open<P: AsRef<Path>>(root: P) -> ContainerResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(ContainerError::NotFound(root.display().to_string()));
        }

        let mimetype = match std::fs::read_to_string(root.join("mimetype")) {
            Ok(content) => Some(content.trim().to_string()).filter(|m| !m.is_empty()),
            Err(e) if e.kind() == ErrorKind::NotFound => root
                .join("META-INF/container.xml")
                .is_file()
                .then(|| "application/epub+zip".to_string()),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(root = %root.display(), mimetype = ?mimetype, "Opened directory container");

        Ok(Self { root, mimetype })
    }

    /// Map an entry path onto the filesystem, refusing anything outside the root
    fn entry_path(&self, path: &str) -> ContainerResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ContainerError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl Container for DirectoryContainer {
    fn root_mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    fn data(&self, path: &str) -> ContainerResult<Option<Vec<u8>>> {
        let full = self.entry_path(path)?;
        if !full.is_file() {
            return Ok(None);
        }
        match std::fs::read(&full) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn data_stream(&self, path: &str) -> ContainerResult<ByteStream> {
        let full = self.entry_path(path)?;
        if !full.is_file() {
            return Err(ContainerError::NotFound(path.to_string()));
        }
        Ok(Box::new(File::open(full)?))
    }

    fn data_length(&self, path: &str) -> ContainerResult<u64> {
        let full = self.entry_path(path)?;
        match std::fs::metadata(&full) {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Err(ContainerError::NotFound(path.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ContainerError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
