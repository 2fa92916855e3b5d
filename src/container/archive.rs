//! ZIP-backed container
//!
//! Serves entries from zip-packaged publications (EPUB, CBZ). The archive is
//! held in memory and a fresh `ZipArchive` reader is opened per operation, so
//! a single container can serve concurrent requests without locking.
//!
//! Entry names are matched exactly after normalization (URL decoding, `./`
//! and leading `/` stripped, fragment removed). With fuzzy paths enabled, a
//! path that matches no entry may also resolve to the single entry ending in
//! `/<path>` (e.g. "Styles/style.css" for "OEBPS/Styles/style.css").

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use zip::ZipArchive;

use super::{ByteStream, Container, ContainerError, ContainerResult};

/// Name of the entry declaring the package mimetype (OCF)
const MIMETYPE_ENTRY: &str = "mimetype";

/// Zip archive container
pub struct ZipContainer {
    bytes: Arc<[u8]>,
    mimetype: Option<String>,
    entry_names: Vec<String>,
    fuzzy_paths: bool,
}

impl ZipContainer {
    /// Open an archive from disk
    ///
    /// The declared mimetype comes from the `mimetype` entry when present and
    /// falls back to the file extension.
    pub fn open<P: AsRef<Path>>(path: P) -> ContainerResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let extension = path.extension().and_then(|ext| ext.to_str());
        Self::from_bytes(bytes, extension)
    }

    /// Open an archive from bytes; `extension` is used when no `mimetype`
    /// entry exists
    pub fn from_bytes(bytes: Vec<u8>, extension: Option<&str>) -> ContainerResult<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        let (entry_names, declared) = {
            let mut archive = ZipArchive::new(Cursor::new(&bytes[..]))?;
            let entry_names: Vec<String> = archive.file_names().map(str::to_string).collect();

            let declared = match archive.by_name(MIMETYPE_ENTRY) {
                Ok(mut file) => {
                    let mut content = String::new();
                    file.read_to_string(&mut content)?;
                    Some(content.trim().to_string()).filter(|m| !m.is_empty())
                }
                Err(zip::result::ZipError::FileNotFound) => None,
                Err(e) => return Err(e.into()),
            };
            (entry_names, declared)
        };
        let mimetype = declared.or_else(|| extension.and_then(mimetype_for_extension));

        tracing::debug!(
            entries = entry_names.len(),
            mimetype = ?mimetype,
            "Opened zip container"
        );

        Ok(Self {
            bytes,
            mimetype,
            entry_names,
            fuzzy_paths: false,
        })
    }

    /// Also resolve paths by unique suffix on a path separator
    pub fn with_fuzzy_paths(mut self, enabled: bool) -> Self {
        self.fuzzy_paths = enabled;
        self
    }

    /// Names of all entries in the archive
    pub fn entry_names(&self) -> &[String] {
        &self.entry_names
    }

    fn archive(&self) -> ContainerResult<ZipArchive<Cursor<&[u8]>>> {
        Ok(ZipArchive::new(Cursor::new(&self.bytes[..]))?)
    }

    fn resolve(&self, path: &str) -> Option<&str> {
        find_matching_entry(&self.entry_names, path, self.fuzzy_paths)
    }

    fn read_entry(&self, name: &str) -> ContainerResult<Vec<u8>> {
        let mut archive = self.archive()?;
        let mut file = archive.by_name(name)?;
        // Declared sizes are untrusted; let the buffer grow as data arrives.
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }
}

impl Container for ZipContainer {
    fn root_mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    fn data(&self, path: &str) -> ContainerResult<Option<Vec<u8>>> {
        match self.resolve(path) {
            Some(name) => self.read_entry(name).map(Some),
            None => Ok(None),
        }
    }

    fn data_stream(&self, path: &str) -> ContainerResult<ByteStream> {
        let name = self
            .resolve(path)
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))?;
        // ZipFile borrows the archive, so the entry is inflated up front.
        let content = self.read_entry(name)?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn data_length(&self, path: &str) -> ContainerResult<u64> {
        let name = self
            .resolve(path)
            .ok_or_else(|| ContainerError::NotFound(path.to_string()))?;
        let mut archive = self.archive()?;
        let file = archive.by_name(name)?;
        Ok(file.size())
    }
}

/// Package mimetype implied by an archive file extension
fn mimetype_for_extension(extension: &str) -> Option<String> {
    let mimetype = match extension.to_lowercase().as_str() {
        "epub" => "application/epub+zip",
        "cbz" => "application/vnd.comicbook+zip",
        "cbr" => "application/x-cbr",
        _ => return None,
    };
    Some(mimetype.to_string())
}

/// Normalize an entry path for matching
///
/// - strip the URL fragment
/// - URL-decode percent-encoded characters
/// - replace backslashes with forward slashes
/// - remove leading "./" or "/"
fn normalize_entry_path(path: &str) -> String {
    let path = path.split('#').next().unwrap_or(path);
    let decoded = urlencoding::decode(path).unwrap_or_else(|_| path.into());

    decoded
        .replace('\\', "/")
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

/// Find the archive entry matching `href`
///
/// Exact (case-sensitive) match on normalized names. With `fuzzy`, falls back
/// to a suffix match on a separator boundary, only when exactly one entry
/// qualifies.
fn find_matching_entry<'a>(entry_names: &'a [String], href: &str, fuzzy: bool) -> Option<&'a str> {
    let href = normalize_entry_path(href);
    if href.is_empty() {
        return None;
    }

    let normalized: Vec<(&str, String)> = entry_names
        .iter()
        .map(|name| (name.as_str(), normalize_entry_path(name)))
        .collect();

    if let Some((original, _)) = normalized.iter().find(|(_, name)| *name == href) {
        return Some(*original);
    }
    if !fuzzy {
        return None;
    }

    let suffix = format!("/{}", href);
    let mut candidates = normalized.iter().filter(|(_, name)| name.ends_with(&suffix));
    match (candidates.next(), candidates.next()) {
        (Some((original, _)), None) => Some(*original),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_normalize_entry_path() {
        assert_eq!(normalize_entry_path("./OEBPS/style.css"), "OEBPS/style.css");
        assert_eq!(normalize_entry_path("/OEBPS/style.css"), "OEBPS/style.css");
        assert_eq!(normalize_entry_path("OEBPS\\style.css"), "OEBPS/style.css");
        assert_eq!(
            normalize_entry_path("OEBPS/chapter%201.xhtml#p2"),
            "OEBPS/chapter 1.xhtml"
        );
    }

    #[test]
    fn test_find_matching_entry_exact() {
        let names = vec![
            "OEBPS/Styles/main.css".to_string(),
            "OEBPS/Text/chapter%201.xhtml".to_string(),
            "content/images/cover.jpg".to_string(),
        ];

        assert_eq!(
            find_matching_entry(&names, "OEBPS/Styles/main.css", false),
            Some("OEBPS/Styles/main.css")
        );
        assert_eq!(
            find_matching_entry(&names, "./OEBPS/Styles/main.css#top", false),
            Some("OEBPS/Styles/main.css")
        );
        assert_eq!(
            find_matching_entry(&names, "OEBPS/Text/chapter 1.xhtml", false),
            Some("OEBPS/Text/chapter%201.xhtml")
        );
        assert_eq!(find_matching_entry(&names, "Styles/main.css", false), None);
        assert_eq!(find_matching_entry(&names, "cover.jpg", false), None);
        assert_eq!(find_matching_entry(&names, "OEBPS/styles/MAIN.css", false), None);
    }

    #[test]
    fn test_find_matching_entry_fuzzy() {
        let names = vec![
            "OEBPS/Styles/main.css".to_string(),
            "OEBPSstyle.css".to_string(),
            "OEBPS/a/cover.jpg".to_string(),
            "OEBPS/b/cover.jpg".to_string(),
        ];

        assert_eq!(
            find_matching_entry(&names, "Styles/main.css", true),
            Some("OEBPS/Styles/main.css")
        );
        // No separator boundary
        assert_eq!(find_matching_entry(&names, "style.css", true), None);
        // Ambiguous suffix
        assert_eq!(find_matching_entry(&names, "cover.jpg", true), None);
        assert_eq!(
            find_matching_entry(&names, "b/cover.jpg", true),
            Some("OEBPS/b/cover.jpg")
        );
        assert_eq!(find_matching_entry(&names, "styles/MAIN.css", true), None);
    }

    #[test]
    fn test_same_filename_in_two_directories() {
        let bytes = build_zip(&[
            ("OEBPS/a/cover.jpg", "AAAA".as_bytes()),
            ("OEBPS/b/cover.jpg", "BB".as_bytes()),
        ]);
        let container = ZipContainer::from_bytes(bytes, Some("cbz")).unwrap();

        assert_eq!(container.data("OEBPS/a/cover.jpg").unwrap(), Some(b"AAAA".to_vec()));
        assert_eq!(container.data_length("OEBPS/b/cover.jpg").unwrap(), 2);

        assert_eq!(container.data("zzz/COVER.JPG").unwrap(), None);
        assert_eq!(container.data("cover.jpg").unwrap(), None);
        assert!(matches!(
            container.data_stream("zzz/COVER.JPG"),
            Err(ContainerError::NotFound(_))
        ));
        assert!(matches!(
            container.data_length("zzz/COVER.JPG"),
            Err(ContainerError::NotFound(_))
        ));
    }

    #[test]
    fn test_mimetype_entry_wins_over_extension() {
        let bytes = build_zip(&[
            ("mimetype", "application/epub+zip\n".as_bytes()),
            ("OEBPS/content.opf", "<package/>".as_bytes()),
        ]);
        let container = ZipContainer::from_bytes(bytes, Some("cbz")).unwrap();
        assert_eq!(container.root_mimetype(), Some("application/epub+zip"));
    }

    #[test]
    fn test_mimetype_from_extension() {
        let bytes = build_zip(&[("page-001.jpg", &[0xffu8, 0xd8, 0xff][..])]);
        let container = ZipContainer::from_bytes(bytes.clone(), Some("CBZ")).unwrap();
        assert_eq!(
            container.root_mimetype(),
            Some("application/vnd.comicbook+zip")
        );

        let container = ZipContainer::from_bytes(bytes, Some("zip")).unwrap();
        assert_eq!(container.root_mimetype(), None);
    }

    #[test]
    fn test_data_and_length() {
        let chapter = vec![b'a'; 1024];
        let bytes = build_zip(&[("OEBPS/chapter1.xhtml", chapter.as_slice())]);
        let container = ZipContainer::from_bytes(bytes, Some("epub")).unwrap();

        assert_eq!(container.data_length("OEBPS/chapter1.xhtml").unwrap(), 1024);
        assert_eq!(
            container.data("OEBPS/chapter1.xhtml").unwrap().map(|d| d.len()),
            Some(1024)
        );
        assert_eq!(container.data("chapter1.xhtml").unwrap(), None);
        assert_eq!(container.data("chapter2.xhtml").unwrap(), None);

        let container = container.with_fuzzy_paths(true);
        assert_eq!(
            container.data("chapter1.xhtml").unwrap().map(|d| d.len()),
            Some(1024)
        );
        assert!(matches!(
            container.data_length("chapter2.xhtml"),
            Err(ContainerError::NotFound(_))
        ));
    }

    #[test]
    fn test_stream_missing_entry_fails() {
        let bytes = build_zip(&[("a.txt", "a".as_bytes())]);
        let container = ZipContainer::from_bytes(bytes, None).unwrap();

        let mut out = Vec::new();
        container
            .data_stream("a.txt")
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"a");

        assert!(matches!(
            container.data_stream("b.txt"),
            Err(ContainerError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_archive() {
        let result = ZipContainer::from_bytes(b"not a zip".to_vec(), Some("epub"));
        assert!(matches!(result, Err(ContainerError::Zip(_))));
    }
}
