//! EPUB content filter
//!
//! Injects presentation assets into HTML/XHTML resources using lol_html:
//! - viewport meta and "before" stylesheets at the start of `<head>`
//! - "after" stylesheets and scripts at the end of `<head>`
//! - user preference CSS properties on the `<html>` style attribute
//!
//! Anything that is not HTML (images, fonts, CSS) is passed through.

use std::io::ErrorKind;
use std::path::PathBuf;

use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use serde::{Deserialize, Serialize};

use super::{ContentFilter, FilterContext, FilterError, FilterOptions, FilterResult};

const HTML_MEDIA_TYPES: [&str; 2] = ["application/xhtml+xml", "text/html"];

/// Injection settings for EPUB content documents
#[derive(Debug, Clone)]
pub struct EpubFilterConfig {
    /// Base URL the injected asset paths are resolved against
    pub assets_base_url: String,
    /// `content` of the injected viewport meta tag
    pub viewport: String,
    /// Stylesheets injected before publication styles
    pub stylesheets_before: Vec<String>,
    /// Stylesheets injected after publication styles
    pub stylesheets_after: Vec<String>,
    /// Scripts injected at the end of `<head>`
    pub scripts: Vec<String>,
}

impl Default for EpubFilterConfig {
    fn default() -> Self {
        Self {
            assets_base_url: "/assets".to_string(),
            viewport: "width=device-width, height=device-height, initial-scale=1.0".to_string(),
            stylesheets_before: vec!["styles/before.css".to_string()],
            stylesheets_after: vec!["styles/after.css".to_string()],
            scripts: vec!["scripts/reader.js".to_string()],
        }
    }
}

/// A single user style override, applied as a CSS custom property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProperty {
    pub name: String,
    pub value: String,
}

/// Content filter for EPUB publications
#[derive(Debug, Clone)]
pub struct EpubContentFilter {
    config: EpubFilterConfig,
    user_properties_path: Option<PathBuf>,
}

impl EpubContentFilter {
    pub fn new(options: &FilterOptions) -> Self {
        Self {
            config: options.epub.clone(),
            user_properties_path: options.user_properties_path.clone(),
        }
    }

    /// Current user properties
    ///
    /// The file is read on every call so preference changes apply to the next
    /// resource. A missing file means no overrides.
    pub fn user_properties(&self) -> FilterResult<Vec<UserProperty>> {
        let Some(path) = &self.user_properties_path else {
            return Ok(Vec::new());
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "User properties file not present");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| FilterError::UserProperties(e.to_string()))
    }

    fn asset_url(&self, asset: &str) -> String {
        let base = self.config.assets_base_url.trim_end_matches('/');
        let url = format!("{}/{}", base, asset.trim_start_matches('/'));
        html_escape::encode_double_quoted_attribute(&url).into_owned()
    }

    fn stylesheet_links(&self, stylesheets: &[String]) -> String {
        stylesheets
            .iter()
            .map(|css| {
                format!(
                    "<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>",
                    self.asset_url(css)
                )
            })
            .collect()
    }

    fn head_start(&self) -> String {
        let viewport = html_escape::encode_double_quoted_attribute(&self.config.viewport);
        format!(
            "<meta name=\"viewport\" content=\"{}\"/>{}",
            viewport,
            self.stylesheet_links(&self.config.stylesheets_before)
        )
    }

    fn head_end(&self) -> String {
        let scripts: String = self
            .config
            .scripts
            .iter()
            .map(|js| {
                format!(
                    "<script type=\"text/javascript\" src=\"{}\"></script>",
                    self.asset_url(js)
                )
            })
            .collect();
        format!(
            "{}{}",
            self.stylesheet_links(&self.config.stylesheets_after),
            scripts
        )
    }

    fn inject(&self, html: &str) -> FilterResult<String> {
        let head_start = self.head_start();
        let head_end = self.head_end();
        let user_style = user_style(&self.user_properties()?);

        let rewritten = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("head", |el| {
                        el.prepend(&head_start, ContentType::Html);
                        el.append(&head_end, ContentType::Html);
                        Ok(())
                    }),
                    element!("html", |el| {
                        if let Some(style) = &user_style {
                            let merged = match el.get_attribute("style") {
                                Some(existing) if !existing.trim().is_empty() => {
                                    format!("{}; {}", existing.trim().trim_end_matches(';'), style)
                                }
                                _ => style.clone(),
                            };
                            el.set_attribute("style", &merged)?;
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        );
        rewritten.map_err(|e| FilterError::Rewrite(e.to_string()))
    }
}

impl ContentFilter for EpubContentFilter {
    fn apply(&self, data: Vec<u8>, ctx: &FilterContext<'_>) -> FilterResult<Vec<u8>> {
        if !is_html_resource(ctx) {
            return Ok(data);
        }

        let html = match String::from_utf8(data) {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(path = ctx.path, "Skipping injection for non UTF-8 document");
                return Ok(e.into_bytes());
            }
        };

        Ok(self.inject(&html)?.into_bytes())
    }
}

/// Whether the requested resource is an HTML content document
///
/// The declared manifest type wins; the file extension is the fallback.
fn is_html_resource(ctx: &FilterContext<'_>) -> bool {
    let declared = ctx
        .publication
        .resource(ctx.path)
        .and_then(|link| link.media_type.as_deref());

    match declared {
        Some(media_type) => HTML_MEDIA_TYPES.contains(&media_type),
        None => mime_guess::from_path(ctx.path)
            .iter()
            .any(|mime| HTML_MEDIA_TYPES.contains(&mime.essence_str())),
    }
}

/// Render user properties as an inline style declaration list
fn user_style(properties: &[UserProperty]) -> Option<String> {
    if properties.is_empty() {
        return None;
    }
    Some(
        properties
            .iter()
            .map(|p| format!("{}: {};", p.name, p.value))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::container::MemoryContainer;
    use crate::publication::{Link, Publication};

    const CHAPTER: &str = "<html><head><title>One</title></head><body><p>Hello</p></body></html>";

    fn publication() -> Publication {
        Publication::new(
            Some("OEBPS/content.opf"),
            vec![
                Link::new("chapter1.xhtml", Some("application/xhtml+xml")),
                Link::new("notes.txt", Some("text/plain")),
                Link::new("page.html", Some("application/xhtml+xml")),
            ],
        )
    }

    fn apply(filter: &EpubContentFilter, path: &str, data: &[u8]) -> Vec<u8> {
        let publication = publication();
        let container = MemoryContainer::new(Some("application/epub+zip"));
        let ctx = FilterContext {
            publication: &publication,
            container: &container,
            path,
        };
        filter.apply(data.to_vec(), &ctx).unwrap()
    }

    #[test]
    fn test_injects_head_assets() {
        let filter = EpubContentFilter::new(&FilterOptions::default());
        let out = String::from_utf8(apply(&filter, "chapter1.xhtml", CHAPTER.as_bytes())).unwrap();

        let viewport = out.find("name=\"viewport\"").unwrap();
        let before = out.find("/assets/styles/before.css").unwrap();
        let title = out.find("<title>").unwrap();
        let after = out.find("/assets/styles/after.css").unwrap();
        let script = out.find("/assets/scripts/reader.js").unwrap();

        assert!(viewport < before && before < title);
        assert!(title < after && after < script);
        assert!(out.contains("<p>Hello</p>"));
    }

    #[test]
    fn test_non_html_passthrough() {
        let filter = EpubContentFilter::new(&FilterOptions::default());

        let text = b"<head>not markup</head>";
        assert_eq!(apply(&filter, "notes.txt", text), text.to_vec());

        let css = b"body { color: red }";
        assert_eq!(apply(&filter, "styles/main.css", css), css.to_vec());
    }

    #[test]
    fn test_extension_fallback_for_undeclared() {
        let filter = EpubContentFilter::new(&FilterOptions::default());
        let out = String::from_utf8(apply(&filter, "extra.xhtml", CHAPTER.as_bytes())).unwrap();
        assert!(out.contains("/assets/styles/before.css"));
    }

    #[test]
    fn test_non_utf8_passthrough() {
        let filter = EpubContentFilter::new(&FilterOptions::default());
        let data = [0x3c, 0x68, 0xff, 0xfe];
        assert_eq!(apply(&filter, "chapter1.xhtml", &data), data.to_vec());
    }

    #[test]
    fn test_user_properties_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user-properties.json");
        std::fs::write(
            &path,
            r#"[{"name": "--USER__fontSize", "value": "150%"}, {"name": "--USER__appearance", "value": "night"}]"#,
        )
        .unwrap();

        let filter = EpubContentFilter::new(&FilterOptions::with_user_properties(Some(path)));
        let html = "<html style=\"color: black;\"><head></head><body></body></html>";
        let out = String::from_utf8(apply(&filter, "page.html", html.as_bytes())).unwrap();

        assert!(out.contains("color: black; --USER__fontSize: 150%; --USER__appearance: night;"));
    }

    #[test]
    fn test_missing_user_properties_file() {
        let dir = TempDir::new().unwrap();
        let filter = EpubContentFilter::new(&FilterOptions::with_user_properties(Some(
            dir.path().join("absent.json"),
        )));

        assert!(filter.user_properties().unwrap().is_empty());
        let out = String::from_utf8(apply(&filter, "chapter1.xhtml", CHAPTER.as_bytes())).unwrap();
        assert!(out.starts_with("<html><head>"));
    }

    #[test]
    fn test_malformed_user_properties() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user-properties.json");
        std::fs::write(&path, "{ not json").unwrap();

        let filter = EpubContentFilter::new(&FilterOptions::with_user_properties(Some(path)));
        assert!(matches!(
            filter.user_properties(),
            Err(FilterError::UserProperties(_))
        ));
    }

    #[test]
    fn test_asset_urls_are_escaped() {
        let options = FilterOptions {
            epub: EpubFilterConfig {
                assets_base_url: "/assets/".to_string(),
                stylesheets_before: vec!["a\"b.css".to_string()],
                ..EpubFilterConfig::default()
            },
            ..FilterOptions::default()
        };
        let filter = EpubContentFilter::new(&options);
        let out = String::from_utf8(apply(&filter, "chapter1.xhtml", CHAPTER.as_bytes())).unwrap();
        assert!(out.contains("href=\"/assets/a&quot;b.css\""));
    }
}
