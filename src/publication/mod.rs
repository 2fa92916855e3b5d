//! Publication context
//!
//! Already-parsed publication data handed to the fetcher: internal metadata
//! (which must name the root file) and the list of declared resources.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Internal metadata key holding the root file path (e.g. `OEBPS/content.opf`)
pub const ROOT_FILE_KEY: &str = "rootfile";

/// A resource declared by the publication manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Publication-relative path
    pub href: String,
    /// Declared media type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>, media_type: Option<&str>) -> Self {
        Self {
            href: href.into(),
            media_type: media_type.map(str::to_string),
        }
    }
}

/// Immutable publication context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    /// Internal metadata (not part of the public manifest)
    #[serde(default)]
    pub internal_data: HashMap<String, String>,
    /// Declared resources
    #[serde(default)]
    pub resources: Vec<Link>,
}

impl Publication {
    pub fn new(root_file: Option<&str>, resources: Vec<Link>) -> Self {
        let mut internal_data = HashMap::new();
        if let Some(root_file) = root_file {
            internal_data.insert(ROOT_FILE_KEY.to_string(), root_file.to_string());
        }
        Self {
            internal_data,
            resources,
        }
    }

    /// Load a publication previously serialized as JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Root file path from internal metadata
    pub fn root_file(&self) -> Option<&str> {
        self.internal_data.get(ROOT_FILE_KEY).map(String::as_str)
    }

    /// Find a declared resource by its exact href
    pub fn resource(&self, href: &str) -> Option<&Link> {
        self.resources.iter().find(|link| link.href == href)
    }
}
