//! Application state management

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use folio::filters::EpubFilterConfig;
use folio::{Container, DirectoryContainer, Fetcher, FilterOptions, Publication, ZipContainer};

use crate::config::PublicationConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    fetcher: Fetcher,
}

impl AppState {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            inner: Arc::new(AppStateInner { fetcher }),
        }
    }

    /// Open the configured publication and build its fetcher
    pub fn open(config: &PublicationConfig) -> anyhow::Result<Self> {
        let manifest = std::fs::read_to_string(&config.manifest_path).with_context(|| {
            format!("Failed to read manifest {}", config.manifest_path.display())
        })?;
        let publication = Publication::from_json(&manifest).context("Invalid manifest")?;

        let container = open_container(&config.path)?;

        let options = FilterOptions {
            user_properties_path: config.user_properties_path.clone(),
            epub: EpubFilterConfig {
                assets_base_url: config.assets_base_url.clone(),
                ..EpubFilterConfig::default()
            },
        };
        let fetcher = Fetcher::with_options(Arc::new(publication), container, &options)?;

        Ok(Self::new(fetcher))
    }

    /// Get the resource fetcher
    pub fn fetcher(&self) -> &Fetcher {
        &self.inner.fetcher
    }
}

fn open_container(path: &Path) -> anyhow::Result<Arc<dyn Container>> {
    let container: Arc<dyn Container> = if path.is_dir() {
        Arc::new(DirectoryContainer::open(path)?)
    } else {
        Arc::new(
            ZipContainer::open(path)
                .with_context(|| format!("Failed to open archive {}", path.display()))?,
        )
    };
    Ok(container)
}
