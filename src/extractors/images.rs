use super::parse_selector;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::snapshot::PageSnapshot;
use scraper::Selector;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// Collects the real page images of a fully scrolled issue.
pub struct ImageSetExtractor {
    container: Selector,
    images: Selector,
    placeholder_suffixes: Vec<String>,
}

impl ImageSetExtractor {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            container: parse_selector(&config.image_container)?,
            images: parse_selector("img")?,
            placeholder_suffixes: config
                .placeholder_suffixes
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        })
    }

    /// Image URLs in page order, placeholders and duplicates removed.
    pub fn extract(&self, snapshot: &PageSnapshot) -> Vec<String> {
        let Some(container) = snapshot.document.select(&self.container).next() else {
            warn!("Image container not found on {}", snapshot.source_url);
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for img in container.select(&self.images) {
            let Some(src) = img.value().attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };

            let resolved = match snapshot.source_url.join(src) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Skipping unresolvable image source {}: {}", src, e);
                    continue;
                }
            };

            if self.is_placeholder(&resolved) {
                debug!("Skipping placeholder image {}", resolved);
                continue;
            }

            if seen.insert(resolved.to_string()) {
                urls.push(resolved.to_string());
            }
        }

        urls
    }

    fn is_placeholder(&self, url: &Url) -> bool {
        let full = url.as_str().to_lowercase();
        let path = url.path().to_lowercase();
        self.placeholder_suffixes
            .iter()
            .any(|suffix| full.ends_with(suffix.as_str()) || path.ends_with(suffix.as_str()))
    }
}
