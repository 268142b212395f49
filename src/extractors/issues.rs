use super::parse_selector;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::models::IssueRef;
use crate::snapshot::PageSnapshot;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Pulls the ordered issue list out of a series listing page.
pub struct IssueLinkExtractor {
    listing: Selector,
    anchors: Selector,
    issue_pattern: Regex,
}

impl IssueLinkExtractor {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            listing: parse_selector(&config.listing_selector)?,
            anchors: parse_selector("a[href]")?,
            issue_pattern: Regex::new(&config.issue_link_pattern)?,
        })
    }

    /// Issue URLs oldest first. The site lists newest first.
    pub fn extract(&self, snapshot: &PageSnapshot, base_url: &Url) -> Vec<IssueRef> {
        let document = &snapshot.document;

        let hrefs: Vec<&str> = match document.select(&self.listing).next() {
            Some(listing) => self.issue_hrefs(listing),
            None => {
                warn!(
                    "Listing container not found on {}, scanning the whole page",
                    snapshot.source_url
                );
                self.issue_hrefs(document.root_element())
            }
        };

        let mut seen = HashSet::new();
        let mut issues = Vec::new();
        for href in hrefs {
            match base_url.join(href) {
                Ok(resolved) => {
                    if seen.insert(resolved.to_string()) {
                        issues.push(IssueRef::new(resolved.to_string()));
                    }
                }
                Err(e) => debug!("Skipping unresolvable issue link {}: {}", href, e),
            }
        }

        issues.reverse();
        info!("Found {} issues on {}", issues.len(), snapshot.source_url);
        issues
    }

    fn issue_hrefs<'a>(&self, scope: ElementRef<'a>) -> Vec<&'a str> {
        scope
            .select(&self.anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| self.issue_pattern.is_match(href))
            .collect()
    }
}
