use scraper::Html;
use url::Url;

/// A parsed DOM captured after one navigation, with the URL it came from.
pub struct PageSnapshot {
    pub source_url: Url,
    pub document: Html,
}

impl PageSnapshot {
    pub fn parse(source_url: Url, html: &str) -> Self {
        Self {
            source_url,
            document: Html::parse_document(html),
        }
    }
}
