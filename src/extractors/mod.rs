pub mod images;
pub mod issues;

use crate::error::{ComicSaverError, Result};
use scraper::Selector;

pub use images::ImageSetExtractor;
pub use issues::IssueLinkExtractor;

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ComicSaverError::selector(format!("{}: {:?}", selector, e)))
}
