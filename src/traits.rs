use crate::error::{ComicSaverError, Result};
use serde_json::Value;

/// A cookie copied out of the browser context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// Browser capability driven by the crawler's single control flow.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate the active tab and wait for the load to finish
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a script in the page and return its value
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Serialized DOM of the current page
    async fn page_source(&self) -> Result<String>;

    /// All cookies visible to the current page
    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;

    /// Number of elements matching a CSS selector
    async fn count_elements(&self, selector: &str) -> Result<usize> {
        let script = format!(
            "document.querySelectorAll('{}').length",
            selector.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let value = self.evaluate(&script).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| ComicSaverError::script(format!("non-numeric count for {}", selector)))
    }

    async fn user_agent(&self) -> Result<String> {
        let value = self.evaluate("navigator.userAgent").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ComicSaverError::script("navigator.userAgent returned no string"))
    }
}
