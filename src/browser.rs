use crate::config::BrowserConfig;
use crate::error::{ComicSaverError, Result};
use crate::snapshot::PageSnapshot;
use crate::traits::{BrowserCookie, PageDriver};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// The one Chrome instance of a run, driven through a single tab.
pub struct ChromeDriver {
    browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        let options = Self::build_launch_options(config)?;

        let browser = Browser::new(options)
            .map_err(|e| ComicSaverError::browser(format!("failed to start Chrome: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ComicSaverError::browser(format!("failed to open tab: {}", e)))?;
        tab.set_default_timeout(config.navigation_timeout());

        info!("Browser started (headless: {})", config.headless);
        Ok(Self { browser, tab })
    }

    fn build_launch_options(config: &BrowserConfig) -> Result<LaunchOptions<'static>> {
        LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(config.idle_timeout())
            .build()
            .map_err(|e| ComicSaverError::browser(e.to_string()))
    }

    /// Shuts Chrome down. Dropping the driver has the same effect.
    pub fn close(self) {
        debug!("Closing browser ({} tabs open)", self.tab_count());
        drop(self.browser);
        info!("Browser closed");
    }

    fn tab_count(&self) -> usize {
        self.browser.get_tabs().lock().map(|tabs| tabs.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromeDriver {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| ComicSaverError::browser(format!("failed to navigate to {}: {}", url, e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| ComicSaverError::browser(format!("navigation timeout for {}: {}", url, e)))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| ComicSaverError::script(e.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    async fn page_source(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| ComicSaverError::browser(format!("failed to read page source: {}", e)))
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let cookies = self
            .tab
            .get_cookies()
            .map_err(|e| ComicSaverError::browser(format!("failed to read cookies: {}", e)))?;

        Ok(cookies
            .into_iter()
            .map(|c| BrowserCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
            })
            .collect())
    }
}

/// Loads URLs through a [`PageDriver`] and hands back parsed snapshots.
pub struct RenderedPageFetcher<'a> {
    driver: &'a dyn PageDriver,
    poll_interval: Duration,
}

impl<'a> RenderedPageFetcher<'a> {
    pub fn new(driver: &'a dyn PageDriver, poll_interval: Duration) -> Self {
        Self {
            driver,
            poll_interval,
        }
    }

    pub async fn load(&self, url: &Url) -> Result<()> {
        debug!("Navigating to {}", url);
        self.driver.navigate(url.as_str()).await
    }

    /// Polls until any selector matches an element. `false` means the timeout passed.
    pub async fn wait_for_any(&self, selectors: &[String], timeout: Duration) -> Result<bool> {
        let start = Instant::now();

        loop {
            for selector in selectors {
                if self.driver.count_elements(selector).await? > 0 {
                    debug!("Found elements for {} after {:?}", selector, start.elapsed());
                    return Ok(true);
                }
            }

            if start.elapsed() >= timeout {
                return Ok(false);
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn snapshot(&self, source_url: &Url) -> Result<PageSnapshot> {
        let html = self.driver.page_source().await?;
        debug!("Captured {} bytes of page source from {}", html.len(), source_url);
        Ok(PageSnapshot::parse(source_url.clone(), &html))
    }

    /// Navigates, waits up to `timeout` for `ready_selector`, then snapshots whatever is present.
    pub async fn fetch(
        &self,
        url: &Url,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<(PageSnapshot, bool)> {
        self.load(url).await?;
        let ready = self
            .wait_for_any(&[ready_selector.to_string()], timeout)
            .await?;
        let snapshot = self.snapshot(url).await?;
        Ok((snapshot, ready))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDriver;

    #[test]
    fn test_launch_options_build() {
        let options = ChromeDriver::build_launch_options(&BrowserConfig::default()).unwrap();
        assert!(!options.headless);
        assert_eq!(options.window_size, Some((1920, 1080)));
    }

    #[test]
    #[ignore] // Requires Chrome to be installed
    fn test_launch_and_close() {
        let config = BrowserConfig {
            headless: true,
            ..BrowserConfig::default()
        };
        let driver = ChromeDriver::launch(&config).unwrap();
        driver.close();
    }

    #[tokio::test]
    async fn test_fetch_returns_snapshot_of_served_page() {
        let driver = FakeDriver::with_heights(vec![1000], 1000)
            .page("https://readcomiconline.li/Comic/Saga", "<html><body><table class=\"listing\"></table></body></html>");
        let fetcher = RenderedPageFetcher::new(&driver, Duration::ZERO);
        let url = Url::parse("https://readcomiconline.li/Comic/Saga").unwrap();

        let (snapshot, ready) = fetcher.fetch(&url, "table.listing", Duration::ZERO).await.unwrap();
        assert!(ready);
        assert_eq!(snapshot.source_url, url);
        assert_eq!(driver.navigations(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn test_wait_for_any_times_out() {
        let driver = FakeDriver::with_heights(vec![1000], 1000).element_count(0);
        let fetcher = RenderedPageFetcher::new(&driver, Duration::from_millis(1));

        let found = fetcher
            .wait_for_any(&["div#divImage img".to_string()], Duration::from_millis(5))
            .await
            .unwrap();
        assert!(!found);
    }
}
