use crate::browser::RenderedPageFetcher;
use crate::config::Config;
use crate::downloaders::{DownloadScheduler, DownloadSession};
use crate::error::Result;
use crate::extractors::{ImageSetExtractor, IssueLinkExtractor};
use crate::models::{ImageExt, ImageTask, IssueRef, IssueReport};
use crate::scroll::ScrollStabilizer;
use crate::storage::StorageManager;
use crate::traits::PageDriver;
use crate::utils::{classify, force_query, TargetKind};
use std::path::Path;
use tracing::{info, warn};
use url::Url;

/// Drives series discovery and per-issue downloads over one browser.
pub struct IssueCrawler<'a> {
    driver: &'a dyn PageDriver,
    config: &'a Config,
    fetcher: RenderedPageFetcher<'a>,
    issue_links: IssueLinkExtractor,
    images: ImageSetExtractor,
    storage: StorageManager,
    scheduler: DownloadScheduler,
}

impl<'a> IssueCrawler<'a> {
    pub fn new(driver: &'a dyn PageDriver, config: &'a Config) -> Result<Self> {
        Ok(Self {
            driver,
            config,
            fetcher: RenderedPageFetcher::new(driver, config.scroll.poll_interval()),
            issue_links: IssueLinkExtractor::new(&config.site)?,
            images: ImageSetExtractor::new(&config.site)?,
            storage: StorageManager::new(config.output_dir.clone()),
            scheduler: DownloadScheduler::new(
                config.concurrency,
                config.download.chunk_size,
                config.progress,
            ),
        })
    }

    /// Crawls a single issue or a whole series depending on the URL shape.
    pub async fn run(&self, target: &Url) -> Result<Vec<IssueReport>> {
        match classify(target) {
            TargetKind::Issue => {
                let issue = IssueRef::new(target.as_str());
                Ok(vec![self.crawl_issue(&issue).await?])
            }
            TargetKind::Series => {
                info!("Detected comic page. Searching for issues...");
                self.crawl_series(target).await
            }
        }
    }

    pub async fn crawl_series(&self, series_url: &Url) -> Result<Vec<IssueReport>> {
        let issues = self.discover_issues(series_url).await?;

        let mut reports = Vec::with_capacity(issues.len());
        for (index, issue) in issues.iter().enumerate() {
            info!("Issue {}/{}: {}", index + 1, issues.len(), issue.url);
            reports.push(self.crawl_issue(issue).await?);
        }
        Ok(reports)
    }

    pub async fn discover_issues(&self, series_url: &Url) -> Result<Vec<IssueRef>> {
        info!("Loading comic page: {}", series_url);
        let site = &self.config.site;
        let (snapshot, ready) = self
            .fetcher
            .fetch(series_url, &site.listing_selector, site.listing_wait())
            .await?;
        if !ready {
            warn!("Timeout waiting for {}", site.listing_selector);
        }

        Ok(self.issue_links.extract(&snapshot, series_url))
    }

    pub async fn crawl_issue(&self, issue: &IssueRef) -> Result<IssueReport> {
        info!("Processing issue: {}", issue.url);
        let issue_url = Url::parse(&issue.url)?;
        let reader_url = force_query(&issue_url, &self.config.site.forced_query);

        self.fetcher.load(&reader_url).await?;
        let scroll = ScrollStabilizer::new(self.driver, &self.config.scroll, self.config.progress)
            .stabilize()
            .await?;
        self.wait_for_images().await?;

        let image_urls = {
            let snapshot = self.fetcher.snapshot(&reader_url).await?;
            self.images.extract(&snapshot)
        };
        if image_urls.is_empty() {
            warn!("No images found for {}", issue.url);
            return Ok(IssueReport::empty(&issue.url, Some(scroll)));
        }

        let issue_dir = self.storage.prepare_issue_dir(&issue_url).await?;
        let tasks = self.build_tasks(&image_urls, &issue_dir);

        let cookies = self.driver.cookies().await?;
        let user_agent = self.driver.user_agent().await?;
        let session = DownloadSession::create(
            &cookies,
            &user_agent,
            &self.config.download,
            &self.config.site.headers,
            &image_origins(&image_urls),
        )?;

        let outcomes = self.scheduler.run(tasks, &session).await;
        let report = IssueReport::from_outcomes(&issue.url, Some(scroll), &outcomes);
        info!(
            "Issue done ({}): {} downloaded, {} skipped, {} failed into {:?}",
            scroll, report.downloaded, report.skipped, report.failed, issue_dir
        );
        Ok(report)
    }

    /// Waits for at least one resolved page image, then lets the rest settle.
    async fn wait_for_images(&self) -> Result<()> {
        info!("Waiting for images to settle...");
        let selectors = self.config.site.real_image_selectors();
        let found = self
            .fetcher
            .wait_for_any(&selectors, self.config.scroll.image_wait())
            .await?;

        if found {
            tokio::time::sleep(self.config.scroll.image_settle()).await;
        } else {
            warn!("Timeout waiting for images to load. Continuing with what is present");
        }
        Ok(())
    }

    fn build_tasks(&self, image_urls: &[String], issue_dir: &Path) -> Vec<ImageTask> {
        image_urls
            .iter()
            .enumerate()
            .map(|(index, source_url)| {
                let ordinal = index + 1;
                let ext = ImageExt::from_url(source_url);
                ImageTask {
                    source_url: source_url.clone(),
                    destination: self.storage.page_path(issue_dir, ordinal, ext),
                    ordinal,
                }
            })
            .collect()
    }
}

/// Distinct scheme/host/port origins of the image sources, in first-seen order.
fn image_origins(image_urls: &[String]) -> Vec<Url> {
    let mut origins: Vec<Url> = Vec::new();
    for source in image_urls {
        if let Ok(url) = Url::parse(source) {
            if let Ok(origin) = url.join("/") {
                if !origins.contains(&origin) {
                    origins.push(origin);
                }
            }
        }
    }
    origins
}
