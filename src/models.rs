use std::path::PathBuf;

/// One issue of a series, in crawl order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub url: String,
}

/// One page image scheduled for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub source_url: String,
    pub destination: PathBuf,
    /// 1-based position of the page within the issue.
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Skipped,
    Downloaded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub task: ImageTask,
    pub status: DownloadStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageExt {
    Jpg,
    Png,
    Gif,
}

/// How the scrolling phase of an issue ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    Stable { attempts: u32 },
    BoundReached { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReport {
    pub issue_url: String,
    pub images_found: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub scroll: Option<ScrollOutcome>,
}

impl IssueRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ImageExt {
    /// Infers the extension from the URL path, defaulting to jpg.
    pub fn from_url(source_url: &str) -> Self {
        let path = match url::Url::parse(source_url) {
            Ok(parsed) => parsed.path().to_lowercase(),
            Err(_) => source_url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_lowercase(),
        };

        if path.contains(".gif") {
            ImageExt::Gif
        } else if path.contains(".png") {
            ImageExt::Png
        } else {
            ImageExt::Jpg
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageExt::Jpg => "jpg",
            ImageExt::Png => "png",
            ImageExt::Gif => "gif",
        }
    }
}

impl DownloadOutcome {
    pub fn new(task: ImageTask, status: DownloadStatus) -> Self {
        Self { task, status }
    }
}

impl IssueReport {
    pub fn empty(issue_url: impl Into<String>, scroll: Option<ScrollOutcome>) -> Self {
        Self {
            issue_url: issue_url.into(),
            images_found: 0,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            scroll,
        }
    }

    pub fn from_outcomes(
        issue_url: impl Into<String>,
        scroll: Option<ScrollOutcome>,
        outcomes: &[DownloadOutcome],
    ) -> Self {
        let mut report = Self::empty(issue_url, scroll);
        report.images_found = outcomes.len();
        for outcome in outcomes {
            match outcome.status {
                DownloadStatus::Skipped => report.skipped += 1,
                DownloadStatus::Downloaded => report.downloaded += 1,
                DownloadStatus::Failed(_) => report.failed += 1,
            }
        }
        report
    }
}

impl std::fmt::Display for ScrollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrollOutcome::Stable { attempts } => write!(f, "stable after {} steps", attempts),
            ScrollOutcome::BoundReached { attempts } => {
                write!(f, "bound reached after {} steps", attempts)
            }
        }
    }
}
