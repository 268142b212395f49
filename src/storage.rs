use crate::error::Result;
use crate::models::ImageExt;
use crate::utils::path_segments;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

const UNKNOWN_COMIC: &str = "UnknownComic";
const UNKNOWN_ISSUE: &str = "UnknownIssue";

/// Maps issues and pages onto `<base>/<comic>/<issue>/<NNN>.<ext>`.
pub struct StorageManager {
    base_path: PathBuf,
}

impl StorageManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Comic and issue directory names taken from `/<kind>/<comic>/<issue>/...`.
    pub fn issue_names(&self, issue_url: &Url) -> (String, String) {
        let segments = path_segments(issue_url);
        if segments.len() >= 3 {
            (
                self.sanitize_filename(segments[1]),
                self.sanitize_filename(segments[2]),
            )
        } else {
            warn!(
                "Unexpected issue URL shape {}, saving under {}/{}",
                issue_url, UNKNOWN_COMIC, UNKNOWN_ISSUE
            );
            (UNKNOWN_COMIC.to_string(), UNKNOWN_ISSUE.to_string())
        }
    }

    pub fn issue_dir(&self, issue_url: &Url) -> PathBuf {
        let (comic, issue) = self.issue_names(issue_url);
        self.base_path.join(comic).join(issue)
    }

    /// Resolves and creates the issue directory, parents included.
    pub async fn prepare_issue_dir(&self, issue_url: &Url) -> Result<PathBuf> {
        let path = self.issue_dir(issue_url);

        tokio::fs::create_dir_all(&path).await?;
        debug!("Issue directory ready: {:?}", path);

        Ok(path)
    }

    pub fn page_path(&self, issue_dir: &Path, ordinal: usize, ext: ImageExt) -> PathBuf {
        issue_dir.join(format!("{:03}.{}", ordinal, ext.as_str()))
    }

    fn sanitize_filename(&self, filename: &str) -> String {
        let cleaned = filename
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect::<String>()
            .trim_matches('.')
            .trim_matches(' ')
            .to_string();

        if cleaned.is_empty() {
            "_".to_string()
        } else {
            cleaned
        }
    }
}
