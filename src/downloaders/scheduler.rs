use super::session::DownloadSession;
use crate::error::{ComicSaverError, Result};
use crate::models::{DownloadOutcome, DownloadStatus, ImageTask};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

/// Downloads an issue's images into their ordinal files, skipping finished ones.
pub struct DownloadScheduler {
    concurrency: usize,
    chunk_size: usize,
    progress: bool,
}

impl DownloadScheduler {
    pub fn new(concurrency: usize, chunk_size: usize, progress: bool) -> Self {
        Self {
            concurrency: concurrency.max(1),
            chunk_size: chunk_size.max(1),
            progress,
        }
    }

    /// One outcome per task. Outcome order is unspecified when running concurrently.
    pub async fn run(&self, tasks: Vec<ImageTask>, session: &DownloadSession) -> Vec<DownloadOutcome> {
        let bar = self.progress_bar(tasks.len());
        info!(
            "Downloading {} images with {} worker(s)",
            tasks.len(),
            self.concurrency
        );

        let outcomes = if self.concurrency == 1 {
            let mut outcomes = Vec::with_capacity(tasks.len());
            for task in tasks {
                outcomes.push(self.download_one(task, session).await);
                bar.inc(1);
            }
            outcomes
        } else {
            let bar = &bar;
            stream::iter(tasks)
                .map(|task| async move {
                    let outcome = self.download_one(task, session).await;
                    bar.inc(1);
                    outcome
                })
                .buffer_unordered(self.concurrency)
                .collect::<Vec<_>>()
                .await
        };

        bar.finish_and_clear();
        outcomes
    }

    async fn download_one(&self, task: ImageTask, session: &DownloadSession) -> DownloadOutcome {
        if task.destination.exists() {
            debug!("File exists, skipping: {:?}", task.destination);
            return DownloadOutcome::new(task, DownloadStatus::Skipped);
        }

        match self.fetch_to_file(&task, session).await {
            Ok(bytes) => {
                debug!("Downloaded {} ({} bytes) to {:?}", task.source_url, bytes, task.destination);
                DownloadOutcome::new(task, DownloadStatus::Downloaded)
            }
            Err(e) => {
                warn!("Failed to download {}: {}", task.source_url, e);
                let reason = e.to_string();
                DownloadOutcome::new(task, DownloadStatus::Failed(reason))
            }
        }
    }

    /// Streams the body into a `.part` file, renamed into place once complete.
    async fn fetch_to_file(&self, task: &ImageTask, session: &DownloadSession) -> Result<u64> {
        let partial = partial_path(&task.destination);

        let result = async {
            let mut response = session.get(&task.source_url).await?;
            let file = tokio::fs::File::create(&partial).await?;
            let mut writer = BufWriter::with_capacity(self.chunk_size, file);

            let mut written = 0u64;
            while let Some(chunk) = response.chunk().await? {
                writer.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            writer.flush().await?;
            drop(writer);

            tokio::fs::rename(&partial, &task.destination).await?;
            Ok::<u64, ComicSaverError>(written)
        }
        .await;

        if result.is_err() && partial.exists() {
            if let Err(e) = tokio::fs::remove_file(&partial).await {
                debug!("Could not remove partial file {:?}: {}", partial, e);
            }
        }
        result
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::with_template("Downloading {bar:30} {pos}/{len} [{elapsed_precise}]")
        {
            bar.set_style(style);
        }
        bar
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    destination.with_file_name(name)
}
