use std::{
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use reqwest::Client;
use tokio::{io::AsyncWriteExt, sync::Semaphore, task::JoinSet};
use url::Url;

use crate::{
    error::{DashcapError, DashcapResult},
    mpd::resolve::segment_filename,
    util::{http::HttpClient, path::DashcapPathExt},
};

pub const DEFAULT_USER_AGENT: &str = "okhttp/4.12.0";

#[derive(Debug, Clone)]
pub struct AcquirerConfig {
    /// Maximum number of segments fetched at the same time.
    pub concurrency: NonZeroU32,
    /// Timeout of a single request.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for AcquirerConfig {
    fn default() -> Self {
        Self {
            concurrency: NonZeroU32::new(4).unwrap_or(NonZeroU32::MIN),
            timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AcquirerConfig {
    pub fn with_concurrency(mut self, concurrency: NonZeroU32) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build_client(&self) -> DashcapResult<HttpClient> {
        HttpClient::new(
            Client::builder()
                .timeout(self.timeout)
                .user_agent(self.user_agent.as_str()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Bytes written.
    Fetched(u64),
    /// The destination already existed.
    Skipped,
}

/// Summary of one [`SegmentAcquirer::fetch_batch`] call.
///
/// Failed jobs are only reported here and in the log, a batch with failures
/// still completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: Vec<Url>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.fetched + self.skipped + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.fetched += other.fetched;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
    }
}

/// Fetches segment URLs into `<output_dir>/<track>/<file name>`.
///
/// Fetching is idempotent: a segment whose destination file exists is not
/// requested again. Data is written to `<file name>.part` first and renamed
/// once complete.
#[derive(Clone)]
pub struct SegmentAcquirer {
    client: HttpClient,
    output_dir: PathBuf,
    concurrency: NonZeroU32,
}

impl SegmentAcquirer {
    pub fn new(client: HttpClient, output_dir: impl Into<PathBuf>, concurrency: NonZeroU32) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            concurrency,
        }
    }

    pub fn from_config(config: &AcquirerConfig, output_dir: impl Into<PathBuf>) -> DashcapResult<Self> {
        Ok(Self::new(config.build_client()?, output_dir, config.concurrency))
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn track_dir(&self, track: &str) -> PathBuf {
        self.output_dir.join(track)
    }

    pub fn destination(&self, url: &Url, track: &str) -> Option<PathBuf> {
        segment_filename(url).map(|name| self.track_dir(track).join(name))
    }

    pub async fn fetch_one(&self, url: &Url, track: &str) -> DashcapResult<FetchOutcome> {
        self.try_fetch_one(url, track)
            .await
            .map_err(|e| DashcapError::FetchFailure {
                url: url.to_string(),
                source: Box::new(e),
            })
    }

    async fn try_fetch_one(&self, url: &Url, track: &str) -> DashcapResult<FetchOutcome> {
        let path = self.destination(url, track).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "URL has no file name")
        })?;
        if path.is_file() {
            tracing::debug!("File {} already exists, skipping.", path.display());
            return Ok(FetchOutcome::Skipped);
        }
        tokio::fs::create_dir_all(self.track_dir(track)).await?;

        let part = path.with_part_extension();
        match self.write_part(url, &part).await {
            Ok(size) => {
                tokio::fs::rename(&part, &path).await?;
                Ok(FetchOutcome::Fetched(size))
            }
            Err(e) => {
                _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn write_part(&self, url: &Url, part: &Path) -> DashcapResult<u64> {
        let mut response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(DashcapError::HttpError(response.status()));
        }

        let mut file = tokio::fs::File::create(part).await?;
        let mut size = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(size)
    }

    /// Fetch every URL of a track and wait for all of them.
    ///
    /// At most `concurrency` requests run at once. Completion order is
    /// arbitrary. A failed job is logged and listed in the report, it does
    /// not stop the other jobs.
    pub async fn fetch_batch(&self, urls: &[Url], track: &str) -> BatchReport {
        if urls.is_empty() {
            return BatchReport::default();
        }
        tracing::info!(
            "Fetching {} {track} segment(s) with {} worker(s).",
            urls.len(),
            self.concurrency.get()
        );

        let permits = Arc::new(Semaphore::new(self.concurrency.get() as usize));
        let mut jobs = JoinSet::new();
        let mut pending = Vec::with_capacity(urls.len());
        for url in urls {
            // the semaphore is never closed
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let acquirer = self.clone();
            let url = url.clone();
            pending.push(url.clone());
            let track = track.to_string();
            jobs.spawn(async move {
                let result = acquirer.fetch_one(&url, &track).await;
                drop(permit);
                (url, result)
            });
        }

        let report = collect_jobs(jobs, pending, track).await;
        tracing::info!(
            track,
            fetched = report.fetched,
            skipped = report.skipped,
            failed = report.failed.len(),
            "Batch finished"
        );
        report
    }
}

/// Wait for every job of a batch. `pending` lists the URL of every spawned
/// job, those whose task panicked or was cancelled end up in `failed`.
async fn collect_jobs(
    mut jobs: JoinSet<(Url, DashcapResult<FetchOutcome>)>,
    mut pending: Vec<Url>,
    track: &str,
) -> BatchReport {
    let mut report = BatchReport::default();
    while let Some(joined) = jobs.join_next().await {
        let (url, result) = match joined {
            Ok(finished) => finished,
            Err(e) => {
                tracing::error!(track, "Fetch job aborted: {e}");
                continue;
            }
        };
        if let Some(index) = pending.iter().position(|p| *p == url) {
            pending.swap_remove(index);
        }
        match result {
            Ok(FetchOutcome::Fetched(_)) => report.fetched += 1,
            Ok(FetchOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                tracing::error!(track, "{e}");
                report.failed.push(url);
            }
        }
    }
    report.failed.extend(pending);
    report.failed.sort();
    report
}
