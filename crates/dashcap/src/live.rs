//! Recording of live streams that interleave content with advertisement
//! breaks.
//!
//! The capture waits until the manifest looks like content, then refetches
//! it at a fixed cadence and fetches every segment it lists. Segments that
//! were already fetched are skipped by the acquirer, so overlapping timelines
//! between refreshes cost nothing.

use std::{collections::HashSet, time::Duration};

use tokio::time::Instant;
use url::Url;

use crate::{
    download::{BatchReport, SegmentAcquirer},
    error::DashcapResult,
    mpd::{ManifestDocument, MediaKind, MissingTimelinePolicy, Representation},
    select::{select_streams, StreamSelection},
    source::ManifestSource,
};

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Minimum wall-clock duration of a capture cycle.
    pub cadence: Duration,
    /// Wait between polls while an advertisement break is running.
    pub ad_break_poll: Duration,
    /// Wait after a failed manifest fetch or selection.
    pub retry_interval: Duration,
    /// Number of capture cycles, `None` to capture until cancelled.
    pub max_cycles: Option<u32>,
    pub timeline_policy: MissingTimelinePolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(4),
            ad_break_poll: Duration::from_secs(5),
            retry_interval: Duration::from_secs(2),
            max_cycles: Some(5),
            timeline_policy: MissingTimelinePolicy::default(),
        }
    }
}

impl CaptureConfig {
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_ad_break_poll(mut self, ad_break_poll: Duration) -> Self {
        self.ad_break_poll = ad_break_poll;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: Option<u32>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn with_timeline_policy(mut self, timeline_policy: MissingTimelinePolicy) -> Self {
        self.timeline_policy = timeline_policy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    AwaitingContent,
    Capturing,
}

/// A manifest with exactly one period is taken as content, more than one as
/// an advertisement break.
///
/// This is a heuristic about how the publisher splices ads and nothing else
/// should rely on it.
pub fn is_content(document: &ManifestDocument) -> bool {
    document.periods().len() == 1
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Capture cycles run, including failed ones.
    pub cycles: u32,
    pub failed_cycles: u32,
    /// Ad-break polls before content was detected.
    pub ad_break_polls: u32,
    /// Combined result of every batch, initialization segments included.
    pub segments: BatchReport,
}

pub struct CaptureLoop<S> {
    source: S,
    acquirer: SegmentAcquirer,
    config: CaptureConfig,
    state: CaptureState,
    /// Initialization segments fetched so far.
    initialized: HashSet<Url>,
}

impl<S> CaptureLoop<S>
where
    S: ManifestSource,
{
    pub fn new(source: S, acquirer: SegmentAcquirer, config: CaptureConfig) -> Self {
        Self {
            source,
            acquirer,
            config,
            state: CaptureState::AwaitingContent,
            initialized: HashSet::new(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    async fn fetch_document(&self) -> DashcapResult<ManifestDocument> {
        let response = self.source.fetch_manifest().await?;
        ManifestDocument::parse(&response.text, response.url)
    }

    /// Run the capture: wait for content, then capture `max_cycles` cycles.
    ///
    /// Errors that a later refresh may resolve (network, malformed manifest,
    /// missing representations) are logged and retried. Any other error ends
    /// the capture.
    pub async fn record(&mut self) -> DashcapResult<CaptureReport> {
        let mut report = CaptureReport::default();

        while self.state == CaptureState::AwaitingContent {
            match self.try_start(&mut report).await {
                Ok(true) => {
                    tracing::info!("Content detected, start capturing.");
                    self.state = CaptureState::Capturing;
                }
                Ok(false) => {
                    report.ad_break_polls += 1;
                    tracing::info!("Advertisement break detected, waiting...");
                    tokio::time::sleep(self.config.ad_break_poll).await;
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!("Waiting for content failed, retrying: {e}");
                    tokio::time::sleep(self.config.retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        }

        loop {
            if self
                .config
                .max_cycles
                .is_some_and(|max| report.cycles >= max)
            {
                break;
            }

            let started = Instant::now();
            report.cycles += 1;
            match self.capture_cycle(&mut report.segments).await {
                Ok(()) => {}
                Err(e) if e.is_retryable() => {
                    report.failed_cycles += 1;
                    tracing::warn!(cycle = report.cycles, "Capture cycle skipped: {e}");
                    tokio::time::sleep(self.config.retry_interval).await;
                    continue;
                }
                Err(e) => return Err(e),
            }

            if self.config.max_cycles != Some(report.cycles) {
                let elapsed = started.elapsed();
                if let Some(remaining) = self.config.cadence.checked_sub(elapsed) {
                    tokio::time::sleep(remaining).await;
                }
            }
        }

        tracing::info!(
            cycles = report.cycles,
            failed_cycles = report.failed_cycles,
            fetched = report.segments.fetched,
            failed = report.segments.failed.len(),
            "Capture finished"
        );
        Ok(report)
    }

    /// One poll while awaiting content. Returns whether content was found,
    /// in which case the initialization segments have been fetched.
    async fn try_start(&mut self, report: &mut CaptureReport) -> DashcapResult<bool> {
        let document = self.fetch_document().await?;
        if !is_content(&document) {
            return Ok(false);
        }

        let period = document.content_period()?;
        let selection = select_streams(&document, &period)?;
        tracing::info!(
            "Selected quality: video {}p | audio {}",
            selection.height.unwrap_or_default(),
            selection.audio.bandwidth()
        );
        self.fetch_initialization(&selection, &mut report.segments)
            .await?;
        Ok(true)
    }

    async fn capture_cycle(&mut self, report: &mut BatchReport) -> DashcapResult<()> {
        let document = self.fetch_document().await?;
        let period = document.content_period()?;
        // Representation ids may change between refreshes
        let selection = select_streams(&document, &period)?;
        self.fetch_initialization(&selection, report).await?;

        for (representation, kind) in [
            (&selection.video, MediaKind::Video),
            (&selection.audio, MediaKind::Audio),
        ] {
            let urls = representation.segment_urls(self.config.timeline_policy)?;
            report.merge(self.acquirer.fetch_batch(&urls, kind.as_str()).await);
        }
        Ok(())
    }

    /// Fetch initialization segments not fetched before.
    async fn fetch_initialization(
        &mut self,
        selection: &StreamSelection<'_>,
        report: &mut BatchReport,
    ) -> DashcapResult<()> {
        let tracks: [(&Representation<'_>, MediaKind); 2] = [
            (&selection.video, MediaKind::Video),
            (&selection.audio, MediaKind::Audio),
        ];
        for (representation, kind) in tracks {
            let Some(url) = representation.initialization_url()? else {
                continue;
            };
            if self.initialized.contains(&url) {
                continue;
            }

            let batch = self
                .acquirer
                .fetch_batch(std::slice::from_ref(&url), kind.as_str())
                .await;
            if batch.is_complete() {
                self.initialized.insert(url);
            }
            report.merge(batch);
        }
        Ok(())
    }
}
