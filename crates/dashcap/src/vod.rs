use std::path::PathBuf;

use url::Url;

use crate::{
    download::{BatchReport, SegmentAcquirer},
    error::DashcapResult,
    mpd::{ManifestDocument, MediaKind, MissingTimelinePolicy},
    protection::ProtectionRecord,
    select::select_streams,
    session::{save_manifest_snapshot, SessionCredentials, SessionRecord},
    source::ManifestSource,
};

/// What a finished VOD download left in the output directory.
#[derive(Debug, Clone)]
pub struct VodDownload {
    pub output_dir: PathBuf,
    pub manifest_url: Url,
    pub video_id: String,
    pub audio_id: String,
    pub height: Option<u64>,
    pub bandwidth: u64,
    /// Declared duration in seconds, the reference for integrity checks.
    pub duration: f64,
    pub protection: Option<ProtectionRecord>,
    pub manifest_snapshot: PathBuf,
    pub session_record: PathBuf,
    pub report: BatchReport,
}

/// One-shot download of a static manifest.
///
/// Writes the manifest snapshot and the session record, fetches both
/// initialization segments and only then the media segments.
pub struct VodDownloader<S> {
    source: S,
    acquirer: SegmentAcquirer,
    credentials: SessionCredentials,
    timeline_policy: MissingTimelinePolicy,
}

impl<S> VodDownloader<S>
where
    S: ManifestSource,
{
    pub fn new(source: S, acquirer: SegmentAcquirer) -> Self {
        Self {
            source,
            acquirer,
            credentials: SessionCredentials::default(),
            timeline_policy: MissingTimelinePolicy::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: SessionCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeline_policy(mut self, timeline_policy: MissingTimelinePolicy) -> Self {
        self.timeline_policy = timeline_policy;
        self
    }

    pub async fn download(&self) -> DashcapResult<VodDownload> {
        let output_dir = self.acquirer.output_dir().to_path_buf();
        let response = self.source.fetch_manifest().await?;
        tracing::info!("Starting VOD download from {}", response.url);

        tokio::fs::create_dir_all(&output_dir).await?;
        let manifest_snapshot = save_manifest_snapshot(&output_dir, &response.text).await?;

        let document = ManifestDocument::parse(&response.text, response.url.clone())?;
        let period = document.content_period()?;
        let selection = select_streams(&document, &period)?;
        tracing::info!(
            "Selected quality: video {}p | audio {}bps",
            selection.height.unwrap_or_default(),
            selection.audio.bandwidth()
        );

        // Cookies set while fetching the manifest belong to the session too
        let mut credentials = self.credentials.clone();
        for cookie in self.acquirer.client().cookies(&response.url) {
            if !credentials.cookies.contains(&cookie) {
                credentials.cookies.push(cookie);
            }
        }
        let session_record = SessionRecord::new(
            response.url.clone(),
            credentials,
            selection.protection.as_ref(),
        )
        .save(&output_dir)
        .await?;

        let tracks = [
            (&selection.video, MediaKind::Video),
            (&selection.audio, MediaKind::Audio),
        ];
        let mut media = Vec::with_capacity(tracks.len());
        for (representation, kind) in tracks {
            media.push((kind, representation.segment_urls(self.timeline_policy)?));
        }

        let mut report = BatchReport::default();
        tracing::info!("Fetching initialization segments...");
        for (representation, kind) in tracks {
            if let Some(url) = representation.initialization_url()? {
                report.merge(
                    self.acquirer
                        .fetch_batch(std::slice::from_ref(&url), kind.as_str())
                        .await,
                );
            }
        }

        tracing::info!(
            "Total segments: video {} | audio {}",
            media[0].1.len(),
            media[1].1.len()
        );
        for (kind, urls) in &media {
            report.merge(self.acquirer.fetch_batch(urls, kind.as_str()).await);
        }

        if report.is_complete() {
            tracing::info!("All segments fetched.");
        } else {
            tracing::warn!(
                "{} segment(s) failed, the output will have gaps.",
                report.failed.len()
            );
        }

        Ok(VodDownload {
            output_dir,
            manifest_url: response.url,
            video_id: selection.video.id().to_string(),
            audio_id: selection.audio.id().to_string(),
            height: selection.height,
            bandwidth: selection.bandwidth,
            duration: selection.duration,
            protection: selection.protection.clone(),
            manifest_snapshot,
            session_record,
            report,
        })
    }
}
