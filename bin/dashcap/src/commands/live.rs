use std::{path::PathBuf, time::Duration};

use clap::Parser;
use dashcap::{CaptureConfig, CaptureLoop, HttpManifestSource, MissingTimelinePolicy};
use url::Url;

use super::{HttpOptions, SessionOptions};
use crate::config::Config;

/// Record a live stream, skipping advertisement breaks
#[derive(Parser, Clone, Debug)]
#[clap(name = "live", visible_alias = "rec")]
pub struct LiveCommand {
    #[clap(flatten)]
    pub http: HttpOptions,

    #[clap(flatten)]
    pub session: SessionOptions,

    /// Output directory
    #[clap(short, long, env = "DASHCAP_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Number of capture cycles
    #[clap(long, default_value = "5")]
    pub cycles: u32,

    /// Capture until interrupted
    #[clap(long, conflicts_with = "cycles")]
    pub unbounded: bool,

    /// Minimum duration of a capture cycle, in seconds
    #[clap(long, default_value = "4")]
    pub cadence: u64,

    /// Wait between polls during an advertisement break, in seconds
    #[clap(long, default_value = "5")]
    pub ad_break_poll: u64,

    /// Treat representations without a segment timeline as empty instead of
    /// failing
    #[clap(long)]
    pub allow_missing_timeline: bool,

    /// Manifest URL
    pub url: Url,
}

impl LiveCommand {
    fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::default()
            .with_cadence(Duration::from_secs(self.cadence))
            .with_ad_break_poll(Duration::from_secs(self.ad_break_poll))
            .with_max_cycles((!self.unbounded).then_some(self.cycles))
            .with_timeline_policy(if self.allow_missing_timeline {
                MissingTimelinePolicy::Empty
            } else {
                MissingTimelinePolicy::Reject
            })
    }

    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        let acquirer = self.http.acquirer(config, &self.output_dir)?;
        let client = acquirer.client().clone();
        client.add_cookies(&self.session.cookies, &self.url);

        let source = HttpManifestSource::new(client, self.url.clone());
        let mut capture = CaptureLoop::new(source, acquirer, self.capture_config());

        tokio::select! {
            report = capture.record() => {
                let report = report?;
                log::info!(
                    "Capture finished after {} cycle(s) ({} failed): {} fetched, {} skipped, {} failed",
                    report.cycles,
                    report.failed_cycles,
                    report.segments.fetched,
                    report.segments.skipped,
                    report.segments.failed.len()
                );
            }
            _ = tokio::signal::ctrl_c() => {
                log::warn!(
                    "Interrupted, segments fetched so far are kept in {}",
                    self.output_dir.display()
                );
            }
        }

        Ok(())
    }
}
