use std::path::PathBuf;

use clap::Parser;
use dashcap::{
    session::SESSION_RECORD, HttpManifestSource, MissingTimelinePolicy, SessionCredentials,
    SessionRecord, VodDownloader,
};
use url::Url;

use super::{reassemble, HttpOptions, MergeOptions, SessionOptions};
use crate::config::Config;

/// Download a static manifest into an output directory
#[derive(Parser, Clone, Debug)]
#[clap(name = "vod", visible_alias = "dl")]
pub struct VodCommand {
    #[clap(flatten)]
    pub http: HttpOptions,

    #[clap(flatten)]
    pub session: SessionOptions,

    #[clap(flatten)]
    pub reassembly: MergeOptions,

    /// Output directory
    #[clap(short, long, env = "DASHCAP_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Reassemble the tracks after downloading
    #[clap(long)]
    pub merge: bool,

    /// Treat representations without a segment timeline as empty instead of
    /// failing
    #[clap(long)]
    pub allow_missing_timeline: bool,

    /// Manifest URL
    pub url: Url,
}

impl VodCommand {
    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        let acquirer = self.http.acquirer(config, &self.output_dir)?;
        let client = acquirer.client().clone();
        let mut credentials = SessionCredentials {
            token: self.session.token.clone(),
            cookies: self.session.cookies.clone(),
        };

        // Resuming into a previous output directory reuses its session
        if self.output_dir.join(SESSION_RECORD).is_file() {
            let record = SessionRecord::load(&self.output_dir).await?;
            if record.manifest_url == self.url {
                log::info!("Resuming download in {}", self.output_dir.display());
                record.restore_cookies(&client);
                credentials.token = credentials.token.or(record.token);
            }
        }
        client.add_cookies(&self.session.cookies, &self.url);

        let source = HttpManifestSource::new(client, self.url.clone());
        let policy = if self.allow_missing_timeline {
            MissingTimelinePolicy::Empty
        } else {
            MissingTimelinePolicy::Reject
        };

        let download = VodDownloader::new(source, acquirer)
            .with_credentials(credentials)
            .with_timeline_policy(policy)
            .download()
            .await?;

        log::info!(
            "Downloaded {} ({}p, {} bps) and {} into {}",
            download.video_id,
            download.height.unwrap_or_default(),
            download.bandwidth,
            download.audio_id,
            download.output_dir.display()
        );
        if !download.report.is_complete() {
            log::warn!(
                "{} segment(s) could not be fetched, run the command again to retry them.",
                download.report.failed.len()
            );
        }

        if !self.merge {
            log::info!(
                "Session record written to {}. Run `dashcap process` once keys are available.",
                download.session_record.display()
            );
            return Ok(());
        }

        let pipeline = config.pipeline(&download.output_dir)?;
        let passed = reassemble(
            &pipeline,
            &self.reassembly,
            Some(download.duration),
            config.verify.tolerance,
        )
        .await?;
        if !passed {
            anyhow::bail!("Output duration does not match the manifest");
        }
        Ok(())
    }
}
