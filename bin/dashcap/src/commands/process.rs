use std::path::{Path, PathBuf};

use clap::Parser;
use dashcap::{
    session::{MANIFEST_SNAPSHOT, SESSION_RECORD},
    ManifestDocument, SessionRecord,
};

use super::{reassemble, MergeOptions};
use crate::config::Config;

/// Reassemble a downloaded output directory into one file
#[derive(Parser, Clone, Debug)]
#[clap(name = "process", visible_alias = "merge")]
pub struct ProcessCommand {
    #[clap(flatten)]
    pub reassembly: MergeOptions,

    /// Expected duration in seconds. Read from the manifest snapshot when
    /// omitted.
    #[clap(long)]
    pub expected_duration: Option<f64>,

    /// Accepted duration difference in seconds
    #[clap(long)]
    pub tolerance: Option<f64>,

    /// Skip the duration check
    #[clap(long)]
    pub no_verify: bool,

    /// Output directory of a previous download
    #[clap(env = "DASHCAP_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,
}

/// Declared duration of the manifest snapshot in `output_dir`, if both the
/// snapshot and the session record are there.
async fn snapshot_duration(output_dir: &Path) -> Option<f64> {
    let snapshot = output_dir.join(MANIFEST_SNAPSHOT);
    if !snapshot.is_file() || !output_dir.join(SESSION_RECORD).is_file() {
        return None;
    }

    let result = async {
        let record = SessionRecord::load(output_dir).await?;
        let text = tokio::fs::read_to_string(&snapshot).await?;
        let document = ManifestDocument::parse(&text, record.manifest_url)?;
        Ok::<_, dashcap::DashcapError>(document.media_presentation_duration())
    }
    .await;

    match result {
        Ok(duration) => duration.map(|d| d.as_secs_f64()),
        Err(e) => {
            log::warn!("Failed to read duration from {}: {e}", snapshot.display());
            None
        }
    }
}

impl ProcessCommand {
    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        let expected = if self.no_verify {
            None
        } else {
            match self.expected_duration {
                Some(duration) => Some(duration),
                None => snapshot_duration(&self.output_dir).await,
            }
        };
        if expected.is_none() && !self.no_verify {
            log::warn!("Expected duration unknown, the output will not be verified.");
        }

        let pipeline = config.pipeline(&self.output_dir)?;
        let tolerance = self.tolerance.unwrap_or(config.verify.tolerance);
        let passed = reassemble(&pipeline, &self.reassembly, expected, tolerance).await?;
        if !passed {
            anyhow::bail!("Output duration does not match the manifest");
        }
        Ok(())
    }
}
