use std::{
    num::NonZeroU32,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::{Args, Subcommand};
use dashcap::{
    merge::{Decryptor, Muxer, Prober},
    AcquirerConfig, KeyMap, ReassemblyPipeline, SegmentAcquirer,
};

use crate::config::Config;

mod inspect;
mod live;
mod process;
mod vod;

#[derive(Subcommand, Clone)]
pub enum DashcapCommand {
    Vod(vod::VodCommand),
    Live(live::LiveCommand),
    Process(process::ProcessCommand),
    Inspect(inspect::InspectCommand),
}

impl DashcapCommand {
    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        match self {
            DashcapCommand::Vod(command) => command.run(config).await,
            DashcapCommand::Live(command) => command.run(config).await,
            DashcapCommand::Process(command) => command.run(config).await,
            DashcapCommand::Inspect(command) => command.run(config).await,
        }
    }
}

#[derive(Args, Clone, Debug, Default)]
pub struct HttpOptions {
    /// Maximum number of segments fetched at the same time
    #[clap(long, alias = "threads")]
    pub concurrency: Option<NonZeroU32>,

    /// HTTP timeout, in seconds
    #[clap(short, long)]
    pub timeout: Option<u64>,

    /// User agent of every request
    #[clap(long)]
    pub user_agent: Option<String>,
}

impl HttpOptions {
    pub fn acquirer_config(&self, config: &Config) -> AcquirerConfig {
        let mut acquirer = config.acquirer_config();
        if let Some(concurrency) = self.concurrency {
            acquirer = acquirer.with_concurrency(concurrency);
        }
        if let Some(timeout) = self.timeout {
            acquirer = acquirer.with_timeout(Duration::from_secs(timeout));
        }
        if let Some(user_agent) = &self.user_agent {
            acquirer = acquirer.with_user_agent(user_agent);
        }
        acquirer
    }

    pub fn acquirer(&self, config: &Config, output_dir: &Path) -> anyhow::Result<SegmentAcquirer> {
        Ok(SegmentAcquirer::from_config(
            &self.acquirer_config(config),
            output_dir,
        )?)
    }
}

/// Session of the catalog the manifest URL was obtained from
#[derive(Args, Clone, Debug, Default)]
pub struct SessionOptions {
    /// Access token stored in the session record
    #[clap(long, env = "DASHCAP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Cookies sent with every request, `name=value`
    #[clap(long = "cookie")]
    pub cookies: Vec<String>,
}

/// Reassembly related arguments
#[derive(Args, Clone, Debug, Default)]
pub struct MergeOptions {
    /// Decryption key, `<kid>:<key>`
    #[clap(long = "key")]
    pub keys: Vec<String>,

    /// JSON file mapping KIDs to keys
    #[clap(long)]
    pub keys_file: Option<PathBuf>,

    /// Remove segment directories and intermediate files after success
    #[clap(long)]
    pub cleanup: bool,

    /// File name of the final output inside the output directory
    #[clap(long, default_value = "output.mp4")]
    pub output_name: String,
}

impl MergeOptions {
    /// `None` when no key was given at all.
    pub fn key_map(&self) -> anyhow::Result<Option<KeyMap>> {
        let mut keys = match &self.keys_file {
            Some(path) => KeyMap::from_json(&std::fs::read_to_string(path)?)?,
            None => KeyMap::new(),
        };
        for pair in &self.keys {
            let (kid, key) = pair
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("Invalid key pair {pair:?}, expected <kid>:<key>"))?;
            keys.insert(kid, key)?;
        }

        Ok((!keys.is_empty()).then_some(keys))
    }
}

/// Run the pipeline and compare the result against `expected` seconds when
/// given. Returns whether the check passed.
pub async fn reassemble<D, M, P>(
    pipeline: &ReassemblyPipeline<D, M, P>,
    options: &MergeOptions,
    expected: Option<f64>,
    tolerance: f64,
) -> anyhow::Result<bool>
where
    D: Decryptor,
    M: Muxer,
    P: Prober,
{
    let keys = options.key_map()?;
    let output = pipeline
        .process(&options.output_name, keys.as_ref(), options.cleanup)
        .await?;

    let Some(expected) = expected else {
        return Ok(true);
    };
    let report = pipeline.verify_integrity(&output, expected, tolerance).await;
    if report.passed {
        log::info!(
            "Duration check passed: {:.2}s of {:.2}s",
            report.actual,
            report.expected
        );
    } else {
        log::error!(
            "Duration check failed: {:.2}s of {:.2}s, tolerance {:.2}s. Segments may be missing.",
            report.actual,
            report.expected,
            report.tolerance
        );
    }
    Ok(report.passed)
}
