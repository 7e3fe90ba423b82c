use std::path::{Path, PathBuf};

use anyhow::Context;
use dashcap::{
    merge::{FfmpegMuxer, FfprobeProber, Mp4Decrypt, DEFAULT_TOLERANCE},
    AcquirerConfig, ReassemblyPipeline,
};
use serde::{Deserialize, Serialize};

/// Defaults read from `--config`. Command line arguments take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub tools: ToolsConfig,
    pub verify: VerifyConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub concurrency: Option<u32>,
    /// Seconds
    pub timeout: Option<u64>,
    pub user_agent: Option<String>,
}

/// External programs, looked up on `PATH` when not set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub mp4decrypt: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Seconds
    pub tolerance: f64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn acquirer_config(&self) -> AcquirerConfig {
        let mut config = AcquirerConfig::default();
        if let Some(concurrency) = self.http.concurrency.and_then(|c| c.try_into().ok()) {
            config = config.with_concurrency(concurrency);
        }
        if let Some(timeout) = self.http.timeout {
            config = config.with_timeout(std::time::Duration::from_secs(timeout));
        }
        if let Some(user_agent) = &self.http.user_agent {
            config = config.with_user_agent(user_agent);
        }
        config
    }

    pub fn pipeline(
        &self,
        output_dir: &Path,
    ) -> anyhow::Result<ReassemblyPipeline<Mp4Decrypt, FfmpegMuxer, FfprobeProber>> {
        let decryptor = match &self.tools.mp4decrypt {
            Some(program) => Mp4Decrypt::new(program),
            None => Mp4Decrypt::default(),
        };
        let muxer = match &self.tools.ffmpeg {
            Some(program) => FfmpegMuxer::new(program),
            None => FfmpegMuxer::locate()?,
        };
        let prober = match &self.tools.ffprobe {
            Some(program) => FfprobeProber::new(program),
            None => FfprobeProber::default(),
        };
        Ok(ReassemblyPipeline::new(output_dir, decryptor, muxer, prober))
    }
}
