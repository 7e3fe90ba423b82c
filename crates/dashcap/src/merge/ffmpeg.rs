use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use tokio::process::Command;

use super::{locate, run_tool, Muxer, Prober};
use crate::error::{DashcapError, DashcapResult};

/// Stream-copy muxing with the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    program: PathBuf,
}

impl FfmpegMuxer {
    pub const PROGRAM: &'static str = "ffmpeg";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn locate() -> DashcapResult<Self> {
        locate(Self::PROGRAM).map(Self::new)
    }
}

fn ffmpeg_args(video: &Path, audio: Option<&Path>, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), video.into()];
    if let Some(audio) = audio {
        args.push("-i".into());
        args.push(audio.into());
    }

    // Map all streams and use copy codec
    let inputs = if audio.is_some() { 2 } else { 1 };
    for i in 0..inputs {
        args.push("-map".into());
        args.push(i.to_string().into());
    }
    args.extend(["-c", "copy", "-movflags", "+faststart"].map(OsString::from));
    args.push(output.into());
    args
}

impl Muxer for FfmpegMuxer {
    async fn mux(&self, video: &Path, audio: Option<&Path>, output: &Path) -> DashcapResult<()> {
        let mut command = Command::new(&self.program);
        command.args(ffmpeg_args(video, audio, output));
        run_tool(Self::PROGRAM, command).await?;
        Ok(())
    }
}

/// Container duration from `ffprobe`. The default instance looks the
/// program up on `PATH` when a duration is first requested.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProber {
    program: Option<PathBuf>,
}

impl FfprobeProber {
    pub const PROGRAM: &'static str = "ffprobe";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> DashcapResult<PathBuf> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => locate(Self::PROGRAM),
        }
    }
}

impl Prober for FfprobeProber {
    async fn duration(&self, path: &Path) -> DashcapResult<f64> {
        let mut command = Command::new(self.program()?);
        command
            .args(["-v", "error", "-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path);
        let output = run_tool(Self::PROGRAM, command).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|e| DashcapError::tool(Self::PROGRAM, format!("unexpected output {stdout:?}: {e}")))
    }
}
