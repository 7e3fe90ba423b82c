//! Turning fetched segments into one playable file.
//!
//! Per track the segments are ordered and concatenated, optionally decrypted,
//! then both tracks are muxed. External programs do the decryption, muxing
//! and probing, behind the [`Decryptor`], [`Muxer`] and [`Prober`] traits.

mod concat;
mod ffmpeg;
mod mp4decrypt;
mod order;
mod verify;

use std::{
    future::Future,
    path::{Path, PathBuf},
    process::Output,
};

use tokio::process::Command;

pub use concat::concatenate;
pub use ffmpeg::{FfmpegMuxer, FfprobeProber};
pub use mp4decrypt::Mp4Decrypt;
pub use order::{segment_number, sorted_segments, INIT_MARKER};
pub use verify::{verify_integrity, within_tolerance, IntegrityReport, DEFAULT_TOLERANCE};

use crate::{
    decrypt::KeyMap,
    error::{DashcapError, DashcapResult},
    mpd::MediaKind,
    util::path::DashcapPathExt,
};

pub trait Decryptor {
    fn decrypt(
        &self,
        keys: &KeyMap,
        input: &Path,
        output: &Path,
    ) -> impl Future<Output = DashcapResult<()>> + Send;
}

pub trait Muxer {
    fn mux(
        &self,
        video: &Path,
        audio: Option<&Path>,
        output: &Path,
    ) -> impl Future<Output = DashcapResult<()>> + Send;
}

pub trait Prober {
    /// Duration of a media file in seconds.
    fn duration(&self, path: &Path) -> impl Future<Output = DashcapResult<f64>> + Send;
}

pub(crate) fn locate(program: &str) -> DashcapResult<PathBuf> {
    which::which(program).map_err(|e| DashcapError::tool(program, format!("not found: {e}")))
}

/// Run `command` to completion, turning a spawn failure or a non-zero exit
/// into [`DashcapError::ExternalTool`].
pub(crate) async fn run_tool(tool: &str, mut command: Command) -> DashcapResult<Output> {
    log::debug!("Running {tool}: {command:?}");
    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| DashcapError::tool(tool, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::error!("{tool} exited with {}: {}", output.status, stderr.trim());
        return Err(DashcapError::tool(
            tool,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(output)
}

pub fn encrypted_track_path(output_dir: &Path, kind: MediaKind) -> PathBuf {
    output_dir.join(format!("temp_{kind}_enc.mp4"))
}

pub fn decrypted_track_path(output_dir: &Path, kind: MediaKind) -> PathBuf {
    let mut path = encrypted_track_path(output_dir, kind);
    path.add_prefix("dec_");
    path
}

/// Reassembles the `video/` and `audio/` track directories of an output
/// directory into one file.
pub struct ReassemblyPipeline<D, M, P> {
    output_dir: PathBuf,
    decryptor: D,
    muxer: M,
    prober: P,
}

impl ReassemblyPipeline<Mp4Decrypt, FfmpegMuxer, FfprobeProber> {
    /// Pipeline using `mp4decrypt`, `ffmpeg` and `ffprobe` from `PATH`.
    ///
    /// Only `ffmpeg` is required up front. `mp4decrypt` is looked up when
    /// keys are supplied and `ffprobe` when a duration is verified.
    pub fn with_system_tools(output_dir: impl Into<PathBuf>) -> DashcapResult<Self> {
        Ok(Self::new(
            output_dir,
            Mp4Decrypt::default(),
            FfmpegMuxer::locate()?,
            FfprobeProber::default(),
        ))
    }
}

impl<D, M, P> ReassemblyPipeline<D, M, P>
where
    D: Decryptor,
    M: Muxer,
    P: Prober,
{
    pub fn new(output_dir: impl Into<PathBuf>, decryptor: D, muxer: M, prober: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            decryptor,
            muxer,
            prober,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Concatenate one track into its intermediate file. `None` when the
    /// track has no segments.
    async fn assemble_track(&self, kind: MediaKind) -> DashcapResult<Option<PathBuf>> {
        let segments = sorted_segments(self.output_dir.join(kind.as_str())).await?;
        if segments.is_empty() {
            return Ok(None);
        }

        let path = encrypted_track_path(&self.output_dir, kind);
        log::info!("Concatenating {} {kind} segment(s)...", segments.len());
        let size = concatenate(&segments, &path).await?;
        log::debug!("Wrote {size} bytes to {}", path.display());
        Ok(Some(path))
    }

    async fn decrypt_track(
        &self,
        keys: &KeyMap,
        kind: MediaKind,
        input: PathBuf,
    ) -> DashcapResult<PathBuf> {
        let output = decrypted_track_path(&self.output_dir, kind);
        log::info!("Decrypting {kind} track with {} key(s)...", keys.len());
        self.decryptor.decrypt(keys, &input, &output).await?;
        Ok(output)
    }

    /// Order, concatenate, decrypt (when `keys` is given) and mux the tracks
    /// into `<output_dir>/<output_filename>`.
    ///
    /// Muxing writes a staging file that is only renamed to the final path on
    /// success. Intermediate files are kept when any step fails, and removed
    /// together with the track directories on success when `cleanup` is set.
    pub async fn process(
        &self,
        output_filename: &str,
        keys: Option<&KeyMap>,
        cleanup: bool,
    ) -> DashcapResult<PathBuf> {
        let video = self
            .assemble_track(MediaKind::Video)
            .await?
            .ok_or(DashcapError::EmptyTrack(MediaKind::Video))?;
        let audio = self.assemble_track(MediaKind::Audio).await?;
        if audio.is_none() {
            log::warn!("No audio segments found, output will be video only.");
        }
        let mut intermediates = vec![video.clone()];
        intermediates.extend(audio.clone());

        let keys = keys.filter(|keys| !keys.is_empty());
        let (video, audio) = match keys {
            Some(keys) => {
                let video = self.decrypt_track(keys, MediaKind::Video, video).await?;
                intermediates.push(video.clone());
                let audio = match audio {
                    Some(audio) => {
                        let audio = self.decrypt_track(keys, MediaKind::Audio, audio).await?;
                        intermediates.push(audio.clone());
                        Some(audio)
                    }
                    None => None,
                };
                (video, audio)
            }
            None => {
                log::info!("No keys supplied, muxing tracks as they are.");
                (video, audio)
            }
        };

        let output = self.output_dir.join(output_filename);
        let mut staging = output.clone();
        staging.add_suffix("staging");

        log::info!("Muxing into {}...", output.display());
        if let Err(e) = self.muxer.mux(&video, audio.as_deref(), &staging).await {
            if staging.exists() {
                _ = tokio::fs::remove_file(&staging).await;
            }
            return Err(e);
        }
        tokio::fs::rename(&staging, &output).await?;

        if cleanup {
            self.cleanup(&intermediates).await;
        }

        log::info!(
            "All finished. Please checkout your file at {}",
            output.display()
        );
        Ok(output)
    }

    /// Remove track directories and intermediate files. Failures are logged.
    async fn cleanup(&self, intermediates: &[PathBuf]) {
        for kind in [MediaKind::Video, MediaKind::Audio] {
            let dir = self.output_dir.join(kind.as_str());
            if dir.exists() {
                if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                    log::warn!("Failed to remove {}: {e}", dir.display());
                }
            }
        }
        for path in intermediates {
            if let Err(e) = tokio::fs::remove_file(path).await {
                log::warn!("Failed to remove {}: {e}", path.display());
            }
        }
    }

    pub async fn verify_integrity(
        &self,
        path: &Path,
        expected: f64,
        tolerance: f64,
    ) -> IntegrityReport {
        verify_integrity(&self.prober, path, expected, tolerance).await
    }
}
