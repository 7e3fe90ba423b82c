use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;

use crate::error::DashcapResult;

/// Marker in the file name of initialization segments.
pub const INIT_MARKER: &str = "init";

static SEGMENT_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_(\d+)\.").unwrap());

/// The number in the first `_<number>.` of a segment file name, 0 if there
/// is none.
pub fn segment_number(file_name: &str) -> u64 {
    SEGMENT_NUMBER_REGEX
        .captures(file_name)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn is_segment_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("mp4" | "m4s")
    )
}

/// Segment files of a track directory in playback order: initialization
/// files first, then media segments by their number.
///
/// A missing directory yields no segments.
pub async fn sorted_segments(track_dir: impl AsRef<Path>) -> DashcapResult<Vec<PathBuf>> {
    let track_dir = track_dir.as_ref();
    if !track_dir.is_dir() {
        log::warn!("Track directory {} does not exist.", track_dir.display());
        return Ok(Vec::new());
    }

    let mut init = Vec::new();
    let mut media = Vec::new();
    let mut entries = tokio::fs::read_dir(track_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || !is_segment_file(&path) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains(INIT_MARKER) {
            init.push((name, path));
        } else {
            media.push((segment_number(&name), name, path));
        }
    }

    init.sort();
    media.sort();
    Ok(init
        .into_iter()
        .map(|(_, path)| path)
        .chain(media.into_iter().map(|(_, _, path)| path))
        .collect())
}
