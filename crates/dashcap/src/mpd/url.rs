use url::Url;

use crate::error::DashcapResult;

/// Resolve a `BaseURL` (or any URL reference) against the effective base of
/// its parent. Absolute references replace the base entirely.
pub(crate) fn merge_baseurls(current: &Url, new: &str) -> DashcapResult<Url> {
    // Examples
    //
    // merge_baseurls(https://example.com/live/manifest.mpd, video/) =>
    //   https://example.com/live/video/
    //
    // merge_baseurls(https://example.com/live/manifest.mpd, /video/) =>
    //   https://example.com/video/
    //
    // merge_baseurls(https://example.com/live/manifest.mpd, https://cdn.example.net/a/) =>
    //   https://cdn.example.net/a/
    Ok(current.join(new.trim())?)
}
