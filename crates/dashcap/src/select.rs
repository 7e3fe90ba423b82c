use std::cmp::Reverse;

use crate::{
    error::{DashcapError, DashcapResult},
    mpd::{AdaptationSet, ManifestDocument, MediaKind, Period, Representation},
    protection::{find_protection, ProtectionRecord},
};

/// The representation with the highest bandwidth. Ties go to the one that
/// comes first in the document.
pub fn select_best<'a>(adaptation_set: &AdaptationSet<'a>) -> Option<Representation<'a>> {
    // min_by_key keeps the first of equal elements, max_by_key the last
    adaptation_set
        .representations()
        .into_iter()
        .min_by_key(|r| Reverse(r.bandwidth()))
}

#[derive(Debug, Clone)]
pub struct StreamSelection<'a> {
    pub video: Representation<'a>,
    pub audio: Representation<'a>,
    pub height: Option<u64>,
    pub bandwidth: u64,
    /// `MPD@mediaPresentationDuration` in seconds, 0 when absent.
    pub duration: f64,
    /// `None` for unprotected content.
    pub protection: Option<ProtectionRecord>,
}

/// Pick the best video and audio representation of `period`.
pub fn select_streams<'a>(
    document: &ManifestDocument,
    period: &Period<'a>,
) -> DashcapResult<StreamSelection<'a>> {
    let (video_set, video) = select_kind(period, MediaKind::Video)?;
    let (_, audio) = select_kind(period, MediaKind::Audio)?;

    let protection = find_protection(&video, &video_set);
    if protection.is_none() {
        tracing::warn!(
            representation = video.id(),
            "No Widevine protection found, treating stream as unencrypted"
        );
    }

    let duration = document
        .media_presentation_duration()
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    tracing::info!(
        video = video.id(),
        audio = audio.id(),
        height = video.height(),
        bandwidth = video.bandwidth(),
        "Selected representations"
    );

    Ok(StreamSelection {
        height: video.height(),
        bandwidth: video.bandwidth(),
        video,
        audio,
        duration,
        protection,
    })
}

fn select_kind<'a>(
    period: &Period<'a>,
    kind: MediaKind,
) -> DashcapResult<(AdaptationSet<'a>, Representation<'a>)> {
    period
        .adaptation_sets(Some(kind))
        .into_iter()
        .find_map(|set| select_best(&set).map(|best| (set, best)))
        .ok_or(DashcapError::NoSuitableRepresentation(kind))
}
