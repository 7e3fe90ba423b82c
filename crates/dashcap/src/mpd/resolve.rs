use url::Url;

use super::{
    node::{Representation, SegmentTemplate},
    template::Template,
    url::merge_baseurls,
};
use crate::error::{DashcapError, DashcapResult};

/// Upper bound on the segments one timeline may expand to.
pub const MAX_TIMELINE_SEGMENTS: u64 = 1 << 20;

/// What to do with a `SegmentTemplate` that has no `SegmentTimeline`.
///
/// Segment counts derived from `@duration` are not supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingTimelinePolicy {
    /// Fail with [`DashcapError::UnsupportedTemplate`].
    #[default]
    Reject,
    /// Resolve to an empty list of segments.
    Empty,
}

/// Expand a template's timeline into absolute media segment URLs, in
/// timeline order.
///
/// `$Number$` starts at `@startNumber` and increases by one for every segment
/// an `S` element stands for (`@r + 1`). `$Time$` starts at the first `@t`
/// (0 without one), jumps to any later `@t` and advances by `@d`.
pub fn segment_urls(
    template: &SegmentTemplate<'_>,
    values: &Template,
    representation_id: &str,
    policy: MissingTimelinePolicy,
) -> DashcapResult<Vec<Url>> {
    let Some(timeline) = template.timeline() else {
        return match policy {
            MissingTimelinePolicy::Reject => Err(DashcapError::UnsupportedTemplate(
                representation_id.to_string(),
            )),
            MissingTimelinePolicy::Empty => {
                tracing::warn!(
                    representation = representation_id,
                    "SegmentTemplate has no SegmentTimeline, no segments resolved"
                );
                Ok(Vec::new())
            }
        };
    };

    let total = timeline
        .iter()
        .try_fold(0u64, |total, s| total.checked_add(s.count()))
        .filter(|total| *total <= MAX_TIMELINE_SEGMENTS);
    let Some(total) = total else {
        tracing::error!(
            representation = representation_id,
            "SegmentTimeline expands to more than {MAX_TIMELINE_SEGMENTS} segments"
        );
        return Err(DashcapError::malformed(format!(
            "SegmentTimeline of representation {representation_id:?} has too many segments"
        )));
    };

    let media = template.media();
    let mut values = values.clone();
    let mut number = template.start_number();
    let mut time = 0u64;
    let mut urls = Vec::with_capacity(total as usize);
    for entry in timeline {
        if let Some(t) = entry.time {
            time = t;
        }
        for _ in 0..entry.count() {
            values.insert(Template::NUMBER, number);
            values.insert(Template::TIME, time);
            urls.push(merge_baseurls(template.base_url(), &values.resolve(media))?);
            number = number.saturating_add(1);
            time = time.saturating_add(entry.duration);
        }
    }

    Ok(urls)
}

/// URL of the initialization segment, `None` without a template or an
/// `@initialization` pattern.
pub fn initialization_url(
    template: Option<&SegmentTemplate<'_>>,
    values: &Template,
) -> DashcapResult<Option<Url>> {
    let Some(template) = template else {
        return Ok(None);
    };
    let initialization = template.initialization();
    if initialization.is_empty() {
        return Ok(None);
    }

    let url = merge_baseurls(template.base_url(), &values.resolve(initialization))?;
    Ok(Some(url))
}

impl Representation<'_> {
    fn template_values(&self) -> Template {
        Template::for_representation(self.id(), self.bandwidth())
    }

    pub fn initialization_url(&self) -> DashcapResult<Option<Url>> {
        initialization_url(self.segment_template().as_ref(), &self.template_values())
    }

    /// Media segment URLs of this representation. A representation without
    /// any template is treated like a template without timeline.
    pub fn segment_urls(&self, policy: MissingTimelinePolicy) -> DashcapResult<Vec<Url>> {
        match self.segment_template() {
            Some(template) => segment_urls(&template, &self.template_values(), self.id(), policy),
            None => match policy {
                MissingTimelinePolicy::Reject => {
                    Err(DashcapError::UnsupportedTemplate(self.id().to_string()))
                }
                MissingTimelinePolicy::Empty => Ok(Vec::new()),
            },
        }
    }
}

/// Local file name of a segment: the last path component of its URL.
pub fn segment_filename(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
}
