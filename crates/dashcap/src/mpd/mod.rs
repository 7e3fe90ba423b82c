//! Read-only model of an MPEG-DASH manifest.
//!
//! Only the `SegmentTemplate` + `SegmentTimeline` profile is modeled. Every
//! node carries its effective base URL, computed from the chain
//! `MPD -> Period -> AdaptationSet -> Representation -> SegmentTemplate`
//! starting at the URL the manifest was fetched from.

pub mod attr;
pub mod duration;
pub mod element;
pub mod node;
pub mod resolve;
pub mod template;
mod url;

use std::time::Duration;

use ::url::Url;

pub use node::{
    AdaptationSet, ContentProtection, MediaKind, Node, Period, Representation, SegmentTemplate,
    TimelineEntry,
};
pub use resolve::MissingTimelinePolicy;

use crate::error::{DashcapError, DashcapResult};
use element::{parse_tree, Element};

pub const MPD_NAMESPACE: &str = "urn:mpeg:dash:schema:mpd:2011";
pub const CENC_NAMESPACE: &str = "urn:mpeg:cenc:2013";

#[derive(Debug, Clone)]
pub struct ManifestDocument {
    root: Element,
    source_url: Url,
}

impl ManifestDocument {
    /// Parse manifest text. `source_url` is the URL the text was served from
    /// and acts as the parent base URL of the document root.
    pub fn parse(text: &str, source_url: Url) -> DashcapResult<Self> {
        let root = parse_tree(text)?;
        if root.name != "MPD" || root.namespace.as_deref() != Some(MPD_NAMESPACE) {
            return Err(DashcapError::MalformedManifest(format!(
                "expected <MPD> in namespace {MPD_NAMESPACE}, found <{}> in {}",
                root.name,
                root.namespace.as_deref().unwrap_or("no namespace"),
            )));
        }

        Ok(Self { root, source_url })
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    fn root(&self) -> Node<'_> {
        Node::new(&self.root, &self.source_url)
    }

    pub fn base_url(&self) -> Url {
        self.root().base_url().clone()
    }

    /// `MPD@type`, `static` when absent.
    pub fn presentation_type(&self) -> &str {
        self.root.attribute("type").unwrap_or("static")
    }

    pub fn periods(&self) -> Vec<Period<'_>> {
        let root = self.root();
        root.children("Period")
            .map(|el| Period::new(Node::new(el, root.base_url())))
            .collect()
    }

    /// The first period in document order.
    ///
    /// This does not try to tell advertisements from content, see
    /// [`crate::live::is_content`] for the heuristic used while recording.
    pub fn content_period(&self) -> DashcapResult<Period<'_>> {
        self.periods()
            .into_iter()
            .next()
            .ok_or(DashcapError::NoPeriodFound)
    }

    pub fn media_presentation_duration(&self) -> Option<Duration> {
        self.root
            .attribute("mediaPresentationDuration")
            .and_then(duration::parse_xs_duration)
    }
}
