use std::{fmt, str::FromStr};

use url::Url;

use super::{
    attr::{parse_attr, parse_optional_attr, Lenient},
    element::Element,
    url::merge_baseurls,
    CENC_NAMESPACE, MPD_NAMESPACE,
};

/// An element of the manifest together with its effective base URL.
///
/// Every node type wraps one of these; the effective base is computed once,
/// from the parent's effective base and the node's own `BaseURL` child.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    element: &'a Element,
    base_url: Url,
}

impl<'a> Node<'a> {
    pub fn new(element: &'a Element, parent_base_url: &Url) -> Self {
        Self {
            base_url: effective_base_url(element, parent_base_url),
            element,
        }
    }

    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn raw_attr(&self, name: &str) -> Option<&'a str> {
        self.element.attribute(name)
    }

    /// Read a typed attribute, logging and falling back to `default` when the
    /// value can not be parsed.
    pub fn attr<T>(&self, name: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        read_attr(self.element, name, default)
    }

    pub fn optional_attr<T>(&self, name: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        report(self.element, name, parse_optional_attr(self.raw_attr(name)))
    }

    pub(super) fn children(&self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.element.children(MPD_NAMESPACE, name)
    }

    pub(super) fn child(&self, name: &str) -> Option<&'a Element> {
        self.element.child(MPD_NAMESPACE, name)
    }
}

fn read_attr<T>(element: &Element, name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    report(element, name, parse_attr(element.attribute(name), default))
}

fn report<T>(element: &Element, name: &str, value: Lenient<T>) -> T {
    if let Lenient::Fallback { raw, reason, .. } = &value {
        tracing::warn!(
            element = %element.name,
            attribute = name,
            value = %raw,
            "Invalid attribute value, using default: {reason}"
        );
    }
    value.into_value()
}

fn effective_base_url(element: &Element, parent: &Url) -> Url {
    let local = element
        .child(MPD_NAMESPACE, "BaseURL")
        .map(Element::text)
        .unwrap_or_default();
    if local.is_empty() {
        return parent.clone();
    }

    match merge_baseurls(parent, local) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(base = %parent, reference = local, "Ignoring invalid BaseURL: {e}");
            parent.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        if mime_type.contains("video") {
            Some(MediaKind::Video)
        } else if mime_type.contains("audio") {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    /// Name of the per-track directory in the output layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Period<'a>(Node<'a>);

impl<'a> Period<'a> {
    pub fn new(node: Node<'a>) -> Self {
        Self(node)
    }

    pub fn base_url(&self) -> &Url {
        self.0.base_url()
    }

    pub fn id(&self) -> Option<&'a str> {
        self.0.raw_attr("id")
    }

    pub fn start(&self) -> Option<&'a str> {
        self.0.raw_attr("start")
    }

    /// AdaptationSets in document order, optionally restricted to one kind.
    pub fn adaptation_sets(&self, filter: Option<MediaKind>) -> Vec<AdaptationSet<'a>> {
        self.0
            .children("AdaptationSet")
            .map(|el| AdaptationSet::new(Node::new(el, self.base_url())))
            .filter(|set| filter.is_none() || set.media_kind() == filter)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct AdaptationSet<'a>(Node<'a>);

impl<'a> AdaptationSet<'a> {
    pub fn new(node: Node<'a>) -> Self {
        Self(node)
    }

    pub fn base_url(&self) -> &Url {
        self.0.base_url()
    }

    pub fn mime_type(&self) -> &'a str {
        self.0.raw_attr("mimeType").unwrap_or_default()
    }

    pub fn content_type(&self) -> &'a str {
        self.0.raw_attr("contentType").unwrap_or_default()
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime_type(self.mime_type())
            .or_else(|| MediaKind::from_mime_type(self.content_type()))
    }

    pub fn is_video(&self) -> bool {
        self.media_kind() == Some(MediaKind::Video)
    }

    pub fn is_audio(&self) -> bool {
        self.media_kind() == Some(MediaKind::Audio)
    }

    pub fn representations(&self) -> Vec<Representation<'a>> {
        let shared_template = self.0.child("SegmentTemplate");
        self.0
            .children("Representation")
            .map(|el| Representation::new(Node::new(el, self.base_url()), shared_template))
            .collect()
    }

    pub fn content_protections(&self) -> Vec<ContentProtection<'a>> {
        content_protections(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Representation<'a> {
    node: Node<'a>,
    /// SegmentTemplate declared on the parent AdaptationSet.
    shared_template: Option<&'a Element>,
}

impl<'a> Representation<'a> {
    pub fn new(node: Node<'a>, shared_template: Option<&'a Element>) -> Self {
        Self {
            node,
            shared_template,
        }
    }

    pub fn base_url(&self) -> &Url {
        self.node.base_url()
    }

    /// Identifier used for `$RepresentationID$`. Never interpreted as a number.
    pub fn id(&self) -> &'a str {
        self.node.raw_attr("id").unwrap_or_default()
    }

    pub fn bandwidth(&self) -> u64 {
        self.node.attr("bandwidth", 0)
    }

    pub fn width(&self) -> Option<u64> {
        self.node.optional_attr("width")
    }

    pub fn height(&self) -> Option<u64> {
        self.node.optional_attr("height")
    }

    pub fn codecs(&self) -> &'a str {
        self.node.raw_attr("codecs").unwrap_or_default()
    }

    pub fn content_protections(&self) -> Vec<ContentProtection<'a>> {
        content_protections(&self.node)
    }

    /// The Representation's own SegmentTemplate, or the one inherited from
    /// its AdaptationSet.
    pub fn segment_template(&self) -> Option<SegmentTemplate<'a>> {
        self.node
            .child("SegmentTemplate")
            .or(self.shared_template)
            .map(|el| SegmentTemplate::new(Node::new(el, self.base_url())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    /// `@t`, presentation time of the first segment of this entry.
    pub time: Option<u64>,
    /// `@d`, duration in timescale units.
    pub duration: u64,
    /// `@r`, additional segments with the same duration.
    pub repeat: i64,
}

impl TimelineEntry {
    /// Number of segments this entry stands for, `r + 1`.
    pub fn count(&self) -> u64 {
        if self.repeat < 0 {
            0
        } else {
            self.repeat as u64 + 1
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmentTemplate<'a>(Node<'a>);

impl<'a> SegmentTemplate<'a> {
    pub fn new(node: Node<'a>) -> Self {
        Self(node)
    }

    pub fn base_url(&self) -> &Url {
        self.0.base_url()
    }

    pub fn initialization(&self) -> &'a str {
        self.0.raw_attr("initialization").unwrap_or_default()
    }

    pub fn media(&self) -> &'a str {
        self.0.raw_attr("media").unwrap_or_default()
    }

    pub fn start_number(&self) -> u64 {
        self.0.attr("startNumber", 1)
    }

    pub fn timescale(&self) -> u64 {
        self.0.attr("timescale", 1)
    }

    /// Entries of the `SegmentTimeline` child, `None` if there is no timeline.
    pub fn timeline(&self) -> Option<Vec<TimelineEntry>> {
        let timeline = self.0.child("SegmentTimeline")?;
        let entries = timeline
            .children(MPD_NAMESPACE, "S")
            .map(|s| TimelineEntry {
                time: report(s, "t", parse_optional_attr(s.attribute("t"))),
                duration: read_attr(s, "d", 0),
                repeat: read_attr(s, "r", 0),
            })
            .collect();
        Some(entries)
    }
}

#[derive(Debug, Clone)]
pub struct ContentProtection<'a>(Node<'a>);

impl<'a> ContentProtection<'a> {
    pub fn new(node: Node<'a>) -> Self {
        Self(node)
    }

    pub fn scheme_id_uri(&self) -> &'a str {
        self.0.raw_attr("schemeIdUri").unwrap_or_default()
    }

    pub fn value(&self) -> &'a str {
        self.0.raw_attr("value").unwrap_or_default()
    }

    /// `cenc:default_KID`
    pub fn default_kid(&self) -> Option<&'a str> {
        self.0
            .element()
            .attribute_ns(CENC_NAMESPACE, "default_KID")
            .map(str::trim)
            .filter(|kid| !kid.is_empty())
    }

    /// Base64 text of the `cenc:pssh` child.
    pub fn pssh(&self) -> Option<&'a str> {
        self.0
            .element()
            .child(CENC_NAMESPACE, "pssh")
            .map(Element::text)
            .filter(|text| !text.is_empty())
    }
}

fn content_protections<'a>(node: &Node<'a>) -> Vec<ContentProtection<'a>> {
    node.children("ContentProtection")
        .map(|el| ContentProtection::new(Node::new(el, node.base_url())))
        .collect()
}
