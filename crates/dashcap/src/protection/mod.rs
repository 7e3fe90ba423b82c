//! Content protection records attached to AdaptationSets and Representations.

mod pssh;

use serde::{Deserialize, Serialize};

pub use pssh::{base64_decode, base64_encode, PsshBox, WIDEVINE_SYSTEM_ID};

use crate::mpd::{AdaptationSet, ContentProtection, Representation};

/// Leading bytes of the Widevine system id as they appear in
/// `ContentProtection@schemeIdUri`.
pub const WIDEVINE_SYSTEM_ID_FRAGMENT: &str = "edef8ba9";

pub fn is_widevine(scheme_id_uri: &str) -> bool {
    scheme_id_uri
        .to_ascii_lowercase()
        .contains(WIDEVINE_SYSTEM_ID_FRAGMENT)
}

/// Protection metadata forwarded to the license exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionRecord {
    pub scheme_id_uri: String,
    pub default_kid: Option<String>,
    /// Base64 `pssh` box, absent when the manifest does not carry one.
    pub pssh: Option<String>,
}

impl ProtectionRecord {
    /// Decode the payload. `None` when there is no payload, an error when
    /// the payload is not a valid box.
    pub fn pssh_box(&self) -> Option<crate::error::DashcapResult<PsshBox>> {
        self.pssh.as_deref().map(PsshBox::from_base64)
    }
}

impl From<&ContentProtection<'_>> for ProtectionRecord {
    fn from(protection: &ContentProtection<'_>) -> Self {
        Self {
            scheme_id_uri: protection.scheme_id_uri().to_string(),
            default_kid: protection.default_kid().map(str::to_string),
            pssh: protection.pssh().map(str::to_string),
        }
    }
}

/// The Widevine record of a representation, falling back to the records of
/// its AdaptationSet when the representation has none.
pub fn find_protection(
    representation: &Representation<'_>,
    adaptation_set: &AdaptationSet<'_>,
) -> Option<ProtectionRecord> {
    let first_widevine = |protections: Vec<ContentProtection<'_>>| {
        protections
            .iter()
            .find(|p| is_widevine(p.scheme_id_uri()))
            .map(ProtectionRecord::from)
    };

    first_widevine(representation.content_protections())
        .or_else(|| first_widevine(adaptation_set.content_protections()))
}
