//! Side files shared with the license exchange.
//!
//! The output directory of a download holds a verbatim copy of the manifest
//! and a JSON record with everything needed to request keys for it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::DashcapResult, protection::ProtectionRecord, util::http::HttpClient};

pub const MANIFEST_SNAPSHOT: &str = "manifest.mpd";
pub const SESSION_RECORD: &str = "drm_info.json";

/// Credentials of the catalog session the manifest URL was obtained with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    pub token: Option<String>,
    /// `name=value` cookies
    #[serde(default)]
    pub cookies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub manifest_url: Url,
    pub token: Option<String>,
    #[serde(default)]
    pub cookies: Vec<String>,
    /// Base64 Widevine `pssh` box.
    pub pssh_widevine: Option<String>,
    pub default_kid: Option<String>,
}

impl SessionRecord {
    pub fn new(
        manifest_url: Url,
        credentials: SessionCredentials,
        protection: Option<&ProtectionRecord>,
    ) -> Self {
        Self {
            manifest_url,
            token: credentials.token,
            cookies: credentials.cookies,
            pssh_widevine: protection.and_then(|p| p.pssh.clone()),
            default_kid: protection.and_then(|p| p.default_kid.clone()),
        }
    }

    pub async fn save(&self, output_dir: impl AsRef<Path>) -> DashcapResult<PathBuf> {
        let path = output_dir.as_ref().join(SESSION_RECORD);
        tokio::fs::write(&path, serde_json::to_vec_pretty(self)?).await?;
        Ok(path)
    }

    pub async fn load(output_dir: impl AsRef<Path>) -> DashcapResult<Self> {
        let data = tokio::fs::read(output_dir.as_ref().join(SESSION_RECORD)).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn credentials(&self) -> SessionCredentials {
        SessionCredentials {
            token: self.token.clone(),
            cookies: self.cookies.clone(),
        }
    }

    /// Put the recorded cookies back into `client`, scoped to the manifest
    /// URL.
    pub fn restore_cookies(&self, client: &HttpClient) {
        client.add_cookies(&self.cookies, &self.manifest_url);
    }
}

pub async fn save_manifest_snapshot(
    output_dir: impl AsRef<Path>,
    text: &str,
) -> DashcapResult<PathBuf> {
    let path = output_dir.as_ref().join(MANIFEST_SNAPSHOT);
    tokio::fs::write(&path, text).await?;
    Ok(path)
}
