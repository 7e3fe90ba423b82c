use std::future::Future;

use url::Url;

use crate::{
    error::{DashcapError, DashcapResult},
    util::http::HttpClient,
};

/// Manifest text together with the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct ManifestResponse {
    pub text: String,
    /// Base of relative URLs in the manifest, i.e. the URL after redirects.
    pub url: Url,
}

/// Where manifests come from. Live capture refetches through this on every
/// cycle.
pub trait ManifestSource {
    fn fetch_manifest(&self) -> impl Future<Output = DashcapResult<ManifestResponse>> + Send;
}

#[derive(Clone)]
pub struct HttpManifestSource {
    client: HttpClient,
    url: Url,
}

impl HttpManifestSource {
    pub fn new(client: HttpClient, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl ManifestSource for HttpManifestSource {
    async fn fetch_manifest(&self) -> DashcapResult<ManifestResponse> {
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            if let Ok(body) = response.text().await {
                tracing::warn!("Error body: {body}");
            }
            return Err(DashcapError::HttpError(status));
        }

        let url = response.url().clone();
        let text = response.text().await?;
        Ok(ManifestResponse { text, url })
    }
}
