use thiserror::Error;

use crate::mpd::MediaKind;

#[derive(Error, Debug)]
pub enum DashcapError {
    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("No period found in manifest")]
    NoPeriodFound,

    #[error("No suitable {0} representation found")]
    NoSuitableRepresentation(MediaKind),

    #[error("SegmentTemplate of representation {0:?} has no SegmentTimeline")]
    UnsupportedTemplate(String),

    #[error("Failed to fetch {url}: {source}")]
    FetchFailure {
        url: String,
        #[source]
        source: Box<DashcapError>,
    },

    #[error("{tool} failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    #[error("No {0} segments to reassemble")]
    EmptyTrack(MediaKind),

    #[error("HTTP error: {0}")]
    HttpError(reqwest::StatusCode),

    #[error("Invalid key pair: {0}")]
    InvalidKeyPair(String),

    #[error("Invalid pssh box: {0}")]
    InvalidPssh(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    RequestError(#[from] reqwest::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Base64Error(#[from] base64::DecodeError),
}

impl DashcapError {
    pub(crate) fn malformed<E>(error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::MalformedManifest(error.to_string())
    }

    pub(crate) fn tool<T, R>(tool: T, reason: R) -> Self
    where
        T: Into<String>,
        R: std::fmt::Display,
    {
        Self::ExternalTool {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether a live capture should wait and try again after this error
    /// instead of giving up.
    pub fn is_retryable(&self) -> bool {
        match self {
            DashcapError::MalformedManifest(_)
            | DashcapError::NoPeriodFound
            | DashcapError::NoSuitableRepresentation(_)
            | DashcapError::FetchFailure { .. }
            | DashcapError::HttpError(_)
            | DashcapError::RequestError(_) => true,
            _ => false,
        }
    }
}

pub type DashcapResult<T> = Result<T, DashcapError>;
