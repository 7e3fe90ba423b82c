pub mod decrypt;
pub mod download;
pub mod error;
pub mod live;
pub mod merge;
pub mod mpd;
pub mod protection;
pub mod select;
pub mod session;
pub mod source;
pub mod util;
pub mod vod;

pub use decrypt::KeyMap;
pub use download::{AcquirerConfig, BatchReport, FetchOutcome, SegmentAcquirer};
pub use error::{DashcapError, DashcapResult};
pub use live::{CaptureConfig, CaptureLoop, CaptureReport, CaptureState};
pub use merge::{IntegrityReport, ReassemblyPipeline};
pub use mpd::{ManifestDocument, MediaKind, MissingTimelinePolicy};
pub use protection::ProtectionRecord;
pub use select::{select_best, select_streams, StreamSelection};
pub use session::{SessionCredentials, SessionRecord};
pub use source::{HttpManifestSource, ManifestResponse, ManifestSource};
pub use util::http::HttpClient;
pub use vod::{VodDownload, VodDownloader};
