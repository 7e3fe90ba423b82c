use dashcap::{
    session::{MANIFEST_SNAPSHOT, SESSION_RECORD},
    AcquirerConfig, DashcapError, HttpManifestSource, SegmentAcquirer, SessionCredentials,
    SessionRecord, VodDownloader,
};
use url::Url;

use crate::{requests_ending_with, setup_mock_server, AssertWrapper, VOD_MANIFEST};

fn downloader(manifest_url: &str, output_dir: &std::path::Path) -> VodDownloader<HttpManifestSource> {
    let acquirer =
        SegmentAcquirer::from_config(&AcquirerConfig::default(), output_dir).assert_success();
    let source = HttpManifestSource::new(
        acquirer.client().clone(),
        Url::parse(manifest_url).unwrap(),
    );
    VodDownloader::new(source, acquirer)
}

#[tokio::test]
async fn test_vod_download() -> anyhow::Result<()> {
    crate::init_test_tracing();
    let (url, server) = setup_mock_server(VOD_MANIFEST).await;
    let dir = tempfile::tempdir()?;

    let download = downloader(&url, dir.path())
        .with_credentials(SessionCredentials {
            token: Some("token".to_string()),
            cookies: vec!["sid=1".to_string()],
        })
        .download()
        .await
        .assert_success();

    assert_eq!(download.video_id, "v1080");
    assert_eq!(download.audio_id, "a128");
    assert_eq!(download.duration, 12.0);
    // 2 init + 3 video + 5 audio
    assert_eq!(download.report.fetched, 10);
    assert!(download.report.is_complete());

    assert_eq!(
        std::fs::read_to_string(dir.path().join(MANIFEST_SNAPSHOT))?,
        VOD_MANIFEST
    );
    assert_eq!(download.session_record, dir.path().join(SESSION_RECORD));

    let record = SessionRecord::load(dir.path()).await?;
    assert_eq!(record.manifest_url.as_str(), url);
    assert_eq!(record.token.as_deref(), Some("token"));
    assert_eq!(record.cookies, ["sid=1"]);
    assert_eq!(record.pssh_widevine, download.protection.and_then(|p| p.pssh));
    assert!(record.pssh_widevine.is_some());
    assert_eq!(record.default_kid, None);

    for name in ["init.mp4", "seg_1.m4s", "seg_3.m4s"] {
        assert!(dir.path().join("video").join(name).is_file());
    }
    for name in ["init.mp4", "seg_1.m4s", "seg_5.m4s"] {
        assert!(dir.path().join("audio").join(name).is_file());
    }

    // Resuming into the same directory requests the manifest only
    let requests = server.received_requests().await.unwrap_or_default().len();
    let download = downloader(&url, dir.path()).download().await.assert_success();
    assert_eq!(download.report.fetched, 0);
    assert_eq!(download.report.skipped, 10);
    assert_eq!(
        server.received_requests().await.unwrap_or_default().len(),
        requests + 1
    );
    Ok(())
}

#[tokio::test]
async fn test_vod_without_timeline() -> anyhow::Result<()> {
    let manifest = VOD_MANIFEST.replace(
        "<SegmentTimeline>\n          <S t=\"0\" d=\"4000\" r=\"2\"/>\n        </SegmentTimeline>",
        "",
    );
    assert_ne!(manifest, VOD_MANIFEST);
    let (url, server) = setup_mock_server(&manifest).await;
    let dir = tempfile::tempdir()?;

    let result = downloader(&url, dir.path()).download().await;
    assert!(matches!(result, Err(DashcapError::UnsupportedTemplate(id)) if id == "v1080"));

    // the snapshot is written before anything is resolved
    assert!(dir.path().join(MANIFEST_SNAPSHOT).is_file());
    assert_eq!(requests_ending_with(&server, ".m4s").await, 0);
    assert_eq!(requests_ending_with(&server, "init.mp4").await, 0);
    Ok(())
}

#[tokio::test]
async fn test_vod_malformed_manifest() -> anyhow::Result<()> {
    let (url, _server) = setup_mock_server("<MPD").await;
    let dir = tempfile::tempdir()?;

    let result = downloader(&url, dir.path()).download().await;
    assert!(matches!(result, Err(DashcapError::MalformedManifest(_))));
    Ok(())
}
