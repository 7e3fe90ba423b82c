use std::num::NonZeroU32;

use dashcap::{AcquirerConfig, DashcapError, FetchOutcome, SegmentAcquirer};
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{client, mount_segments, AssertWrapper};

fn segment_urls(server: &MockServer, count: usize) -> Vec<Url> {
    (1..=count)
        .map(|i| {
            Url::parse(&format!("{}/media/v1/seg_{i}.m4s", server.uri())).unwrap()
        })
        .collect()
}

#[tokio::test]
async fn test_fetch_one() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_segments(&server, "^/media/").await;
    let dir = tempfile::tempdir()?;
    let acquirer = SegmentAcquirer::new(client(), dir.path(), NonZeroU32::MIN);

    let url = Url::parse(&format!("{}/media/v1/init.mp4", server.uri()))?;
    let outcome = acquirer.fetch_one(&url, "video").await.assert_success();
    assert_eq!(outcome, FetchOutcome::Fetched(7));
    assert_eq!(std::fs::read(dir.path().join("video/init.mp4"))?, b"segment");

    let outcome = acquirer.fetch_one(&url, "video").await.assert_success();
    assert_eq!(outcome, FetchOutcome::Skipped);
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_fetch_batch_is_idempotent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_segments(&server, "^/media/").await;
    let dir = tempfile::tempdir()?;
    let acquirer = SegmentAcquirer::from_config(
        &AcquirerConfig::default().with_concurrency(NonZeroU32::new(3).unwrap()),
        dir.path(),
    )?;
    let urls = segment_urls(&server, 10);

    let report = acquirer.fetch_batch(&urls, "video").await;
    assert_eq!(report.fetched, 10);
    assert!(report.is_complete());
    let requests = server.received_requests().await.unwrap_or_default().len();
    assert_eq!(requests, 10);

    let report = acquirer.fetch_batch(&urls, "video").await;
    assert_eq!(report.fetched, 0);
    assert_eq!(report.skipped, 10);
    assert_eq!(
        server.received_requests().await.unwrap_or_default().len(),
        requests
    );

    for i in 1..=10 {
        assert!(dir.path().join(format!("video/seg_{i}.m4s")).is_file());
    }
    Ok(())
}

#[tokio::test]
async fn test_failed_job_does_not_abort_batch() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/v1/seg_3.m4s"))
        .respond_with(ResponseTemplate::new(404))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_segments(&server, "^/media/").await;

    let dir = tempfile::tempdir()?;
    let acquirer = SegmentAcquirer::new(client(), dir.path(), NonZeroU32::new(4).unwrap());
    let urls = segment_urls(&server, 5);

    let report = acquirer.fetch_batch(&urls, "audio").await;
    assert_eq!(report.fetched, 4);
    assert_eq!(report.failed, [urls[2].clone()]);
    assert!(!dir.path().join("audio/seg_3.m4s").exists());
    assert!(!dir.path().join("audio/seg_3.m4s.part").exists());

    let error = acquirer.fetch_one(&urls[2], "audio").await.unwrap_err();
    match error {
        DashcapError::FetchFailure { url, source } => {
            assert_eq!(url, urls[2].as_str());
            assert!(matches!(*source, DashcapError::HttpError(status) if status.as_u16() == 404));
        }
        e => panic!("unexpected error: {e}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_unreachable_host() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let acquirer = SegmentAcquirer::new(client(), dir.path(), NonZeroU32::MIN);

    // nothing listens on the discard port
    let urls = vec![Url::parse("http://127.0.0.1:9/seg_1.m4s")?];
    let report = acquirer.fetch_batch(&urls, "video").await;
    assert_eq!(report.failed, urls);
    assert!(!dir.path().join("video/seg_1.m4s").exists());
    Ok(())
}
