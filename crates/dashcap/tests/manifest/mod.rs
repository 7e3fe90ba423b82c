use dashcap::{
    merge::segment_number,
    mpd::resolve::segment_filename,
    protection::find_protection,
    select_best, select_streams, DashcapError, HttpManifestSource, ManifestDocument,
    ManifestSource, MediaKind, MissingTimelinePolicy,
};
use url::Url;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{client, setup_mock_server, AssertWrapper, VOD_MANIFEST};

fn vod_document() -> ManifestDocument {
    ManifestDocument::parse(
        VOD_MANIFEST,
        Url::parse("https://example.com/vod/manifest.mpd").unwrap(),
    )
    .assert_success()
}

#[test]
fn test_vod_manifest_model() {
    let document = vod_document();
    assert_eq!(document.presentation_type(), "static");
    assert_eq!(document.base_url().as_str(), "https://example.com/vod/media/");

    let period = document.content_period().assert_success();
    assert_eq!(period.id(), Some("1"));
    assert_eq!(period.start(), Some("PT0S"));

    let videos = period.adaptation_sets(Some(MediaKind::Video));
    let audios = period.adaptation_sets(Some(MediaKind::Audio));
    assert_eq!(videos.len(), 1);
    assert_eq!(audios.len(), 1);
    assert_eq!(period.adaptation_sets(None).len(), 2);

    let representations = videos[0].representations();
    assert_eq!(representations.len(), 3);
    assert_eq!(representations[0].codecs(), "avc1.4d401f");
    assert_eq!(representations[0].width(), Some(960));

    // shared SegmentTemplate, resolved against each representation
    let template = representations[0].segment_template().assert_success();
    assert_eq!(template.timescale(), 1000);
    assert_eq!(template.start_number(), 1);
    assert_eq!(
        representations[1].initialization_url().assert_success(),
        Some(Url::parse("https://example.com/vod/media/v1080/init.mp4").unwrap())
    );
}

#[test]
fn test_vod_selection() {
    let document = vod_document();
    let period = document.content_period().assert_success();

    let best = select_best(&period.adaptation_sets(Some(MediaKind::Video))[0]).assert_success();
    // v1080 and v1080b tie, the first one wins
    assert_eq!(best.id(), "v1080");

    let selection = select_streams(&document, &period).assert_success();
    assert_eq!(selection.video.id(), "v1080");
    assert_eq!(selection.audio.id(), "a128");
    assert_eq!(selection.height, Some(1080));
    assert_eq!(selection.duration, 12.0);

    let protection = selection.protection.assert_success();
    assert!(protection.pssh.is_some());
    let pssh = protection.pssh_box().assert_success().assert_success();
    assert!(pssh.is_widevine());
    assert_eq!(pssh.key_ids_hex(), ["0123456789abcdef0123456789abcdef"]);
}

#[test]
fn test_protection_on_audio_set_missing() {
    let document = vod_document();
    let period = document.content_period().assert_success();
    let audios = period.adaptation_sets(Some(MediaKind::Audio));
    let representation = select_best(&audios[0]).assert_success();
    find_protection(&representation, &audios[0]).assert_error();
}

#[test]
fn test_segment_urls() {
    let document = vod_document();
    let period = document.content_period().assert_success();
    let selection = select_streams(&document, &period).assert_success();

    let video = selection
        .video
        .segment_urls(MissingTimelinePolicy::Reject)
        .assert_success();
    let video: Vec<_> = video.iter().map(Url::as_str).collect();
    assert_eq!(
        video,
        [
            "https://example.com/vod/media/v1080/seg_1.m4s",
            "https://example.com/vod/media/v1080/seg_2.m4s",
            "https://example.com/vod/media/v1080/seg_3.m4s",
        ]
    );

    let audio = selection
        .audio
        .segment_urls(MissingTimelinePolicy::Reject)
        .assert_success();
    assert_eq!(audio.len(), 5);
}

#[test]
fn test_filename_order_round_trip() {
    let text = r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011"><Period>
  <AdaptationSet mimeType="video/mp4">
    <SegmentTemplate media="$RepresentationID$_$Number$.m4s" startNumber="98">
      <SegmentTimeline><S d="1" r="4"/><S d="2"/><S d="1" r="6"/></SegmentTimeline>
    </SegmentTemplate>
    <Representation id="video" bandwidth="1"/>
  </AdaptationSet>
</Period></MPD>"#;
    let document =
        ManifestDocument::parse(text, Url::parse("https://example.com/live.mpd").unwrap())
            .assert_success();
    let period = document.content_period().assert_success();
    let representation = select_best(&period.adaptation_sets(None)[0]).assert_success();

    let urls = representation
        .segment_urls(MissingTimelinePolicy::Reject)
        .assert_success();
    assert_eq!(urls.len(), 13);

    let emitted: Vec<String> = urls
        .iter()
        .map(|url| segment_filename(url).assert_success().to_string())
        .collect();
    let mut shuffled = emitted.clone();
    shuffled.reverse();
    shuffled.swap(0, 6);
    shuffled.sort_by_key(|name| segment_number(name));
    assert_eq!(shuffled, emitted);
    assert_eq!(emitted.first().map(String::as_str), Some("video_98.m4s"));
    assert_eq!(emitted.last().map(String::as_str), Some("video_110.m4s"));
}

#[tokio::test]
async fn test_http_manifest_source() -> anyhow::Result<()> {
    let (url, server) = setup_mock_server(VOD_MANIFEST).await;
    let source = HttpManifestSource::new(client(), Url::parse(&url)?);

    let response = source.fetch_manifest().await.assert_success();
    assert_eq!(response.url.as_str(), url);
    assert_eq!(response.text, VOD_MANIFEST);

    let document = ManifestDocument::parse(&response.text, response.url)?;
    assert_eq!(
        document.base_url().as_str(),
        format!("{}/vod/media/", server.uri())
    );
    Ok(())
}

#[tokio::test]
async fn test_http_manifest_source_error_status() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest.mpd"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let source = HttpManifestSource::new(client(), Url::parse(&server.uri())?.join("/manifest.mpd")?);
    let error = source.fetch_manifest().await.unwrap_err();
    assert!(matches!(error, DashcapError::HttpError(status) if status.as_u16() == 503));
    assert!(error.is_retryable());
    Ok(())
}
