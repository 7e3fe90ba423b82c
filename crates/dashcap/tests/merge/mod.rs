use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use dashcap::{
    merge::{Decryptor, Muxer, Prober, DEFAULT_TOLERANCE},
    session::{MANIFEST_SNAPSHOT, SESSION_RECORD},
    DashcapError, DashcapResult, KeyMap, MediaKind, ReassemblyPipeline,
};

use crate::AssertWrapper;

type Calls = Arc<Mutex<Vec<String>>>;

/// "Decrypts" by copying the input after a `dec:` marker.
#[derive(Clone, Default)]
struct FakeDecryptor {
    calls: Calls,
    fail: bool,
}

impl Decryptor for FakeDecryptor {
    async fn decrypt(&self, keys: &KeyMap, input: &Path, output: &Path) -> DashcapResult<()> {
        self.calls.lock().unwrap().push(format!(
            "{} keys={}",
            output.file_name().unwrap().to_string_lossy(),
            keys.len()
        ));
        if self.fail {
            return Err(DashcapError::ExternalTool {
                tool: "mp4decrypt".to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        let mut data = b"dec:".to_vec();
        data.extend(std::fs::read(input)?);
        std::fs::write(output, data)?;
        Ok(())
    }
}

/// Writes video and audio separated by `|`.
#[derive(Clone, Default)]
struct FakeMuxer {
    calls: Calls,
    fail: bool,
}

impl Muxer for FakeMuxer {
    async fn mux(&self, video: &Path, audio: Option<&Path>, output: &Path) -> DashcapResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(output.file_name().unwrap().to_string_lossy().into_owned());

        let mut data = std::fs::read(video)?;
        if let Some(audio) = audio {
            data.push(b'|');
            data.extend(std::fs::read(audio)?);
        }
        std::fs::write(output, data)?;

        if self.fail {
            return Err(DashcapError::ExternalTool {
                tool: "ffmpeg".to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

struct FakeProber(Option<f64>);

impl Prober for FakeProber {
    async fn duration(&self, _path: &Path) -> DashcapResult<f64> {
        self.0.ok_or_else(|| DashcapError::ExternalTool {
            tool: "ffprobe".to_string(),
            reason: "invalid data".to_string(),
        })
    }
}

fn keys() -> KeyMap {
    format!("{}:{}", "0".repeat(32), "f".repeat(32))
        .parse()
        .unwrap()
}

fn write_track(dir: &Path, kind: MediaKind, names: &[&str]) {
    let track_dir = dir.join(kind.as_str());
    std::fs::create_dir_all(&track_dir).unwrap();
    for name in names {
        std::fs::write(track_dir.join(name), format!("[{name}]")).unwrap();
    }
}

fn setup_output() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_track(
        dir.path(),
        MediaKind::Video,
        &["seg_10.m4s", "seg_2.m4s", "init.mp4", "seg_1.m4s"],
    );
    write_track(dir.path(), MediaKind::Audio, &["seg_2.m4s", "init.mp4", "seg_1.m4s"]);
    std::fs::write(dir.path().join(MANIFEST_SNAPSHOT), "<MPD/>").unwrap();
    std::fs::write(dir.path().join(SESSION_RECORD), "{}").unwrap();
    dir
}

fn pipeline(
    dir: &Path,
    decryptor: FakeDecryptor,
    muxer: FakeMuxer,
) -> ReassemblyPipeline<FakeDecryptor, FakeMuxer, FakeProber> {
    ReassemblyPipeline::new(dir, decryptor, muxer, FakeProber(Some(600.0)))
}

#[tokio::test]
async fn test_process_without_keys() -> anyhow::Result<()> {
    let dir = setup_output();
    let decryptor = FakeDecryptor::default();
    let muxer = FakeMuxer::default();

    let output = pipeline(dir.path(), decryptor.clone(), muxer.clone())
        .process("episode.mp4", None, false)
        .await
        .assert_success();

    assert_eq!(output, dir.path().join("episode.mp4"));
    assert_eq!(
        std::fs::read_to_string(&output)?,
        "[init.mp4][seg_1.m4s][seg_2.m4s][seg_10.m4s]|[init.mp4][seg_1.m4s][seg_2.m4s]"
    );
    assert!(decryptor.calls.lock().unwrap().is_empty());
    assert_eq!(*muxer.calls.lock().unwrap(), ["episode_staging.mp4"]);

    // no cleanup requested
    assert!(dir.path().join("video").is_dir());
    assert!(dir.path().join("temp_video_enc.mp4").is_file());
    assert!(!dir.path().join("episode_staging.mp4").exists());
    Ok(())
}

#[tokio::test]
async fn test_process_with_keys_and_cleanup() -> anyhow::Result<()> {
    let dir = setup_output();
    let decryptor = FakeDecryptor::default();

    let output = pipeline(dir.path(), decryptor.clone(), FakeMuxer::default())
        .process("episode.mp4", Some(&keys()), true)
        .await
        .assert_success();

    assert_eq!(
        *decryptor.calls.lock().unwrap(),
        ["dec_temp_video_enc.mp4 keys=1", "dec_temp_audio_enc.mp4 keys=1"]
    );
    let data = std::fs::read_to_string(&output)?;
    assert!(data.starts_with("dec:[init.mp4]"));
    assert!(data.contains("|dec:[init.mp4]"));

    for removed in [
        "video",
        "audio",
        "temp_video_enc.mp4",
        "temp_audio_enc.mp4",
        "dec_temp_video_enc.mp4",
        "dec_temp_audio_enc.mp4",
    ] {
        assert!(!dir.path().join(removed).exists(), "{removed} was kept");
    }
    for kept in ["episode.mp4", MANIFEST_SNAPSHOT, SESSION_RECORD] {
        assert!(dir.path().join(kept).is_file(), "{kept} was removed");
    }
    Ok(())
}

#[tokio::test]
async fn test_video_only() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_track(dir.path(), MediaKind::Video, &["init.mp4", "seg_1.m4s"]);

    let output = pipeline(dir.path(), FakeDecryptor::default(), FakeMuxer::default())
        .process("out.mp4", None, true)
        .await
        .assert_success();
    assert_eq!(std::fs::read_to_string(output)?, "[init.mp4][seg_1.m4s]");
    Ok(())
}

#[tokio::test]
async fn test_decrypt_failure_aborts_before_mux() -> anyhow::Result<()> {
    let dir = setup_output();
    let muxer = FakeMuxer::default();
    let decryptor = FakeDecryptor {
        fail: true,
        ..Default::default()
    };

    let result = pipeline(dir.path(), decryptor, muxer.clone())
        .process("episode.mp4", Some(&keys()), true)
        .await;
    assert!(matches!(result, Err(DashcapError::ExternalTool { tool, .. }) if tool == "mp4decrypt"));
    assert!(muxer.calls.lock().unwrap().is_empty());
    assert!(!dir.path().join("episode.mp4").exists());
    assert!(dir.path().join("video").is_dir());
    Ok(())
}

#[tokio::test]
async fn test_mux_failure_keeps_intermediates() -> anyhow::Result<()> {
    let dir = setup_output();
    let muxer = FakeMuxer {
        fail: true,
        ..Default::default()
    };

    let result = pipeline(dir.path(), FakeDecryptor::default(), muxer)
        .process("episode.mp4", None, true)
        .await;
    assert!(matches!(result, Err(DashcapError::ExternalTool { tool, .. }) if tool == "ffmpeg"));

    assert!(!dir.path().join("episode.mp4").exists());
    assert!(!dir.path().join("episode_staging.mp4").exists());
    assert!(dir.path().join("temp_video_enc.mp4").is_file());
    assert!(dir.path().join("temp_audio_enc.mp4").is_file());
    assert!(dir.path().join("video").is_dir());
    Ok(())
}

#[tokio::test]
async fn test_empty_video_track() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_track(dir.path(), MediaKind::Audio, &["init.mp4", "seg_1.m4s"]);

    let result = pipeline(dir.path(), FakeDecryptor::default(), FakeMuxer::default())
        .process("out.mp4", None, false)
        .await;
    assert!(matches!(result, Err(DashcapError::EmptyTrack(MediaKind::Video))));
    Ok(())
}

#[tokio::test]
async fn test_verify_integrity() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = PathBuf::from("episode.mp4");
    let verify = |actual: Option<f64>| {
        ReassemblyPipeline::new(
            dir.path(),
            FakeDecryptor::default(),
            FakeMuxer::default(),
            FakeProber(actual),
        )
    };

    let report = verify(Some(595.0))
        .verify_integrity(&path, 600.0, DEFAULT_TOLERANCE)
        .await;
    assert!(report.passed);

    let report = verify(Some(580.0))
        .verify_integrity(&path, 600.0, DEFAULT_TOLERANCE)
        .await;
    assert!(!report.passed);
    assert_eq!(report.difference(), 20.0);

    // probe failure counts as zero duration
    let report = verify(None)
        .verify_integrity(&path, 600.0, DEFAULT_TOLERANCE)
        .await;
    assert!(!report.passed);
    assert_eq!(report.actual, 0.0);

    // unknown duration can not be checked
    let report = verify(None).verify_integrity(&path, 0.0, DEFAULT_TOLERANCE).await;
    assert!(report.passed);
    Ok(())
}
