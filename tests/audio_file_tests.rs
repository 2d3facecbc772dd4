// Integration tests for WAV input
//
// Fixtures are written with hound into a temp dir, so the tests don't depend
// on files checked into the repo.

use anyhow::Result;
use dictate_stream::audio::{AudioFile, AudioSource, FileAudioSource};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: u16, samples: &[i16]) -> PathBuf {
    let path = dir.join(name);
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path
}

/// One second of a 440 Hz tone at 16 kHz mono
fn tone() -> Vec<i16> {
    (0..16000)
        .map(|i| {
            let t = i as f32 / 16000.0;
            ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 8000.0) as i16
        })
        .collect()
}

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "tone.wav", 16000, 1, &tone());

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 16000);
    assert!((audio.duration_seconds - 1.0).abs() < 1e-6);
    assert!(audio.path.contains("tone.wav"));

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_frames_split_by_duration() -> Result<()> {
    let dir = TempDir::new()?;
    let mut samples = tone();
    samples.truncate(16000 + 800);
    let path = write_wav(dir.path(), "tone.wav", 16000, 1, &samples);

    let frames = AudioFile::open(&path)?.frames(100)?;

    // 10 full frames of 1600 samples plus a 50 ms tail
    assert_eq!(frames.len(), 11);
    assert!(frames[..10].iter().all(|f| f.samples.len() == 1600));
    assert_eq!(frames[10].samples.len(), 800);
    assert_eq!(frames[3].timestamp_ms, 300);
    assert_eq!(frames[0].duration_ms(), 100);
    assert_eq!(frames[0].to_le_bytes().len(), 3200);

    Ok(())
}

#[test]
fn test_non_16khz_mono_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let stereo = write_wav(dir.path(), "stereo.wav", 16000, 2, &[0; 3200]);
    let hifi = write_wav(dir.path(), "hifi.wav", 44100, 1, &[0; 4410]);

    let err = AudioFile::open(&stereo)?.frames(100).unwrap_err();
    assert!(err.to_string().contains("mono"));
    assert!(AudioFile::open(&hifi)?.require_mono_16khz().is_err());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_file_source_paces_frames_in_real_time() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "tone.wav", 16000, 1, &tone()[..4800]);
    let source = FileAudioSource::new(&path, Duration::from_millis(100));

    let started = tokio::time::Instant::now();
    let mut capture = source.start().await?;

    let mut count = 0;
    while let Some(frame) = capture.recv().await {
        assert_eq!(frame.samples.len(), 1600);
        count += 1;
    }

    assert_eq!(count, 3);
    // The first tick is immediate, the rest are one frame apart
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(source.name(), "file");

    Ok(())
}

#[tokio::test]
async fn test_file_source_fails_on_missing_file() {
    let source = FileAudioSource::new("/nonexistent/audio.wav", Duration::from_millis(100));

    assert!(source.start().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_stopped_capture_yields_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_wav(dir.path(), "tone.wav", 16000, 1, &tone());
    let source = FileAudioSource::new(&path, Duration::from_millis(100));

    let mut capture = source.start().await?;
    assert!(capture.recv().await.is_some());

    capture.stop();
    capture.stop();

    assert!(!capture.is_running());
    assert!(capture.recv().await.is_none());

    Ok(())
}
