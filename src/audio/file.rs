use super::backend::{AudioCapture, AudioFrame, AudioSource};
use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Sample rate the transcription service expects
pub const TARGET_SAMPLE_RATE: u32 = 16000;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Samples ready to stream; the file must already be 16kHz mono
    pub fn require_mono_16khz(&self) -> Result<&[i16]> {
        if self.sample_rate == TARGET_SAMPLE_RATE && self.channels == 1 {
            Ok(&self.samples)
        } else {
            anyhow::bail!(
                "Expected {}Hz mono audio, got {}Hz {}ch (resampling is not supported)",
                TARGET_SAMPLE_RATE,
                self.sample_rate,
                self.channels
            )
        }
    }

    /// Split into frames of `frame_ms` milliseconds
    pub fn frames(&self, frame_ms: u64) -> Result<Vec<AudioFrame>> {
        let samples = self.require_mono_16khz()?;
        let samples_per_frame = ((self.sample_rate as u64 * frame_ms) / 1000).max(1) as usize;

        Ok(samples
            .chunks(samples_per_frame)
            .enumerate()
            .map(|(i, chunk)| AudioFrame {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                channels: self.channels,
                timestamp_ms: i as u64 * frame_ms,
            })
            .collect())
    }
}

/// Streams a WAV file in real time, one frame per `frame_duration`
pub struct FileAudioSource {
    path: PathBuf,
    frame_duration: Duration,
}

impl FileAudioSource {
    pub fn new(path: impl Into<PathBuf>, frame_duration: Duration) -> Self {
        Self {
            path: path.into(),
            frame_duration,
        }
    }
}

#[async_trait::async_trait]
impl AudioSource for FileAudioSource {
    async fn start(&self) -> Result<AudioCapture> {
        let file = AudioFile::open(&self.path)?;
        let frame_ms = self.frame_duration.as_millis().max(1) as u64;
        let frames = file.frames(frame_ms)?;

        let (tx, rx) = mpsc::channel(32);
        let running = Arc::new(AtomicBool::new(true));
        let producer_running = Arc::clone(&running);
        let frame_duration = self.frame_duration;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_duration);
            for frame in frames {
                ticker.tick().await;
                if !producer_running.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            info!("File audio source finished");
        });

        Ok(AudioCapture::new(rx, running))
    }

    fn name(&self) -> &str {
        "file"
    }
}
