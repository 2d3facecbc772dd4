use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Little-endian PCM16 bytes, as sent in binary transport frames
    pub fn to_le_bytes(&self) -> Vec<u8> {
        super::pcm::pcm16_to_le_bytes(&self.samples)
    }

    pub fn duration_ms(&self) -> u64 {
        let per_channel = self.samples.len() as u64 / self.channels.max(1) as u64;
        per_channel * 1000 / self.sample_rate.max(1) as u64
    }
}

/// A running capture: the frame stream plus its running flag.
///
/// Producers stop when the flag drops or the receiver is closed.
#[derive(Debug)]
pub struct AudioCapture {
    frames: mpsc::Receiver<AudioFrame>,
    running: Arc<AtomicBool>,
}

impl AudioCapture {
    pub fn new(frames: mpsc::Receiver<AudioFrame>, running: Arc<AtomicBool>) -> Self {
        Self { frames, running }
    }

    /// Next captured frame; `None` once the source ended or was stopped
    pub async fn recv(&mut self) -> Option<AudioFrame> {
        if !self.is_running() {
            return None;
        }
        self.frames.recv().await
    }

    /// Stop capturing. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!("Audio capture stopped");
        }
        self.frames.close();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Source of outbound audio for a dictation session
///
/// Implementations:
/// - File: paced frames from a WAV file
/// - Channel: frames pushed by the host application
#[async_trait::async_trait]
pub trait AudioSource: Send + Sync {
    /// Start capturing audio for one session
    async fn start(&self) -> Result<AudioCapture>;

    /// Get source name for logging
    fn name(&self) -> &str;
}
