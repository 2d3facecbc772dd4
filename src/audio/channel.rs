use super::backend::{AudioCapture, AudioFrame, AudioSource};
use anyhow::Result;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Audio source fed by the host application.
///
/// Each session gets a fresh channel; [`ChannelAudioSource::feeder`] returns
/// the sender for the current one.
#[derive(Debug, Clone)]
pub struct ChannelAudioSource {
    feeder: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    capacity: usize,
}

impl ChannelAudioSource {
    pub fn new(capacity: usize) -> Self {
        Self {
            feeder: Arc::new(Mutex::new(None)),
            capacity: capacity.max(1),
        }
    }

    /// Sender for the capture of the current session, if one was started
    pub fn feeder(&self) -> Option<mpsc::Sender<AudioFrame>> {
        self.feeder.lock().ok().and_then(|guard| guard.clone())
    }

    /// Signal end of input to the current capture
    pub fn end_stream(&self) {
        if let Ok(mut guard) = self.feeder.lock() {
            guard.take();
        }
    }
}

impl Default for ChannelAudioSource {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait::async_trait]
impl AudioSource for ChannelAudioSource {
    async fn start(&self) -> Result<AudioCapture> {
        let (tx, rx) = mpsc::channel(self.capacity);
        match self.feeder.lock() {
            Ok(mut guard) => *guard = Some(tx),
            Err(_) => anyhow::bail!("Audio feeder lock poisoned"),
        }
        Ok(AudioCapture::new(rx, Arc::new(AtomicBool::new(true))))
    }

    fn name(&self) -> &str {
        "channel"
    }
}
