use super::config::SessionConfig;
use super::events::{ChannelSink, DictateEvent};
use super::gesture::PressClassifier;
use super::machine::{DictationMachine, Effect};
use super::state::Gesture;
use super::stats::SessionSnapshot;
use super::timer::earliest;
use crate::audio::{AudioCapture, AudioFrame, AudioSource, LevelMeter};
use crate::protocol::ClientMessage;
use crate::signals::ExternalSignal;
use crate::transport::{Transport, TransportConnector, TransportEvent, TransportLink};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Raw pointer input on the dictation control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerInput {
    Down,
    Up,
    Cancel,
}

/// Input accepted by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlInput {
    Gesture(Gesture),
    Pointer(PointerInput),
    Signal(ExternalSignal),
    Shutdown,
}

/// Cloneable handle used by the host to drive the controller
#[derive(Debug, Clone)]
pub struct DictationHandle {
    tx: mpsc::UnboundedSender<ControlInput>,
}

impl DictationHandle {
    pub fn send(&self, input: ControlInput) -> Result<()> {
        self.tx
            .send(input)
            .map_err(|_| anyhow!("Dictation controller has stopped"))
    }

    pub fn short_tap(&self) -> Result<()> {
        self.send(ControlInput::Gesture(Gesture::ShortTap))
    }

    pub fn long_press_start(&self) -> Result<()> {
        self.send(ControlInput::Gesture(Gesture::LongPressStart))
    }

    pub fn long_press_end(&self) -> Result<()> {
        self.send(ControlInput::Gesture(Gesture::LongPressEnd))
    }

    pub fn pointer(&self, input: PointerInput) -> Result<()> {
        self.send(ControlInput::Pointer(input))
    }

    pub fn signal(&self, signal: ExternalSignal) -> Result<()> {
        self.send(ControlInput::Signal(signal))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(ControlInput::Shutdown)
    }
}

/// Result of the asynchronous start-up of one session
struct StartupOutcome {
    session_id: Uuid,
    result: Result<(AudioCapture, Box<dyn Transport>)>,
}

/// Drives a [`DictationMachine`] from real inputs.
///
/// One select loop owns the machine, so every input runs to completion before
/// the next one is looked at. Session start-up (audio + connect) runs in a
/// spawned task; its outcome comes back through a channel and is checked
/// against the current session before it is used. Once open, the transport
/// lives behind a [`TransportLink`], so nothing in the loop waits on a send.
pub struct DictationController {
    config: SessionConfig,
    machine: DictationMachine<ChannelSink>,
    classifier: PressClassifier,
    audio: Arc<dyn AudioSource>,
    connector: Arc<dyn TransportConnector>,
    control_rx: mpsc::UnboundedReceiver<ControlInput>,
    startup_tx: mpsc::UnboundedSender<StartupOutcome>,
    startup_rx: mpsc::UnboundedReceiver<StartupOutcome>,
    link: Option<TransportLink>,
    capture: Option<AudioCapture>,
    meter: LevelMeter,
    level_tx: watch::Sender<f32>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl DictationController {
    pub fn new(
        config: SessionConfig,
        audio: Arc<dyn AudioSource>,
        connector: Arc<dyn TransportConnector>,
    ) -> (Self, DictationHandle, mpsc::UnboundedReceiver<DictateEvent>) {
        let (sink, events) = ChannelSink::new();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (startup_tx, startup_rx) = mpsc::unbounded_channel();
        let (level_tx, _) = watch::channel(0.0);
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());

        let controller = Self {
            machine: DictationMachine::new(config.clone(), sink),
            classifier: PressClassifier::new(config.long_press_threshold),
            config,
            audio,
            connector,
            control_rx,
            startup_tx,
            startup_rx,
            link: None,
            capture: None,
            meter: LevelMeter::new(),
            level_tx,
            snapshot_tx,
        };

        (controller, DictationHandle { tx: control_tx }, events)
    }

    /// Smoothed input level of the live session (0 when not recording)
    pub fn levels(&self) -> watch::Receiver<f32> {
        self.level_tx.subscribe()
    }

    /// State published after every processed input
    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run until shutdown is requested or every handle is dropped
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Dictation controller started (audio: {}, endpoint: {})",
            self.audio.name(),
            self.config.endpoint
        );

        loop {
            let deadline = earliest(&[self.machine.next_deadline(), self.classifier.deadline()]);

            tokio::select! {
                input = self.control_rx.recv() => match input {
                    Some(ControlInput::Shutdown) | None => break,
                    Some(input) => self.handle_control(input),
                },
                Some(outcome) = self.startup_rx.recv() => self.handle_startup(outcome),
                event = next_transport_event(&mut self.link), if self.link.is_some() => {
                    self.handle_transport_event(event)
                }
                frame = next_frame(&mut self.capture), if self.capture.is_some() => {
                    self.handle_frame(frame)
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.handle_timers(Instant::now())
                }
            }

            self.snapshot_tx.send_replace(self.machine.snapshot());
        }

        let effects = self.machine.reset();
        self.apply(effects);
        self.snapshot_tx.send_replace(self.machine.snapshot());

        info!("Dictation controller stopped");
        Ok(())
    }

    fn handle_control(&mut self, input: ControlInput) {
        let now = Instant::now();
        let effects = match input {
            ControlInput::Gesture(gesture) => self.machine.gesture(gesture, now),
            ControlInput::Pointer(PointerInput::Down) => {
                self.classifier.pointer_down(now);
                Vec::new()
            }
            ControlInput::Pointer(PointerInput::Up) => {
                let mut effects = Vec::new();
                for gesture in self.classifier.pointer_up(now) {
                    effects.extend(self.machine.gesture(gesture, now));
                }
                effects
            }
            ControlInput::Pointer(PointerInput::Cancel) => match self.classifier.pointer_cancel() {
                Some(gesture) => self.machine.gesture(gesture, now),
                None => Vec::new(),
            },
            ControlInput::Signal(signal) => self.machine.signal(signal, now),
            ControlInput::Shutdown => Vec::new(),
        };
        self.apply(effects);
    }

    fn handle_startup(&mut self, outcome: StartupOutcome) {
        let now = Instant::now();
        match outcome.result {
            Ok((capture, transport)) => {
                let link = TransportLink::spawn(transport);
                if self.machine.connected(outcome.session_id, now) {
                    self.capture = Some(capture);
                    self.link = Some(link);
                } else {
                    debug!(
                        "Session {} is no longer current, discarding its connection",
                        outcome.session_id
                    );
                    release(Some(link), Some(capture));
                }
            }
            Err(e) => {
                let effects = self
                    .machine
                    .startup_failed(outcome.session_id, &format!("{:#}", e), now);
                self.apply(effects);
            }
        }
    }

    fn handle_transport_event(&mut self, event: Option<TransportEvent>) {
        let now = Instant::now();
        let effects = match event {
            Some(TransportEvent::Message(text)) => self.machine.inbound_text(&text, now),
            Some(TransportEvent::Error(message)) => self.machine.transport_error(&message, now),
            Some(TransportEvent::Closed(reason)) => {
                info!(
                    "Transport closed: {}",
                    reason.as_deref().unwrap_or("no reason given")
                );
                self.link = None;
                self.machine.transport_closed(now)
            }
            None => {
                self.link = None;
                self.machine.transport_closed(now)
            }
        };
        self.apply(effects);
    }

    fn handle_frame(&mut self, frame: Option<AudioFrame>) {
        let Some(frame) = frame else {
            if let Some(mut capture) = self.capture.take() {
                capture.stop();
            }
            let effects = self.machine.audio_ended(Instant::now());
            self.apply(effects);
            return;
        };

        // Frames captured before the channel opens or after stop are dropped
        if !self.machine.accepts_audio() {
            return;
        }
        let Some(link) = self.link.as_ref() else {
            return;
        };

        self.level_tx.send_replace(self.meter.update(&frame.samples));
        // Under backpressure the frame is dropped rather than waited on
        link.try_send_audio(frame.to_le_bytes());
    }

    fn handle_timers(&mut self, now: Instant) {
        let mut effects = Vec::new();
        if let Some(gesture) = self.classifier.poll(now) {
            effects.extend(self.machine.gesture(gesture, now));
        }
        effects.extend(self.machine.poll_timers(now));
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Connect { session_id } => self.spawn_startup(session_id),
                Effect::SendClose => {
                    if let Some(link) = self.link.as_ref() {
                        link.send_text(ClientMessage::Close.to_json());
                    }
                }
                Effect::Release => {
                    release(self.link.take(), self.capture.take());
                    self.meter.reset();
                    self.level_tx.send_replace(0.0);
                }
            }
        }
    }

    fn spawn_startup(&self, session_id: Uuid) {
        let audio = Arc::clone(&self.audio);
        let connector = Arc::clone(&self.connector);
        let url = self.config.endpoint_url();
        let outcomes = self.startup_tx.clone();

        tokio::spawn(async move {
            let result = match url {
                Ok(url) => open_session_io(audio.as_ref(), connector.as_ref(), &url).await,
                Err(e) => Err(e),
            };
            // A dropped controller drops the resources along with the outcome
            let _ = outcomes.send(StartupOutcome { session_id, result });
        });
    }
}

async fn open_session_io(
    audio: &dyn AudioSource,
    connector: &dyn TransportConnector,
    url: &str,
) -> Result<(AudioCapture, Box<dyn Transport>)> {
    let mut capture = audio
        .start()
        .await
        .with_context(|| format!("Failed to start {} audio source", audio.name()))?;

    match connector
        .connect(url)
        .await
        .context("Failed to connect to transcription service")
    {
        Ok(transport) => Ok((capture, transport)),
        Err(e) => {
            capture.stop();
            Err(e)
        }
    }
}

fn release(link: Option<TransportLink>, capture: Option<AudioCapture>) {
    if let Some(link) = link {
        link.close();
    }
    if let Some(mut capture) = capture {
        capture.stop();
    }
}

async fn next_transport_event(link: &mut Option<TransportLink>) -> Option<TransportEvent> {
    match link {
        Some(link) => link.next_event().await,
        None => std::future::pending().await,
    }
}

async fn next_frame(capture: &mut Option<AudioCapture>) -> Option<AudioFrame> {
    match capture {
        Some(capture) => capture.recv().await,
        None => std::future::pending().await,
    }
}
