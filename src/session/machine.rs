use super::config::SessionConfig;
use super::events::{DictateEvent, EventSink};
use super::heartbeat::HeartbeatMonitor;
use super::state::{Gesture, RecordingMode, Session, SessionStatus};
use super::stats::SessionSnapshot;
use super::timer::{earliest, Deadline};
use crate::protocol::ServerMessage;
use crate::signals::ExternalSignal;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const CONNECTION_LOST: &str = "Connection lost";
pub const CONNECTION_ERROR: &str = "Connection error";
pub const STARTUP_FAILED: &str = "Failed to start transcription";
pub const SERVER_ERROR: &str = "Server error";

/// Side effect the driver must perform on behalf of the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Acquire the audio source and open the transport for this session
    Connect { session_id: Uuid },
    /// Ask the server to finalize over the open channel
    SendClose,
    /// Close the transport and release the audio source
    Release,
}

/// Dictation session state machine.
///
/// Owns the live [`Session`], the heartbeat monitor and every timer. All
/// inputs are synchronous and take the current time explicitly; public events
/// go to the sink and I/O is requested through the returned [`Effect`]s.
pub struct DictationMachine<S> {
    config: SessionConfig,
    status: SessionStatus,
    session: Option<Session>,
    heartbeat: HeartbeatMonitor,
    finalize_timer: Deadline,
    error_reset: Deadline,
    sink: S,
}

impl<S: EventSink> DictationMachine<S> {
    pub fn new(config: SessionConfig, sink: S) -> Self {
        let heartbeat = HeartbeatMonitor::new(config.heartbeat_timeout);
        Self {
            config,
            status: SessionStatus::Idle,
            session: None,
            heartbeat,
            finalize_timer: Deadline::default(),
            error_reset: Deadline::default(),
            sink,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn display_text(&self) -> String {
        self.session
            .as_ref()
            .map(|s| s.transcript.display_text())
            .unwrap_or_default()
    }

    /// Audio frames should be forwarded to the transport
    pub fn accepts_audio(&self) -> bool {
        self.status == SessionStatus::Active
            && self.session.as_ref().is_some_and(|s| s.channel_open)
    }

    pub fn is_monitoring_liveness(&self) -> bool {
        self.heartbeat.is_monitoring()
    }

    /// Earliest armed timer, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(&[
            self.heartbeat.deadline(),
            self.finalize_timer.at(),
            self.error_reset.at(),
        ])
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match &self.session {
            Some(session) => SessionSnapshot {
                status: self.status,
                mode: Some(session.mode),
                session_id: Some(session.id),
                display_text: session.transcript.display_text(),
                started_at: Some(session.started_at),
                last_inbound_at: session.last_inbound_at,
            },
            None => SessionSnapshot {
                status: self.status,
                ..SessionSnapshot::default()
            },
        }
    }

    pub fn gesture(&mut self, gesture: Gesture, now: Instant) -> Vec<Effect> {
        match (gesture, self.status) {
            (Gesture::ShortTap, SessionStatus::Idle) => self.start(RecordingMode::ShortTap),
            (Gesture::LongPressStart, SessionStatus::Idle) => self.start(RecordingMode::LongPress),
            (Gesture::ShortTap, SessionStatus::Active) if self.mode_is(RecordingMode::ShortTap) => {
                self.stop(now)
            }
            (Gesture::LongPressEnd, SessionStatus::Active)
                if self.mode_is(RecordingMode::LongPress) =>
            {
                self.stop(now)
            }
            (gesture, status) => {
                debug!("Ignoring {:?} while {:?}", gesture, status);
                Vec::new()
            }
        }
    }

    /// The transport for `session_id` is open. Returns false when the session
    /// is no longer current, in which case the caller must discard the
    /// connection without producing events.
    pub fn connected(&mut self, session_id: Uuid, now: Instant) -> bool {
        if self.status != SessionStatus::Active {
            return false;
        }
        let Some(session) = self.session.as_mut().filter(|s| s.id == session_id) else {
            return false;
        };

        session.channel_open = true;
        self.heartbeat.start(now);
        info!(session_id = %session_id, "Session connected");
        true
    }

    pub fn startup_failed(&mut self, session_id: Uuid, reason: &str, now: Instant) -> Vec<Effect> {
        if !self.is_current(session_id) {
            debug!("Ignoring start-up failure of stale session {}", session_id);
            return Vec::new();
        }
        error!(session_id = %session_id, "Session failed to start: {}", reason);
        self.fail(STARTUP_FAILED, now)
    }

    /// Handle a text frame from the transport
    pub fn inbound_text(&mut self, text: &str, now: Instant) -> Vec<Effect> {
        let Some(session) = self.session.as_mut() else {
            debug!("Ignoring message outside a session");
            return Vec::new();
        };

        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                // Not a verified application message: liveness is left alone
                warn!("Failed to parse server message: {}", e);
                return Vec::new();
            }
        };

        debug!("Received {} message", message.kind());
        session.last_inbound_at = Some(Utc::now());
        self.heartbeat.on_message(now);
        self.handle_message(message, now)
    }

    fn handle_message(&mut self, message: ServerMessage, now: Instant) -> Vec<Effect> {
        match message {
            ServerMessage::InterimTranscript { text } => {
                let text = text.unwrap_or_default();
                if let Some(session) = self.session.as_mut().filter(|_| !text.is_empty()) {
                    let display = session.transcript.apply_interim(&text);
                    self.sink.emit(DictateEvent::Text(display));
                }
                Vec::new()
            }
            ServerMessage::Transcript { text, turn_order } => {
                let text = text.unwrap_or_default();
                if let Some(session) = self.session.as_mut().filter(|_| !text.is_empty()) {
                    let display = session.transcript.apply_final(&text, turn_order);
                    self.sink.emit(DictateEvent::Text(display));
                }
                Vec::new()
            }
            ServerMessage::Heartbeat => Vec::new(),
            ServerMessage::SessionClosed { reason } => {
                info!(
                    "Server closed the session: {}",
                    reason.as_deref().unwrap_or("no reason given")
                );
                match self.status {
                    SessionStatus::Active => self.connection_lost(),
                    SessionStatus::Finalizing => self.finalize(),
                    _ => Vec::new(),
                }
            }
            ServerMessage::Error { .. } => {
                let message = message
                    .error_text()
                    .unwrap_or_else(|| SERVER_ERROR.to_string());
                match self.status {
                    SessionStatus::Active => {
                        error!("Server error: {}", message);
                        self.fail(&message, now)
                    }
                    SessionStatus::Finalizing => {
                        warn!("Server error while finalizing: {}", message);
                        self.finalize()
                    }
                    _ => Vec::new(),
                }
            }
            ServerMessage::Unknown => {
                debug!("Ignoring {} message", message.kind());
                Vec::new()
            }
        }
    }

    pub fn transport_error(&mut self, message: &str, now: Instant) -> Vec<Effect> {
        match self.status {
            SessionStatus::Active => {
                error!("Transport error: {}", message);
                self.fail(CONNECTION_ERROR, now)
            }
            SessionStatus::Finalizing => {
                warn!("Transport error while finalizing: {}", message);
                self.finalize()
            }
            _ => Vec::new(),
        }
    }

    /// The transport closed without a `session_closed` message
    pub fn transport_closed(&mut self, now: Instant) -> Vec<Effect> {
        if let Some(session) = self.session.as_mut() {
            session.channel_open = false;
        }
        match self.status {
            SessionStatus::Active => {
                warn!("Transport closed unexpectedly");
                self.fail(CONNECTION_ERROR, now)
            }
            SessionStatus::Finalizing => self.finalize(),
            _ => Vec::new(),
        }
    }

    pub fn signal(&mut self, signal: ExternalSignal, now: Instant) -> Vec<Effect> {
        match (signal, self.status) {
            (ExternalSignal::Offline, SessionStatus::Active) => {
                warn!("Network went offline");
                self.connection_lost()
            }
            (ExternalSignal::VisibilityHidden, SessionStatus::Active) => {
                info!("Host hidden, stopping dictation");
                self.stop(now)
            }
            (signal, status) => {
                debug!("Ignoring {:?} while {:?}", signal, status);
                Vec::new()
            }
        }
    }

    /// The audio source stopped producing frames
    pub fn audio_ended(&mut self, now: Instant) -> Vec<Effect> {
        if self.status == SessionStatus::Active {
            info!("Audio source ended, stopping dictation");
            return self.stop(now);
        }
        Vec::new()
    }

    /// Fire every timer that is due at `now`
    pub fn poll_timers(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.heartbeat.poll_expired(now) && self.status == SessionStatus::Active {
            warn!(
                "No message from the server for {} ms",
                self.heartbeat.timeout().as_millis()
            );
            effects.extend(self.connection_lost());
        }

        if self.finalize_timer.fire_if_due(now) && self.status == SessionStatus::Finalizing {
            effects.extend(self.finalize());
        }

        if self.error_reset.fire_if_due(now) && self.status == SessionStatus::Error {
            debug!("Error display elapsed, back to idle");
            self.status = SessionStatus::Idle;
        }

        effects
    }

    /// Drop any live session without emitting events
    pub fn reset(&mut self) -> Vec<Effect> {
        let had_session = self.session.is_some();
        self.teardown();
        self.error_reset.cancel();
        self.status = SessionStatus::Idle;

        if had_session {
            vec![Effect::Release]
        } else {
            Vec::new()
        }
    }

    fn start(&mut self, mode: RecordingMode) -> Vec<Effect> {
        let session = Session::new(mode);
        let session_id = session.id;
        info!(session_id = %session_id, "Starting dictation session ({:?})", mode);

        self.session = Some(session);
        self.status = SessionStatus::Active;
        self.sink.emit(DictateEvent::Start);

        vec![Effect::Connect { session_id }]
    }

    fn stop(&mut self, now: Instant) -> Vec<Effect> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        self.status = SessionStatus::Finalizing;
        self.heartbeat.stop();
        session.interim_at_stop = Some(session.transcript.interim().to_string());

        if session.channel_open {
            info!(
                session_id = %session.id,
                "Stopping session, waiting {} ms for final results",
                self.config.finalize_grace.as_millis()
            );
            self.finalize_timer.arm(now, self.config.finalize_grace);
            vec![Effect::SendClose]
        } else {
            self.finalize()
        }
    }

    fn finalize(&mut self) -> Vec<Effect> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };

        let fallback = session.interim_at_stop.as_deref().unwrap_or_default();
        let text = session.end_text(fallback);
        info!(session_id = %session.id, "Session finalized ({} chars)", text.chars().count());
        if !text.is_empty() {
            self.sink.emit(DictateEvent::End(text));
        }

        self.teardown();
        self.status = SessionStatus::Idle;
        vec![Effect::Release]
    }

    fn connection_lost(&mut self) -> Vec<Effect> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };

        warn!(session_id = %session.id, "Connection lost");
        self.sink.emit(DictateEvent::Error(CONNECTION_LOST.to_string()));

        let text = session.end_text(session.transcript.interim());
        if !text.is_empty() {
            self.sink.emit(DictateEvent::End(text));
        }

        self.teardown();
        self.status = SessionStatus::Idle;
        vec![Effect::Release]
    }

    fn fail(&mut self, message: &str, now: Instant) -> Vec<Effect> {
        self.sink.emit(DictateEvent::Error(message.to_string()));

        self.teardown();
        self.status = SessionStatus::Error;
        self.error_reset.arm(now, self.config.error_display);
        vec![Effect::Release]
    }

    fn teardown(&mut self) {
        self.heartbeat.stop();
        self.finalize_timer.cancel();
        self.session = None;
    }

    fn mode_is(&self, mode: RecordingMode) -> bool {
        self.session.as_ref().is_some_and(|s| s.mode == mode)
    }

    fn is_current(&self, session_id: Uuid) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session_id)
    }
}
