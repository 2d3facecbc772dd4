use super::timer::Deadline;
use std::time::Duration;
use tokio::time::Instant;

/// Tracks time since the last inbound message and reports when the
/// connection has gone quiet for longer than the timeout.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    timeout: Duration,
    deadline: Deadline,
}

impl HeartbeatMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Deadline::default(),
        }
    }

    /// Arm the monitor for a newly connected session
    pub fn start(&mut self, now: Instant) {
        self.deadline.arm(now, self.timeout);
    }

    /// Disarm the monitor; a pending deadline is dropped
    pub fn stop(&mut self) {
        self.deadline.cancel();
    }

    /// Record a liveness signal. Ignored while the monitor is not armed.
    pub fn on_message(&mut self, now: Instant) {
        if self.deadline.is_armed() {
            self.deadline.arm(now, self.timeout);
        }
    }

    /// Returns true once when the timeout has elapsed, then stays disarmed
    /// until `start` is called again.
    pub fn poll_expired(&mut self, now: Instant) -> bool {
        self.deadline.fire_if_due(now)
    }

    pub fn is_monitoring(&self) -> bool {
        self.deadline.is_armed()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.at()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
