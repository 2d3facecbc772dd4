use super::state::Gesture;
use super::timer::Deadline;
use std::time::Duration;
use tokio::time::Instant;

/// Turns raw pointer input into short-tap / long-press gestures.
///
/// A press held past the threshold becomes a long press as soon as the
/// threshold elapses, without waiting for the release.
#[derive(Debug, Clone)]
pub struct PressClassifier {
    threshold: Duration,
    pending: Deadline,
    pressed: bool,
    long_press_started: bool,
}

impl PressClassifier {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            pending: Deadline::default(),
            pressed: false,
            long_press_started: false,
        }
    }

    pub fn pointer_down(&mut self, now: Instant) {
        self.pending.arm(now, self.threshold);
        self.pressed = true;
        self.long_press_started = false;
    }

    /// Report a long-press start once the threshold has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<Gesture> {
        if self.pending.fire_if_due(now) {
            self.long_press_started = true;
            return Some(Gesture::LongPressStart);
        }
        None
    }

    pub fn pointer_up(&mut self, now: Instant) -> Vec<Gesture> {
        if !self.pressed {
            return Vec::new();
        }
        // A release that lands exactly on the threshold still counts as long
        let mut gestures: Vec<Gesture> = self.poll(now).into_iter().collect();
        self.pending.cancel();
        self.pressed = false;

        if self.long_press_started {
            self.long_press_started = false;
            gestures.push(Gesture::LongPressEnd);
        } else {
            gestures.push(Gesture::ShortTap);
        }
        gestures
    }

    pub fn pointer_cancel(&mut self) -> Option<Gesture> {
        self.pending.cancel();
        self.pressed = false;

        if std::mem::take(&mut self.long_press_started) {
            Some(Gesture::LongPressEnd)
        } else {
            None
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.at()
    }
}
