//! Host notifications that affect a running dictation session
//!
//! The host forwards network and visibility changes through a
//! [`SignalAdapter`]; the state machine decides what they mean.

use crate::session::DictationHandle;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Environment change reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalSignal {
    Offline,
    Online,
    VisibilityHidden,
    VisibilityVisible,
}

impl ExternalSignal {
    pub fn from_network(online: bool) -> Self {
        if online {
            ExternalSignal::Online
        } else {
            ExternalSignal::Offline
        }
    }

    /// Map a page visibility state (`"hidden"`, `"visible"`, ...)
    pub fn from_visibility_state(state: &str) -> Self {
        if state.eq_ignore_ascii_case("hidden") {
            ExternalSignal::VisibilityHidden
        } else {
            ExternalSignal::VisibilityVisible
        }
    }
}

/// Thin listener that feeds host notifications to the controller
#[derive(Debug, Clone)]
pub struct SignalAdapter {
    handle: DictationHandle,
}

impl SignalAdapter {
    pub fn new(handle: DictationHandle) -> Self {
        Self { handle }
    }

    pub fn on_offline(&self) -> Result<()> {
        self.handle.signal(ExternalSignal::Offline)
    }

    pub fn on_online(&self) -> Result<()> {
        self.handle.signal(ExternalSignal::Online)
    }

    pub fn on_visibility_change(&self, state: &str) -> Result<()> {
        self.handle
            .signal(ExternalSignal::from_visibility_state(state))
    }
}
