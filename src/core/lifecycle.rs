//! Broker lifecycle state machine.
//!
//! ```text
//!   Unstarted ──begin_start──→ Starting ──finish_start──→ Running
//!       │                         │                          │
//!       └──────────── stop ───────┴────────── stop ──────────┴──→ Stopped
//! ```
//!
//! The state lives behind a `parking_lot::Mutex` held only for the check or
//! transition itself, never across a connector call.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::BrokerError;

/// Operational state of a broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed, not yet started.
    Unstarted,
    /// The connector's start round-trip is in flight.
    Starting,
    /// Accepting operations.
    Running,
    /// Terminal.
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unstarted => "unstarted",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Outcome of completing a start transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The broker is now running.
    Running,
    /// `stop` ran while the connector was starting; the broker stays stopped.
    StoppedMeanwhile,
}

/// Thread-safe lifecycle cell.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// A fresh, unstarted lifecycle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Unstarted),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Whether operations are currently accepted.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Fail unless running.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::State`] in every state but `Running`.
    pub fn ensure_running(&self) -> Result<(), BrokerError> {
        match self.state() {
            LifecycleState::Running => Ok(()),
            state => Err(BrokerError::State(format!("not running ({state})"))),
        }
    }

    /// Claim the start transition: `Unstarted` → `Starting`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::State`] if the broker was already started or
    /// has been stopped.
    pub fn begin_start(&self) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        match *state {
            LifecycleState::Unstarted => {
                *state = LifecycleState::Starting;
                Ok(())
            }
            LifecycleState::Starting | LifecycleState::Running => {
                Err(BrokerError::State("already started".into()))
            }
            LifecycleState::Stopped => Err(BrokerError::State("already stopped".into())),
        }
    }

    /// Complete a successful start: `Starting` → `Running`, unless a
    /// concurrent `stop` already moved the state to `Stopped`.
    pub fn finish_start(&self) -> StartOutcome {
        let mut state = self.state.lock();
        if *state == LifecycleState::Starting {
            *state = LifecycleState::Running;
            StartOutcome::Running
        } else {
            StartOutcome::StoppedMeanwhile
        }
    }

    /// Roll back a failed start: `Starting` → `Unstarted`.
    pub fn abort_start(&self) {
        let mut state = self.state.lock();
        if *state == LifecycleState::Starting {
            *state = LifecycleState::Unstarted;
        }
    }

    /// Move to `Stopped`, returning the previous state.
    pub fn stop(&self) -> LifecycleState {
        std::mem::replace(&mut *self.state.lock(), LifecycleState::Stopped)
    }
}
