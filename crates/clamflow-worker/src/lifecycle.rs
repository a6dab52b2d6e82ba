//! Consumer lifecycle.
//!
//! `Created -> Running -> Closing -> Closed`, or `Created -> Closed` when the
//! consumer is closed before it ever started. A cancellation token records
//! that the stop was requested, so the receive loop can tell an intentional
//! close from a broker fault.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::error::ConsumerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Created,
    Running,
    Closing,
    Closed,
}

impl Display for ConsumerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ConsumerState::Created => "created",
            ConsumerState::Running => "running",
            ConsumerState::Closing => "closing",
            ConsumerState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct ConsumerLifecycle {
    state: Mutex<ConsumerState>,
    shutdown: CancellationToken,
}

impl Default for ConsumerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerLifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConsumerState::Created),
            shutdown: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConsumerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConsumerState {
        *self.lock()
    }

    /// Move to `Running`.
    ///
    /// Returns `Ok(false)` when the consumer was already closed and there is
    /// nothing to run.
    pub fn begin(&self) -> Result<bool, ConsumerError> {
        let mut state = self.lock();
        match *state {
            ConsumerState::Created => {
                *state = ConsumerState::Running;
                Ok(true)
            }
            ConsumerState::Running => Err(ConsumerError::AlreadyRunning),
            ConsumerState::Closing | ConsumerState::Closed => Ok(false),
        }
    }

    /// Request a stop. Only the first call has an effect; it returns `true`.
    pub fn request_close(&self) -> bool {
        let mut state = self.lock();
        let next = match *state {
            ConsumerState::Created => ConsumerState::Closed,
            ConsumerState::Running => ConsumerState::Closing,
            ConsumerState::Closing | ConsumerState::Closed => return false,
        };
        *state = next;
        self.shutdown.cancel();
        true
    }

    /// Mark the receive loop as exited.
    pub fn finish(&self) {
        *self.lock() = ConsumerState::Closed;
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
