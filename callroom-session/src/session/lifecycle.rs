use callroom_core::ConnectionPhase;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Holds the current phase and rejects transitions the phase machine does
/// not allow.
#[derive(Debug)]
pub struct PhaseTracker {
    tx: watch::Sender<ConnectionPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionPhase::Idle);
        Self { tx }
    }

    pub fn current(&self) -> ConnectionPhase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionPhase> {
        self.tx.subscribe()
    }

    /// Moves to `next`. Returns `false` and leaves the phase unchanged when
    /// the transition is not allowed.
    pub fn advance(&self, next: ConnectionPhase) -> bool {
        let current = self.current();
        if !current.can_transition_to(next) {
            warn!("Ignoring phase change {:?} -> {:?}", current, next);
            return false;
        }
        debug!("Phase {:?} -> {:?}", current, next);
        self.tx.send_replace(next);
        true
    }
}

/// Re-entrancy guard around teardown.
///
/// Only one teardown may run at a time, and after it finishes another one is
/// refused until the cooldown has passed.
#[derive(Debug, Clone)]
pub struct TeardownGuard {
    running: Arc<AtomicBool>,
    cooldown: Duration,
}

impl TeardownGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            cooldown,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// `None` while a teardown is running or cooling down.
    pub fn try_begin(&self) -> Option<TeardownPermit> {
        if self.running.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(TeardownPermit {
            running: self.running.clone(),
            cooldown: self.cooldown,
        })
    }
}

/// Held for the duration of one teardown. Dropping it starts the cooldown.
#[derive(Debug)]
pub struct TeardownPermit {
    running: Arc<AtomicBool>,
    cooldown: Duration,
}

impl Drop for TeardownPermit {
    fn drop(&mut self) {
        let running = self.running.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) if !self.cooldown.is_zero() => {
                let cooldown = self.cooldown;
                handle.spawn(async move {
                    tokio::time::sleep(cooldown).await;
                    running.store(false, Ordering::Release);
                });
            }
            _ => running.store(false, Ordering::Release),
        }
    }
}
