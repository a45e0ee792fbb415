//! Wakeup and shutdown primitives shared by the producer and the
//! acquisition thread.
//!
//! `WakeSignal` is a generation counter behind a mutex + condvar: every
//! producer batch bumps the generation and broadcasts, and a waiter returns as
//! soon as the generation differs from the one it last saw. Bursts coalesce
//! into one wakeup but none are lost.
//!
//! `Shutdown` is level-triggered: once cancelled it stays cancelled, and the
//! cancel broadcasts on the wake signal so a blocked waiter observes it.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

/// Why a wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// New producer activity; carries the generation now observed.
    Activity(u64),
    Shutdown,
}

pub struct WakeSignal {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// Producer side: record new activity and wake every waiter.
    /// Holds the lock only for an increment.
    #[inline]
    pub fn notify(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.cond.notify_all();
    }

    /// Wake every waiter without recording activity.
    pub fn broadcast(&self) {
        let _guard = self.generation.lock();
        self.cond.notify_all();
    }

    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Block until the generation moves past `seen` or `shutdown` is
    /// cancelled. Shutdown wins when both hold. Spurious condvar wakeups loop
    /// back into the wait.
    pub fn wait_past(&self, seen: u64, shutdown: &Shutdown) -> Wake {
        let mut generation = self.generation.lock();
        loop {
            if shutdown.is_triggered() {
                return Wake::Shutdown;
            }
            if *generation != seen {
                return Wake::Activity(*generation);
            }
            self.cond.wait(&mut generation);
        }
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative, level-triggered stop signal. Cheap to clone; all clones
/// share one state.
#[derive(Clone)]
pub struct Shutdown {
    token: CancellationToken,
    wake: Arc<WakeSignal>,
}

impl Shutdown {
    pub fn new(wake: Arc<WakeSignal>) -> Self {
        Self {
            token: CancellationToken::new(),
            wake,
        }
    }

    /// Request shutdown and wake any blocked waiter. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
        self.wake.broadcast();
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }
}
