//! Shared gateway state: the single lock spanning the registry and both
//! history logs, plus process-wide bookkeeping (start time, monitor
//! start-once guard).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::RwLock;

use crate::history::History;
use crate::registry::Registry;

/// Everything that must change atomically together: admitting/detaching a
/// user and appending to history can never be observed half-done by a
/// concurrent reader, so both live behind one lock rather than two.
pub struct Core {
    pub registry: Registry,
    pub history: History,
}

impl Core {
    fn new() -> Self {
        Core {
            registry: Registry::new(),
            history: History::new(),
        }
    }
}

pub struct GatewayState {
    pub core: RwLock<Core>,
    pub start_time: Instant,
    monitors_started: AtomicBool,
}

impl GatewayState {
    pub fn new() -> Self {
        GatewayState {
            core: RwLock::new(Core::new()),
            start_time: Instant::now(),
            monitors_started: AtomicBool::new(false),
        }
    }

    /// Returns `true` the first time it's called; `false` on every later
    /// call. Used to spawn the background monitors exactly once no matter
    /// how many connections race through `on_open`.
    pub fn claim_monitor_start(&self) -> bool {
        self.monitors_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn connected_count(&self) -> usize {
        self.core.read().registry.connected().len()
    }
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}
