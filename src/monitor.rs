//! Background monitors: inactivity promotion and the disconnection reaper.
//! Both run as supervised `tokio::spawn`ed tasks tied to the process
//! lifetime (not detached threads), started once from `session::on_open`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::notify;
use crate::protocol::Status;
use crate::state::GatewayState;

const INACTIVITY_TICK: Duration = Duration::from_secs(5);
const INACTIVITY_THRESHOLD: Duration = Duration::from_secs(60);
const REAP_TICK: Duration = Duration::from_secs(60);
const REAP_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Spawns both background monitors. Called exactly once per process, on
/// the first successful connection admission.
pub fn spawn_all(state: Arc<GatewayState>) {
    tokio::spawn(inactivity_monitor(Arc::clone(&state)));
    tokio::spawn(disconnection_reaper(state));
}

async fn inactivity_monitor(state: Arc<GatewayState>) {
    let mut interval = tokio::time::interval(INACTIVITY_TICK);
    loop {
        interval.tick().await;
        let threshold = Instant::now() - INACTIVITY_THRESHOLD;
        let candidates = {
            let core = state.core.read();
            core.registry.idle_candidates(threshold)
        };
        for username in candidates {
            let promoted = {
                let mut core = state.core.write();
                core.registry.update_status(&username, Status::Inactive)
            };
            if promoted {
                tracing::info!(user = %username, "marked inactive");
                notify::user_status_change(&state, &username, Status::Inactive);
            }
        }
    }
}

async fn disconnection_reaper(state: Arc<GatewayState>) {
    let mut interval = tokio::time::interval(REAP_TICK);
    loop {
        interval.tick().await;
        let threshold = Instant::now() - REAP_THRESHOLD;
        let stale = {
            let core = state.core.read();
            core.registry.stale_disconnects(threshold)
        };
        for username in stale {
            let mut core = state.core.write();
            core.registry.evict(&username);
            tracing::info!(user = %username, "evicted after grace period");
        }
    }
}
