//! Connection lifecycle: admit on open, dispatch on message, detach and
//! announce on close. One `on_*` call per WebSocket event, driven by the
//! transport layer in `ws`/`server`.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::monitor;
use crate::notify;
use crate::protocol::Status;
use crate::registry::{AdmitError, ConnHandle};
use crate::state::GatewayState;

/// Admits `username` on a fresh connection. Starts the background monitors
/// on the very first successful admission (start-once, guarded on
/// `GatewayState`). Returns an error for an invalid or already-connected
/// name; the caller (the HTTP upgrade handler) is expected to reject the
/// upgrade itself before this is reached, so this is the second line of
/// defense against a race between two concurrent upgrades for the same
/// name.
pub fn on_open(
    state: &Arc<GatewayState>,
    username: &str,
    remote_ip: Option<IpAddr>,
    conn: ConnHandle,
) -> Result<(), AdmitError> {
    let (_, _reconnected) = {
        let mut core = state.core.write();
        core.registry.admit(username, remote_ip, conn, Instant::now())?
    };

    if state.claim_monitor_start() {
        monitor::spawn_all(Arc::clone(state));
    }

    notify::user_joined(state, username);
    Ok(())
}

/// Dispatches one inbound frame, returning the reply owed to the sender, if
/// any. `None` means the frame was malformed/unrecognized and was silently
/// dropped, or that its effect was already delivered via fan-out.
pub fn on_message(state: &GatewayState, conn: &ConnHandle, frame: &[u8]) -> Option<Vec<u8>> {
    crate::dispatch::dispatch(state, conn, frame)
}

/// Detaches `username`, retaining its last status, and announces the
/// resulting `Disconnected` state to everyone else.
pub fn on_close(state: &GatewayState, username: &str) {
    let detached = {
        let mut core = state.core.write();
        core.registry.detach(username)
    };
    if detached {
        notify::user_status_change(state, username, Status::Disconnected);
    }
}
