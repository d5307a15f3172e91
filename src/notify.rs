//! Fan-out notifications. Every function here takes a lock-free snapshot
//! (clone the handles it needs, drop the read guard) before writing to any
//! socket, so a slow or blocked client can never hold up the registry lock.
//! A single failed send (closed channel) is swallowed — the owning
//! connection's read side will notice the close and detach on its own.

use crate::protocol::{self, Status, Target};
use crate::registry::ConnHandle;
use crate::state::GatewayState;

fn send(conn: &ConnHandle, bytes: Vec<u8>) {
    let _ = conn.send(bytes);
}

/// Announces a newly admitted (or reconnected) user to everyone else.
pub fn user_joined(state: &GatewayState, username: &str) {
    let (status, audience) = {
        let core = state.core.read();
        let status = core
            .registry
            .get(username)
            .map(|r| r.status)
            .unwrap_or(Status::Active);
        (status, core.registry.connected_except(username))
    };
    let bytes = protocol::encode_user_joined(username, status);
    for (_, conn) in audience {
        send(&conn, bytes.clone());
    }
}

/// Announces a status transition to every connected user, including the
/// subject itself (so its own client reflects the confirmed state).
pub fn user_status_change(state: &GatewayState, username: &str, status: Status) {
    let audience = {
        let core = state.core.read();
        core.registry.connected()
    };
    let bytes = protocol::encode_user_status_change(username, status);
    for (_, conn) in audience {
        send(&conn, bytes.clone());
    }
}

/// Delivers a chat message per its target: broadcast to every connected
/// user (sender included, as an echo/ack), or to exactly the sender and
/// the named recipient for a private message.
pub fn new_message(state: &GatewayState, sender: &str, target: &Target, body: &str) {
    let bytes = protocol::encode_new_message(sender, body);
    let audience = {
        let core = state.core.read();
        match target {
            Target::General => core.registry.connected(),
            Target::User(recipient) => {
                let mut out = Vec::with_capacity(2);
                if let Some(c) = core.registry.get(sender).and_then(|r| r.conn.clone()) {
                    out.push((sender.to_string(), c));
                }
                if recipient != sender {
                    if let Some(c) = core.registry.get(recipient).and_then(|r| r.conn.clone()) {
                        out.push((recipient.clone(), c));
                    }
                }
                out
            }
        }
    };
    for (_, conn) in audience {
        send(&conn, bytes.clone());
    }
}
