//! The user registry: one map from username to connection/presence state,
//! plus the retained-status side table. Callers (state.rs) hold this behind
//! a single `parking_lot::RwLock` alongside the history store, so that
//! admit/detach decisions and history writes can never interleave
//! inconsistently — deliberately not a `DashMap`, whose independent shard
//! locks cannot give that cross-structure atomicity.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::Status;

/// Outbound channel to a connected client's write task. Cloned cheaply per
/// notification fan-out; a closed receiver just means the write silently
/// fails and the connection is reaped on its own read-side close/timeout.
pub type ConnHandle = mpsc::UnboundedSender<Vec<u8>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmitError {
    #[error("invalid name: must be non-empty and not '~'")]
    InvalidName,

    #[error("user '{0}' is already connected")]
    Duplicate(String),
}

#[derive(Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub status: Status,
    pub conn: Option<ConnHandle>,
    pub remote_ip: Option<IpAddr>,
    pub connected_at: Instant,
    pub last_active: Instant,
}

impl UserRecord {
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}

/// Validates a candidate username per the admission rule: non-empty and
/// not the literal placeholder `~`.
pub fn validate_name(name: &str) -> Result<(), AdmitError> {
    if name.is_empty() || name == "~" {
        return Err(AdmitError::InvalidName);
    }
    Ok(())
}

#[derive(Default)]
pub struct Registry {
    users: HashMap<String, UserRecord>,
    /// Last known non-disconnected status, kept for users currently
    /// detached so a later reconnect (or an info query) can see what they
    /// were doing before they dropped, independent of the live `status`
    /// field on the (possibly absent) connection.
    retained_status: HashMap<String, Status>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `username` with a fresh connection handle. If the name is
    /// already connected, returns `Duplicate`. If the name was previously
    /// seen and is currently disconnected, this is a reconnect: the
    /// existing record is reused (same `id`) and forced to `Active`,
    /// regardless of its retained status.
    pub fn admit(
        &mut self,
        username: &str,
        remote_ip: Option<IpAddr>,
        conn: ConnHandle,
        now: Instant,
    ) -> Result<(Uuid, bool), AdmitError> {
        validate_name(username)?;

        if let Some(existing) = self.users.get_mut(username) {
            if existing.is_connected() {
                return Err(AdmitError::Duplicate(username.to_string()));
            }
            existing.conn = Some(conn);
            existing.status = Status::Active;
            existing.remote_ip = remote_ip;
            existing.connected_at = now;
            existing.last_active = now;
            self.retained_status.remove(username);
            return Ok((existing.id, true));
        }

        let id = Uuid::new_v4();
        self.users.insert(
            username.to_string(),
            UserRecord {
                id,
                username: username.to_string(),
                status: Status::Active,
                conn: Some(conn),
                remote_ip,
                connected_at: now,
                last_active: now,
            },
        );
        Ok((id, false))
    }

    /// Marks `username` disconnected: clears the connection handle, retains
    /// the last non-disconnected status, and flips the live status to
    /// `Disconnected`. Returns `false` if the user wasn't present.
    pub fn detach(&mut self, username: &str) -> bool {
        let Some(record) = self.users.get_mut(username) else {
            return false;
        };
        if record.status != Status::Disconnected {
            self.retained_status.insert(username.to_string(), record.status);
        }
        record.conn = None;
        record.status = Status::Disconnected;
        true
    }

    /// Updates a connected user's status. Returns `false` if the user is
    /// absent or not currently connected (status changes only apply to
    /// live connections).
    pub fn update_status(&mut self, username: &str, status: Status) -> bool {
        match self.users.get_mut(username) {
            Some(record) if record.is_connected() => {
                record.status = status;
                true
            }
            _ => false,
        }
    }

    /// Refreshes `last_active` for a connected user. No-op for an absent
    /// or disconnected user.
    pub fn touch(&mut self, username: &str, now: Instant) {
        if let Some(record) = self.users.get_mut(username) {
            if record.is_connected() {
                record.last_active = now;
            }
        }
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub fn retained_status(&self, username: &str) -> Option<Status> {
        self.retained_status.get(username).copied()
    }

    /// Snapshot of every known user (connected or not) for roster replies.
    pub fn snapshot(&self) -> Vec<(String, Status)> {
        let mut out: Vec<_> = self
            .users
            .values()
            .map(|r| (r.username.clone(), r.status))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// All connected users' handles other than `exclude`, for fan-out.
    pub fn connected_except(&self, exclude: &str) -> Vec<(String, ConnHandle)> {
        self.users
            .values()
            .filter(|r| r.username != exclude)
            .filter_map(|r| r.conn.clone().map(|c| (r.username.clone(), c)))
            .collect()
    }

    pub fn connected(&self) -> Vec<(String, ConnHandle)> {
        self.users
            .values()
            .filter_map(|r| r.conn.clone().map(|c| (r.username.clone(), c)))
            .collect()
    }

    /// Resolves the username that owns a given outbound connection handle
    /// (matched by the sender's underlying channel identity). This is the
    /// O(n) sender-lookup path the dispatcher uses to attribute an inbound
    /// frame to a username; the cost is intentionally accepted (see the
    /// dispatcher module).
    pub fn username_for_conn(&self, conn: &ConnHandle) -> Option<&str> {
        self.users
            .values()
            .find(|r| r.conn.as_ref().is_some_and(|c| c.same_channel(conn)))
            .map(|r| r.username.as_str())
    }

    /// Users whose `last_active` predates `threshold` and who are
    /// currently `Active` or `Busy` — candidates for inactivity promotion.
    pub fn idle_candidates(&self, threshold: Instant) -> Vec<String> {
        self.users
            .values()
            .filter(|r| {
                r.is_connected()
                    && matches!(r.status, Status::Active | Status::Busy)
                    && r.last_active < threshold
            })
            .map(|r| r.username.clone())
            .collect()
    }

    /// Users disconnected before `threshold` — candidates for hard eviction.
    pub fn stale_disconnects(&self, threshold: Instant) -> Vec<String> {
        self.users
            .values()
            .filter(|r| !r.is_connected() && r.last_active < threshold)
            .map(|r| r.username.clone())
            .collect()
    }

    /// Permanently removes a user record (used by the disconnection reaper).
    pub fn evict(&mut self, username: &str) {
        self.users.remove(username);
        self.retained_status.remove(username);
    }
}
