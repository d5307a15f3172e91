//! Protocol dispatcher: resolves the sending connection to a username,
//! refreshes activity, routes by opcode, and answers the sender directly
//! when (and only when) the wire table calls for a reply. Fan-out opcodes
//! (CHANGE_STATUS, SEND_MESSAGE) already include the sender in their
//! `notify` audience, so the dispatcher itself returns nothing for them —
//! returning a reply too would deliver the event to the sender twice.
//! Malformed frames and unknown opcodes are logged and dropped per the
//! error-handling design: no reply is sent and the connection stays open.

use std::time::Instant;

use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::notify;
use crate::protocol::{
    self, error_codes, ChangeStatusRequest, GetHistoryRequest, GetUserInfoRequest,
    SendMessageRequest, Status, Target, OP_CHANGE_STATUS, OP_GET_HISTORY, OP_GET_USER_INFO,
    OP_LIST_USERS, OP_SEND_MESSAGE,
};
use crate::registry::ConnHandle;
use crate::state::GatewayState;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    #[error("frame attributed to a connection with no registry entry")]
    UnknownSender,
}

/// Dispatches one inbound frame. Returns `Some(bytes)` when the wire table
/// calls for a direct reply to the sender, `None` when the frame was
/// malformed/unrecognized (logged and dropped) or when the opcode's
/// effect was already delivered to the sender via `notify`.
pub fn dispatch(state: &GatewayState, conn: &ConnHandle, frame: &[u8]) -> Option<Vec<u8>> {
    match dispatch_inner(state, conn, frame) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(error = %err, "dropping malformed or invalid frame");
            None
        }
    }
}

fn dispatch_inner(
    state: &GatewayState,
    conn: &ConnHandle,
    frame: &[u8],
) -> Result<Option<Vec<u8>>, DispatchError> {
    codec::check_frame_size(frame)?;
    let (opcode, n) = codec::read_u8(frame)?;
    let body = &frame[n..];
    let now = Instant::now();

    let username = {
        let core = state.core.read();
        core.registry
            .username_for_conn(conn)
            .map(|s| s.to_string())
    }
    .ok_or(DispatchError::UnknownSender)?;

    // Every dispatched request refreshes activity. Only SEND_MESSAGE can
    // promote a user back out of Inactive (see spec's reconciliation of
    // the inactivity monitor with the reactivation rule).
    {
        let mut core = state.core.write();
        core.registry.touch(&username, now);
    }

    match opcode {
        OP_LIST_USERS => {
            let users = state.core.read().registry.snapshot();
            Ok(Some(protocol::encode_list_users_reply(&users)))
        }

        OP_GET_USER_INFO => {
            let req = GetUserInfoRequest::decode(body)?;
            let core = state.core.read();
            match core.registry.get(&req.target) {
                Some(rec) => Ok(Some(protocol::encode_user_info_reply(
                    &rec.username,
                    rec.status,
                ))),
                None => Ok(Some(protocol::encode_error(error_codes::UNKNOWN_USER))),
            }
        }

        OP_CHANGE_STATUS => {
            let req = ChangeStatusRequest::decode(body)?;
            if req.target != username {
                return Ok(Some(protocol::encode_error(error_codes::INVALID_STATUS)));
            }
            let Some(status) = Status::from_byte(req.status) else {
                return Ok(Some(protocol::encode_error(error_codes::INVALID_STATUS)));
            };
            if status == Status::Disconnected {
                return Ok(Some(protocol::encode_error(error_codes::INVALID_STATUS)));
            }
            let changed = {
                let mut core = state.core.write();
                core.registry.update_status(&username, status)
            };
            if changed {
                notify::user_status_change(state, &username, status);
            }
            // The status-change notification already reached the sender
            // as part of the fan-out audience; no separate reply here.
            Ok(None)
        }

        OP_SEND_MESSAGE => {
            let req = SendMessageRequest::decode(body)?;

            if req.body.is_empty() {
                return Ok(Some(protocol::encode_error(error_codes::EMPTY_MESSAGE)));
            }

            if let Target::User(ref recipient) = req.target {
                match state.core.read().registry.get(recipient) {
                    None => {
                        return Ok(Some(protocol::encode_error(error_codes::UNKNOWN_USER)));
                    }
                    Some(rec) if !rec.is_connected() => {
                        return Ok(Some(protocol::encode_error(
                            error_codes::DEST_DISCONNECTED,
                        )));
                    }
                    Some(_) => {}
                }
            }

            // Reactivate out of Inactive on an outbound message, the one
            // status promotion the dispatcher itself performs.
            let reactivated = {
                let mut core = state.core.write();
                let was_inactive =
                    core.registry.get(&username).map(|r| r.status) == Some(Status::Inactive);
                if was_inactive {
                    core.registry.update_status(&username, Status::Active);
                }
                was_inactive
            };
            if reactivated {
                notify::user_status_change(state, &username, Status::Active);
            }

            {
                let mut core = state.core.write();
                match &req.target {
                    Target::General => core.history.append_general(&username, &req.body),
                    Target::User(recipient) => {
                        core.history
                            .append_private(&username, recipient, &username, &req.body)
                    }
                }
            }

            notify::new_message(state, &username, &req.target, &req.body);
            // The message already reached the sender as part of the
            // fan-out audience; no separate reply here.
            Ok(None)
        }

        OP_GET_HISTORY => {
            let req = GetHistoryRequest::decode(body)?;
            let core = state.core.read();
            let entries = match &req.target {
                Target::General => core.history.general(),
                Target::User(peer) => core.history.private(&username, peer),
            };
            let pairs: Vec<(String, String)> =
                entries.into_iter().map(|e| (e.sender, e.body)).collect();
            Ok(Some(protocol::encode_history_reply(&pairs)))
        }

        other => Err(DispatchError::UnknownOpcode(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn setup(username: &str) -> (GatewayState, ConnHandle, mpsc::UnboundedReceiver<Vec<u8>>) {
        let state = GatewayState::new();
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .core
            .write()
            .registry
            .admit(username, None, tx.clone(), Instant::now())
            .unwrap();
        (state, tx, rx)
    }

    #[test]
    fn list_users_replies_with_roster() {
        let (state, conn, _rx) = setup("alice");
        let reply = dispatch(&state, &conn, &[OP_LIST_USERS]).unwrap();
        assert_eq!(reply[0], protocol::OP_LIST_USERS_REPLY);
    }

    #[test]
    fn change_status_rejects_mismatched_target() {
        let (state, conn, _rx) = setup("alice");
        let mut frame = vec![OP_CHANGE_STATUS];
        codec::write_str8(&mut frame, "bob");
        codec::write_u8(&mut frame, Status::Busy.to_byte());
        let reply = dispatch(&state, &conn, &frame).unwrap();
        assert_eq!(reply, vec![protocol::OP_ERROR, error_codes::INVALID_STATUS]);
    }

    #[test]
    fn change_status_applies_to_self_with_no_direct_reply() {
        let (state, conn, mut rx) = setup("alice");
        let mut frame = vec![OP_CHANGE_STATUS];
        codec::write_str8(&mut frame, "alice");
        codec::write_u8(&mut frame, Status::Busy.to_byte());
        let reply = dispatch(&state, &conn, &frame);
        assert!(reply.is_none());
        assert_eq!(state.core.read().registry.get("alice").unwrap().status, Status::Busy);
        // Delivered once, via the fan-out notification, not via a reply.
        let notified = rx.try_recv().unwrap();
        assert_eq!(notified[0], protocol::OP_USER_STATUS_CHANGE);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_message_to_unknown_recipient_errors() {
        let (state, conn, _rx) = setup("alice");
        let mut frame = vec![OP_SEND_MESSAGE];
        codec::write_str8(&mut frame, "ghost");
        codec::write_str8(&mut frame, "hi");
        let reply = dispatch(&state, &conn, &frame).unwrap();
        assert_eq!(reply, vec![protocol::OP_ERROR, error_codes::UNKNOWN_USER]);
    }

    #[test]
    fn send_message_to_disconnected_recipient_errors() {
        let (state, conn, _rx) = setup("alice");
        let (bob_tx, bob_rx) = mpsc::unbounded_channel();
        state
            .core
            .write()
            .registry
            .admit("bob", None, bob_tx, Instant::now())
            .unwrap();
        state.core.write().registry.detach("bob");
        drop(bob_rx);

        let mut frame = vec![OP_SEND_MESSAGE];
        codec::write_str8(&mut frame, "bob");
        codec::write_str8(&mut frame, "hi bob");
        let reply = dispatch(&state, &conn, &frame).unwrap();
        assert_eq!(
            reply,
            vec![protocol::OP_ERROR, error_codes::DEST_DISCONNECTED]
        );
    }

    #[test]
    fn send_message_with_empty_body_errors() {
        let (state, conn, _rx) = setup("alice");
        let mut frame = vec![OP_SEND_MESSAGE];
        codec::write_str8(&mut frame, "");
        codec::write_str8(&mut frame, "");
        let reply = dispatch(&state, &conn, &frame).unwrap();
        assert_eq!(reply, vec![protocol::OP_ERROR, error_codes::EMPTY_MESSAGE]);
    }

    #[test]
    fn send_message_has_no_direct_reply() {
        let (state, conn, mut rx) = setup("alice");
        let mut frame = vec![OP_SEND_MESSAGE];
        codec::write_str8(&mut frame, "");
        codec::write_str8(&mut frame, "hello room");
        let reply = dispatch(&state, &conn, &frame);
        assert!(reply.is_none());
        let notified = rx.try_recv().unwrap();
        assert_eq!(notified[0], protocol::OP_NEW_MESSAGE);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn get_history_returns_general_log() {
        let (state, conn, _rx) = setup("alice");
        let mut send_frame = vec![OP_SEND_MESSAGE];
        codec::write_str8(&mut send_frame, "");
        codec::write_str8(&mut send_frame, "hello room");
        dispatch(&state, &conn, &send_frame);

        let mut history_frame = vec![OP_GET_HISTORY];
        codec::write_str8(&mut history_frame, "");
        let reply = dispatch(&state, &conn, &history_frame).unwrap();
        assert_eq!(reply[0], protocol::OP_HISTORY_REPLY);
    }

    #[test]
    fn unknown_opcode_yields_no_reply() {
        let (state, conn, _rx) = setup("alice");
        let reply = dispatch(&state, &conn, &[200]);
        assert!(reply.is_none());
    }
}
