//! Wire message shapes: opcode constants, the presence/status byte mapping,
//! and typed encode/decode for every request and response named by the
//! wire table. Plain structs, not an enum-of-variants wrapper — each opcode
//! maps to exactly one shape and the dispatcher already knows which is
//! expected once it has read the opcode byte.

use crate::codec::{self, CodecError};

// Requests (client -> server)
pub const OP_LIST_USERS: u8 = 1;
pub const OP_GET_USER_INFO: u8 = 2;
pub const OP_CHANGE_STATUS: u8 = 3;
pub const OP_SEND_MESSAGE: u8 = 4;
pub const OP_GET_HISTORY: u8 = 5;

// Responses / events (server -> client)
pub const OP_ERROR: u8 = 50;
pub const OP_LIST_USERS_REPLY: u8 = 51;
pub const OP_USER_INFO_REPLY: u8 = 52;
pub const OP_USER_JOINED: u8 = 53;
pub const OP_USER_STATUS_CHANGE: u8 = 54;
pub const OP_NEW_MESSAGE: u8 = 55;
pub const OP_HISTORY_REPLY: u8 = 56;

pub mod error_codes {
    pub const UNKNOWN_USER: u8 = 1;
    pub const INVALID_STATUS: u8 = 2;
    pub const EMPTY_MESSAGE: u8 = 3;
    pub const DEST_DISCONNECTED: u8 = 4;
}

/// Presence status, wire-encoded as a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Disconnected = 0,
    Active = 1,
    Busy = 2,
    Inactive = 3,
}

impl Status {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(b: u8) -> Option<Status> {
        match b {
            0 => Some(Status::Disconnected),
            1 => Some(Status::Active),
            2 => Some(Status::Busy),
            3 => Some(Status::Inactive),
            _ => None,
        }
    }
}

/// A message target: the empty string on the wire means the general room;
/// anything else names a specific recipient for a private message/history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    General,
    User(String),
}

impl Target {
    fn decode(buf: &[u8]) -> Result<(Target, usize), CodecError> {
        let (s, n) = codec::read_str8(buf)?;
        let target = if s.is_empty() {
            Target::General
        } else {
            Target::User(s)
        };
        Ok((target, n))
    }
}

// ---- Requests ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUserInfoRequest {
    pub target: String,
}

impl GetUserInfoRequest {
    pub fn decode(buf: &[u8]) -> Result<GetUserInfoRequest, CodecError> {
        let (target, _) = codec::read_str8(buf)?;
        Ok(GetUserInfoRequest { target })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeStatusRequest {
    /// The username this status change claims to apply to. Must match the
    /// sender attributed to the connection — a mismatch is rejected rather
    /// than honored as a proxy status change for someone else.
    pub target: String,
    pub status: u8,
}

impl ChangeStatusRequest {
    pub fn decode(buf: &[u8]) -> Result<ChangeStatusRequest, CodecError> {
        let (target, n1) = codec::read_str8(buf)?;
        let (status, _) = codec::read_u8(&buf[n1..])?;
        Ok(ChangeStatusRequest { target, status })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub target: Target,
    pub body: String,
}

impl SendMessageRequest {
    pub fn decode(buf: &[u8]) -> Result<SendMessageRequest, CodecError> {
        let (target, n1) = Target::decode(buf)?;
        let (body, _) = codec::read_str8(&buf[n1..])?;
        Ok(SendMessageRequest { target, body })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetHistoryRequest {
    pub target: Target,
}

impl GetHistoryRequest {
    pub fn decode(buf: &[u8]) -> Result<GetHistoryRequest, CodecError> {
        let (target, _) = Target::decode(buf)?;
        Ok(GetHistoryRequest { target })
    }
}

// ---- Responses / events ----

pub fn encode_error(code: u8) -> Vec<u8> {
    let mut out = vec![OP_ERROR];
    codec::write_u8(&mut out, code);
    out
}

pub fn encode_list_users_reply(users: &[(String, Status)]) -> Vec<u8> {
    let mut out = vec![OP_LIST_USERS_REPLY];
    codec::write_u8(&mut out, users.len().min(u8::MAX as usize) as u8);
    for (name, status) in users.iter().take(u8::MAX as usize) {
        codec::write_str8(&mut out, name);
        codec::write_u8(&mut out, status.to_byte());
    }
    out
}

pub fn encode_user_info_reply(username: &str, status: Status) -> Vec<u8> {
    let mut out = vec![OP_USER_INFO_REPLY];
    codec::write_str8(&mut out, username);
    codec::write_u8(&mut out, status.to_byte());
    out
}

pub fn encode_user_joined(username: &str, status: Status) -> Vec<u8> {
    let mut out = vec![OP_USER_JOINED];
    codec::write_str8(&mut out, username);
    codec::write_u8(&mut out, status.to_byte());
    out
}

pub fn encode_user_status_change(username: &str, status: Status) -> Vec<u8> {
    let mut out = vec![OP_USER_STATUS_CHANGE];
    codec::write_str8(&mut out, username);
    codec::write_u8(&mut out, status.to_byte());
    out
}

pub fn encode_new_message(sender: &str, body: &str) -> Vec<u8> {
    let mut out = vec![OP_NEW_MESSAGE];
    codec::write_str8(&mut out, sender);
    codec::write_str8(&mut out, body);
    out
}

pub fn encode_history_reply(entries: &[(String, String)]) -> Vec<u8> {
    let mut out = vec![OP_HISTORY_REPLY];
    codec::write_u8(&mut out, entries.len().min(u8::MAX as usize) as u8);
    for (sender, body) in entries.iter().take(u8::MAX as usize) {
        codec::write_str8(&mut out, sender);
        codec::write_str8(&mut out, body);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_byte_roundtrip() {
        for (b, s) in [
            (0u8, Status::Disconnected),
            (1, Status::Active),
            (2, Status::Busy),
            (3, Status::Inactive),
        ] {
            assert_eq!(Status::from_byte(b), Some(s));
            assert_eq!(s.to_byte(), b);
        }
        assert_eq!(Status::from_byte(9), None);
    }

    #[test]
    fn send_message_request_general_target() {
        let mut buf = Vec::new();
        codec::write_str8(&mut buf, "");
        codec::write_str8(&mut buf, "hello room");
        let req = SendMessageRequest::decode(&buf).unwrap();
        assert_eq!(req.target, Target::General);
        assert_eq!(req.body, "hello room");
    }

    #[test]
    fn send_message_request_private_target() {
        let mut buf = Vec::new();
        codec::write_str8(&mut buf, "bob");
        codec::write_str8(&mut buf, "hi bob");
        let req = SendMessageRequest::decode(&buf).unwrap();
        assert_eq!(req.target, Target::User("bob".to_string()));
        assert_eq!(req.body, "hi bob");
    }

    #[test]
    fn list_users_reply_has_opcode_prefix() {
        let out = encode_list_users_reply(&[("alice".to_string(), Status::Active)]);
        assert_eq!(out[0], OP_LIST_USERS_REPLY);
    }

    #[test]
    fn error_reply_is_exactly_two_bytes() {
        let out = encode_error(error_codes::UNKNOWN_USER);
        assert_eq!(out, vec![OP_ERROR, error_codes::UNKNOWN_USER]);
    }

    #[test]
    fn user_joined_carries_status_byte() {
        let out = encode_user_joined("alice", Status::Active);
        assert_eq!(out, vec![OP_USER_JOINED, 5, b'a', b'l', b'i', b'c', b'e', 1]);
    }

    #[test]
    fn new_message_has_no_target_field() {
        let out = encode_new_message("alice", "hi");
        assert_eq!(
            out,
            vec![OP_NEW_MESSAGE, 5, b'a', b'l', b'i', b'c', b'e', 2, b'h', b'i']
        );
    }
}
