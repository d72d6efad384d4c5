//! Wire protocol shared by the room server and every client.
//!
//! Every datagram is a fixed 10-byte header followed by at most
//! [`MAX_PAYLOAD`] payload bytes. The header layout never changes; new
//! semantics get a new [`MessageType`] instead of a version field.

pub mod error;
pub mod packet;

pub use error::{ErrorCode, ProtocolError};
pub use packet::{
    max_list_len, validate_name, Header, MemberName, MessageType, Packet, RoomId, RoomSummary,
    ENCODED_ROOM_SUMMARY, HEADER_LEN, LIST_PREFIX_LEN, MAX_ENCODED_ENDPOINT,
    MAX_ENCODED_MEMBER_NAME, MAX_PAYLOAD,
};

/// Default control port of the server; liveness traffic uses the next port up.
pub const DEFAULT_SERVER_PORT: u16 = 7400;
pub const DEFAULT_MAX_ROOMS: usize = 20;
pub const DEFAULT_MAX_MEMBERS: usize = 20;
pub const DEFAULT_PROBE_PERIOD_SECS: u64 = 60;

/// Longest display name in bytes.
pub const MAX_NAME_LEN: usize = 19;

/// Payload announcing that a round is over and boards should be reset.
pub const RESET_SENTINEL: &str = "BINGO!";

/// Receive buffer size for every socket in the system.
pub const RECV_BUFFER_LEN: usize = 2048;
