//! Packet encoding and the message-type taxonomy

use crate::error::{ErrorCode, ProtocolError};
use crate::MAX_NAME_LEN;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

pub type RoomId = u32;

/// Encoded size of [`Header`]: type, error, room id, payload length.
pub const HEADER_LEN: usize = 10;
pub const MAX_PAYLOAD: usize = 1000;

/// Length prefix bincode writes before every list payload.
pub const LIST_PREFIX_LEN: usize = 8;
/// Largest encoded endpoint (IPv6): variant tag, address, port.
pub const MAX_ENCODED_ENDPOINT: usize = 4 + 16 + 2;
/// Largest encoded [`MemberName`]: endpoint, string length, name bytes.
pub const MAX_ENCODED_MEMBER_NAME: usize = MAX_ENCODED_ENDPOINT + 8 + MAX_NAME_LEN;
/// Encoded [`RoomSummary`]: three `u32` fields.
pub const ENCODED_ROOM_SUMMARY: usize = 12;

/// Longest list of `entry_len`-byte entries that always fits in one payload.
pub const fn max_list_len(entry_len: usize) -> usize {
    (MAX_PAYLOAD - LIST_PREFIX_LEN) / entry_len
}

/// What a datagram means. The discriminant is the byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    CreateGame = b'c',
    JoinGame = b'j',
    LeaveGame = b'l',
    RoomList = b'r',
    MembershipUpdate = b'u',
    RoundMessage = b'm',
    /// Nobody in the room is generating; recipients should take over.
    ElectionMessage = b'g',
    Probe = b'p',
    NameQuery = b'n',
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::CreateGame,
        MessageType::JoinGame,
        MessageType::LeaveGame,
        MessageType::RoomList,
        MessageType::MembershipUpdate,
        MessageType::RoundMessage,
        MessageType::ElectionMessage,
        MessageType::Probe,
        MessageType::NameQuery,
    ];

    pub fn to_wire(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        MessageType::ALL
            .into_iter()
            .find(|kind| kind.to_wire() == byte)
            .ok_or(ProtocolError::UnknownMessageType(byte))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub message_type: MessageType,
    pub error: Option<ErrorCode>,
    pub room_id: RoomId,
    pub payload_length: u32,
}

/// Header exactly as it travels: fixed-width, big-endian.
#[derive(Serialize, Deserialize)]
struct WireHeader {
    message_type: u8,
    error_code: u8,
    room_id: u32,
    payload_length: u32,
}

fn header_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
}

/// One entry of a RoomList response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub members: u32,
    pub capacity: u32,
}

impl fmt::Display for RoomSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game: {} - {}/{}", self.room_id, self.members, self.capacity)
    }
}

/// One entry of a NameQuery response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberName {
    pub endpoint: SocketAddr,
    pub name: String,
}

/// A header plus its payload. Constructors enforce the payload limit, so
/// every `Packet` that exists can be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: Header,
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(
        message_type: MessageType,
        room_id: RoomId,
        payload: Vec<u8>,
    ) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        Ok(Self {
            header: Header {
                message_type,
                error: None,
                room_id,
                payload_length: payload.len() as u32,
            },
            payload,
        })
    }

    pub fn empty(message_type: MessageType, room_id: RoomId) -> Self {
        Self {
            header: Header {
                message_type,
                error: None,
                room_id,
                payload_length: 0,
            },
            payload: Vec::new(),
        }
    }

    /// Error response; the message type is the one the code is scoped to.
    pub fn rejection(code: ErrorCode, room_id: RoomId) -> Self {
        let mut packet = Self::empty(code.answers(), room_id);
        packet.header.error = Some(code);
        packet
    }

    pub fn text(
        message_type: MessageType,
        room_id: RoomId,
        text: &str,
    ) -> Result<Self, ProtocolError> {
        Self::new(message_type, room_id, text.as_bytes().to_vec())
    }

    pub fn with_peers(
        message_type: MessageType,
        room_id: RoomId,
        peers: &[SocketAddr],
    ) -> Result<Self, ProtocolError> {
        Self::with_payload(message_type, room_id, &peers)
    }

    pub fn with_rooms(rooms: &[RoomSummary]) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::RoomList, 0, &rooms)
    }

    pub fn with_names(names: &[MemberName]) -> Result<Self, ProtocolError> {
        Self::with_payload(MessageType::NameQuery, 0, &names)
    }

    fn with_payload<T: Serialize + ?Sized>(
        message_type: MessageType,
        room_id: RoomId,
        value: &T,
    ) -> Result<Self, ProtocolError> {
        Self::new(message_type, room_id, bincode::serialize(value)?)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    pub fn room_id(&self) -> RoomId {
        self.header.room_id
    }

    pub fn error(&self) -> Option<ErrorCode> {
        self.header.error
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn as_text(&self) -> Result<&str, ProtocolError> {
        Ok(std::str::from_utf8(&self.payload)?)
    }

    pub fn peers(&self) -> Result<Vec<SocketAddr>, ProtocolError> {
        self.payload_as()
    }

    pub fn rooms(&self) -> Result<Vec<RoomSummary>, ProtocolError> {
        self.payload_as()
    }

    pub fn names(&self) -> Result<Vec<MemberName>, ProtocolError> {
        self.payload_as()
    }

    fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        Ok(bincode::deserialize(&self.payload)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let wire = WireHeader {
            message_type: self.header.message_type.to_wire(),
            error_code: self.header.error.map_or(0, ErrorCode::to_wire),
            room_id: self.header.room_id,
            payload_length: self.header.payload_length,
        };

        let mut bytes = header_options().serialize(&wire)?;
        debug_assert_eq!(bytes.len(), HEADER_LEN);
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated { len: bytes.len() });
        }

        let wire: WireHeader = header_options().deserialize(&bytes[..HEADER_LEN])?;
        let message_type = MessageType::try_from(wire.message_type)?;
        let error = ErrorCode::from_wire(message_type, wire.error_code)?;

        let declared = wire.payload_length as usize;
        if declared > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                len: declared,
                max: MAX_PAYLOAD,
            });
        }

        let body = &bytes[HEADER_LEN..];
        if body.len() != declared {
            return Err(ProtocolError::LengthMismatch {
                declared,
                actual: body.len(),
            });
        }

        Ok(Self {
            header: Header {
                message_type,
                error,
                room_id: wire.room_id,
                payload_length: wire.payload_length,
            },
            payload: body.to_vec(),
        })
    }
}

/// Checks a display name against the length limit and returns it trimmed.
pub fn validate_name(name: &str) -> Result<&str, ProtocolError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.len() > MAX_NAME_LEN
        || trimmed.chars().any(char::is_control)
    {
        return Err(ProtocolError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}
