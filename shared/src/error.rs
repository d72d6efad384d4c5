use crate::packet::MessageType;
use thiserror::Error;

/// A datagram that cannot be decoded or routed. Receivers log and drop it.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("datagram of {len} bytes is shorter than the 10-byte header")]
    Truncated { len: usize },

    #[error("unknown message type {0:#04x}")]
    UnknownMessageType(u8),

    #[error("error code {code:#04x} is not defined for {message_type:?}")]
    UnknownErrorCode { message_type: MessageType, code: u8 },

    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("header declares {declared} payload bytes but {actual} arrived")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("invalid display name {0:?}")]
    InvalidName(String),

    #[error("payload is not valid UTF-8")]
    NotText(#[from] std::str::Utf8Error),

    #[error("malformed payload: {0}")]
    Payload(#[from] bincode::Error),
}

/// Business-rule rejections carried in a response's error byte.
///
/// Codes are scoped to the request they answer, so the same byte can mean
/// different things under different message types. [`ErrorCode::answers`]
/// names the type each variant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorCode {
    #[error("You are already in a game")]
    AlreadyInGame,

    #[error("The maximum number of games has been reached")]
    CapacityExceeded,

    #[error("Game is full")]
    Full,

    #[error("Game does not exist")]
    NotFound,

    #[error("You are already in that game")]
    AlreadyInRoom,

    #[error("You are not in a game")]
    NotInGame,

    #[error("None of those peers are known to the server")]
    UnknownPeer,
}

impl ErrorCode {
    /// The request type this code is a response to.
    pub fn answers(self) -> MessageType {
        match self {
            ErrorCode::AlreadyInGame | ErrorCode::CapacityExceeded => MessageType::CreateGame,
            ErrorCode::Full | ErrorCode::NotFound | ErrorCode::AlreadyInRoom => {
                MessageType::JoinGame
            }
            ErrorCode::NotInGame => MessageType::LeaveGame,
            ErrorCode::UnknownPeer => MessageType::NameQuery,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            ErrorCode::AlreadyInGame => b'e',
            ErrorCode::CapacityExceeded => b'o',
            ErrorCode::Full => b'f',
            ErrorCode::NotFound => b'e',
            ErrorCode::AlreadyInRoom => b'j',
            ErrorCode::NotInGame => b'e',
            ErrorCode::UnknownPeer => b'e',
        }
    }

    /// Interprets an error byte in the scope of `message_type`. Zero means no error.
    pub fn from_wire(message_type: MessageType, code: u8) -> Result<Option<Self>, ProtocolError> {
        if code == 0 {
            return Ok(None);
        }

        let decoded = match (message_type, code) {
            (MessageType::CreateGame, b'e') => ErrorCode::AlreadyInGame,
            (MessageType::CreateGame, b'o') => ErrorCode::CapacityExceeded,
            (MessageType::JoinGame, b'e') => ErrorCode::NotFound,
            (MessageType::JoinGame, b'f') => ErrorCode::Full,
            (MessageType::JoinGame, b'j') => ErrorCode::AlreadyInRoom,
            (MessageType::LeaveGame, b'e') => ErrorCode::NotInGame,
            (MessageType::NameQuery, b'e') => ErrorCode::UnknownPeer,
            _ => return Err(ProtocolError::UnknownErrorCode { message_type, code }),
        };

        Ok(Some(decoded))
    }
}
