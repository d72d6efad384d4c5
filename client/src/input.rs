//! Operator command parsing

use shared::RoomId;
use thiserror::Error;

/// Help text printed for `-help`.
pub const HELP: &str = "\
Commands (prefix with - or /):
  create-room   (c)       create a new game and join it
  join <id>     (j <id>)  join game <id>, leaving your current one
  leave-room    (l)       leave your current game
  list-rooms    (q)       list active games
  show-info     (i)       show your game and its players
  toggle-round  (s)       start or stop drawing balls
  help          (?)       show this help";

/// One operator request, parsed from a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CreateRoom,
    JoinRoom(RoomId),
    LeaveRoom,
    ListRooms,
    ShowInfo,
    ToggleRound,
    Help,
}

/// Input the operator has to retype. Never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("commands start with - or /, try -help")]
    MissingMarker,

    #[error("unknown command {0:?}, try -help")]
    Unknown(String),

    #[error("join needs a game number, e.g. -join 3")]
    MissingRoomId,

    #[error("{0:?} is not a game number")]
    InvalidRoomId(String),
}

/// Parses a console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let body = line
        .strip_prefix('-')
        .or_else(|| line.strip_prefix('/'))
        .ok_or(InputError::MissingMarker)?;

    let mut words = body.split_whitespace();
    let verb = words.next().unwrap_or_default();

    let command = match verb {
        "create-room" | "c" => Command::CreateRoom,
        "join" | "j" => {
            let id = words.next().ok_or(InputError::MissingRoomId)?;
            let room_id = id
                .parse::<RoomId>()
                .map_err(|_| InputError::InvalidRoomId(id.to_string()))?;
            Command::JoinRoom(room_id)
        }
        "leave-room" | "l" => Command::LeaveRoom,
        "list-rooms" | "q" => Command::ListRooms,
        "show-info" | "i" => Command::ShowInfo,
        "toggle-round" | "s" => Command::ToggleRound,
        "help" | "?" => Command::Help,
        other => return Err(InputError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_and_short_verbs() {
        let cases = [
            ("-create-room", Command::CreateRoom),
            ("/c", Command::CreateRoom),
            ("-join 7", Command::JoinRoom(7)),
            ("/j 12", Command::JoinRoom(12)),
            ("-leave-room", Command::LeaveRoom),
            ("-l", Command::LeaveRoom),
            ("-list-rooms", Command::ListRooms),
            ("/q", Command::ListRooms),
            ("-show-info", Command::ShowInfo),
            ("-i", Command::ShowInfo),
            ("-toggle-round", Command::ToggleRound),
            ("/s", Command::ToggleRound),
            ("-help", Command::Help),
            ("/?", Command::Help),
        ];

        for (line, expected) in cases {
            assert_eq!(parse_command(line), Ok(Some(expected)), "{}", line);
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(parse_command("  -join   3  \n"), Ok(Some(Command::JoinRoom(3))));
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn test_rejects_unmarked_and_unknown_input() {
        assert_eq!(parse_command("create-room"), Err(InputError::MissingMarker));
        assert_eq!(
            parse_command("-dance"),
            Err(InputError::Unknown("dance".to_string()))
        );
        assert_eq!(parse_command("-"), Err(InputError::Unknown(String::new())));
    }

    #[test]
    fn test_join_requires_numeric_id() {
        assert_eq!(parse_command("-join"), Err(InputError::MissingRoomId));
        assert_eq!(
            parse_command("-j three"),
            Err(InputError::InvalidRoomId("three".to_string()))
        );
        assert_eq!(
            parse_command("-j -1"),
            Err(InputError::InvalidRoomId("-1".to_string()))
        );
    }
}
