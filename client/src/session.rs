//! Local mirror of this peer's room membership
//!
//! The session only changes in response to server packets. Commands build the
//! request and leave the state alone; the matching response (or a later
//! membership snapshot) is what moves the peer in or out of a room.

use log::{info, warn};
use shared::{ErrorCode, MemberName, MessageType, Packet, ProtocolError, RoomId, RoomSummary};
use std::fmt;
use std::net::SocketAddr;

/// Result of applying a server packet, shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Created(RoomId),
    Joined(RoomId),
    JoinFailed(RoomId),
    Left,
    Rejected(ErrorCode),
    PlayerJoined,
    PlayerLeft,
    Rooms(Vec<RoomSummary>),
    Names(Vec<MemberName>),
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Created(room_id) => write!(f, "Created game {}", room_id),
            SessionEvent::Joined(room_id) => write!(f, "Joined game {}", room_id),
            SessionEvent::JoinFailed(room_id) => write!(f, "Could not join game {}", room_id),
            SessionEvent::Left => write!(f, "You have left the game"),
            SessionEvent::Rejected(code) => write!(f, "{}", code),
            SessionEvent::PlayerJoined => write!(f, "A new player has joined"),
            SessionEvent::PlayerLeft => write!(f, "A player has left"),
            SessionEvent::Rooms(rooms) if rooms.is_empty() => write!(f, "No active games"),
            SessionEvent::Rooms(rooms) => {
                let lines: Vec<String> = rooms.iter().map(ToString::to_string).collect();
                write!(f, "{}", lines.join("\n"))
            }
            SessionEvent::Names(names) => {
                let lines: Vec<String> = names
                    .iter()
                    .map(|member| format!("{} ({})", member.name, member.endpoint))
                    .collect();
                write!(f, "Players:\n{}", lines.join("\n"))
            }
        }
    }
}

pub struct PeerSession {
    name: String,
    room_id: Option<RoomId>,
    peers: Vec<SocketAddr>,
    /// This peer as the server sees it, learned from create/join responses
    self_endpoint: Option<SocketAddr>,
}

impl PeerSession {
    /// `name` must already have passed [`shared::validate_name`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            room_id: None,
            peers: Vec::new(),
            self_endpoint: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    /// Current room members, this peer included.
    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    pub fn self_endpoint(&self) -> Option<SocketAddr> {
        self.self_endpoint
    }

    /// Current room members other than this peer.
    pub fn other_peers(&self) -> Vec<SocketAddr> {
        self.peers
            .iter()
            .copied()
            .filter(|&peer| Some(peer) != self.self_endpoint)
            .collect()
    }

    /// Whether round traffic tagged with `room_id` belongs to our room.
    pub fn accepts_round(&self, room_id: RoomId) -> bool {
        self.room_id == Some(room_id)
    }

    pub fn create_request(&self) -> Result<Packet, ProtocolError> {
        Packet::text(MessageType::CreateGame, 0, &self.name)
    }

    pub fn join_request(&self, room_id: RoomId) -> Result<Packet, ProtocolError> {
        Packet::text(MessageType::JoinGame, room_id, &self.name)
    }

    pub fn leave_request(&self) -> Packet {
        Packet::empty(MessageType::LeaveGame, self.room_id.unwrap_or(0))
    }

    pub fn list_request(&self) -> Packet {
        Packet::empty(MessageType::RoomList, 0)
    }

    /// Asks the server for the names behind the current member list.
    /// `None` outside a room.
    pub fn names_request(&self) -> Result<Option<Packet>, ProtocolError> {
        match self.room_id {
            Some(room_id) if !self.peers.is_empty() => {
                Packet::with_peers(MessageType::NameQuery, room_id, &self.peers).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// One-line summary of where this peer stands.
    pub fn describe(&self) -> String {
        let who = match self.self_endpoint {
            Some(endpoint) => format!("{} ({})", self.name, endpoint),
            None => self.name.clone(),
        };
        match self.room_id {
            Some(room_id) => format!(
                "{} in game {} with {} player(s)",
                who,
                room_id,
                self.peers.len()
            ),
            None => format!("{} is not in a game", who),
        }
    }

    /// Applies a directory response or membership snapshot.
    ///
    /// Returns `Ok(None)` for packets that carry nothing for the operator,
    /// such as an empty snapshot.
    pub fn apply(&mut self, packet: &Packet) -> Result<Option<SessionEvent>, ProtocolError> {
        if let Some(code) = packet.error() {
            warn!("{:?} rejected: {}", packet.message_type(), code);
            return Ok(Some(SessionEvent::Rejected(code)));
        }

        let event = match packet.message_type() {
            MessageType::CreateGame => {
                let peers = packet.peers()?;
                // The creator is the only member of a new room.
                self.self_endpoint = peers.first().copied().or(self.self_endpoint);
                self.enter(packet.room_id(), peers);
                info!("Created game {}", packet.room_id());
                Some(SessionEvent::Created(packet.room_id()))
            }

            MessageType::JoinGame => {
                let peers = packet.peers()?;
                if peers.is_empty() {
                    warn!("Join of game {} returned no members", packet.room_id());
                    Some(SessionEvent::JoinFailed(packet.room_id()))
                } else {
                    // Members are listed in join order, so the joiner comes last.
                    self.self_endpoint = peers.last().copied();
                    self.enter(packet.room_id(), peers);
                    info!("Joined game {}", packet.room_id());
                    Some(SessionEvent::Joined(packet.room_id()))
                }
            }

            MessageType::LeaveGame => {
                self.room_id = None;
                self.peers.clear();
                info!("Left game");
                Some(SessionEvent::Left)
            }

            MessageType::MembershipUpdate => {
                if self.room_id != Some(packet.room_id()) {
                    warn!(
                        "Ignoring member list for game {}, not our game",
                        packet.room_id()
                    );
                    return Ok(None);
                }

                let peers = packet.peers()?;
                if peers.is_empty() {
                    warn!("Ignoring empty member list for game {}", packet.room_id());
                    return Ok(None);
                }

                // Counts only: a swap of one member for another goes unnoticed.
                let event = match peers.len().cmp(&self.peers.len()) {
                    std::cmp::Ordering::Greater => Some(SessionEvent::PlayerJoined),
                    std::cmp::Ordering::Less => Some(SessionEvent::PlayerLeft),
                    std::cmp::Ordering::Equal => None,
                };
                self.peers = peers;
                event
            }

            MessageType::RoomList => Some(SessionEvent::Rooms(packet.rooms()?)),

            MessageType::NameQuery => Some(SessionEvent::Names(packet.names()?)),

            other => {
                warn!("Unexpected {:?} from server", other);
                None
            }
        };

        Ok(event)
    }

    fn enter(&mut self, room_id: RoomId, peers: Vec<SocketAddr>) {
        self.room_id = Some(room_id);
        self.peers = peers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn peers(kind: MessageType, room_id: RoomId, ports: &[u16]) -> Packet {
        let list: Vec<SocketAddr> = ports.iter().map(|&p| peer(p)).collect();
        Packet::with_peers(kind, room_id, &list).unwrap()
    }

    #[test]
    fn test_requests_do_not_touch_state() {
        let session = PeerSession::new("alice");

        let create = session.create_request().unwrap();
        assert_eq!(create.message_type(), MessageType::CreateGame);
        assert_eq!(create.as_text().unwrap(), "alice");

        let join = session.join_request(4).unwrap();
        assert_eq!(join.room_id(), 4);

        assert_eq!(session.room_id(), None);
        assert!(session.peers().is_empty());
        assert!(session.names_request().unwrap().is_none());
    }

    #[test]
    fn test_create_response_enters_room() {
        let mut session = PeerSession::new("alice");

        let event = session
            .apply(&peers(MessageType::CreateGame, 1, &[5001]))
            .unwrap();

        assert_eq!(event, Some(SessionEvent::Created(1)));
        assert_eq!(session.room_id(), Some(1));
        assert_eq!(session.peers(), &[peer(5001)]);
        assert!(session.accepts_round(1));
        assert!(!session.accepts_round(2));
    }

    #[test]
    fn test_rejection_leaves_state_alone() {
        let mut session = PeerSession::new("bob");
        session
            .apply(&peers(MessageType::CreateGame, 1, &[5002]))
            .unwrap();

        let event = session
            .apply(&Packet::rejection(ErrorCode::Full, 3))
            .unwrap();

        assert_eq!(event, Some(SessionEvent::Rejected(ErrorCode::Full)));
        assert_eq!(event.unwrap().to_string(), "Game is full");
        assert_eq!(session.room_id(), Some(1));
    }

    #[test]
    fn test_empty_join_is_a_failed_join() {
        let mut session = PeerSession::new("bob");

        let event = session.apply(&peers(MessageType::JoinGame, 2, &[])).unwrap();

        assert_eq!(event, Some(SessionEvent::JoinFailed(2)));
        assert_eq!(session.room_id(), None);
    }

    #[test]
    fn test_snapshots_replace_and_compare_counts() {
        let mut session = PeerSession::new("alice");
        session
            .apply(&peers(MessageType::CreateGame, 1, &[5001]))
            .unwrap();

        let grew = session
            .apply(&peers(MessageType::MembershipUpdate, 1, &[5001, 5002]))
            .unwrap();
        assert_eq!(grew, Some(SessionEvent::PlayerJoined));

        let swapped = session
            .apply(&peers(MessageType::MembershipUpdate, 1, &[5001, 5003]))
            .unwrap();
        assert_eq!(swapped, None);
        assert_eq!(session.peers(), &[peer(5001), peer(5003)]);

        let shrank = session
            .apply(&peers(MessageType::MembershipUpdate, 1, &[5001]))
            .unwrap();
        assert_eq!(shrank, Some(SessionEvent::PlayerLeft));

        let empty = session
            .apply(&peers(MessageType::MembershipUpdate, 1, &[]))
            .unwrap();
        assert_eq!(empty, None);
        assert_eq!(session.peers(), &[peer(5001)]);
    }

    #[test]
    fn test_leave_ack_clears_room() {
        let mut session = PeerSession::new("alice");
        session
            .apply(&peers(MessageType::JoinGame, 5, &[5001, 5002]))
            .unwrap();
        assert_eq!(session.leave_request().room_id(), 5);

        let event = session
            .apply(&Packet::empty(MessageType::LeaveGame, 0))
            .unwrap();

        assert_eq!(event, Some(SessionEvent::Left));
        assert_eq!(session.room_id(), None);
        assert!(session.peers().is_empty());
    }

    #[test]
    fn test_names_request_lists_members() {
        let mut session = PeerSession::new("alice");
        session
            .apply(&peers(MessageType::JoinGame, 5, &[5001, 5002]))
            .unwrap();

        let query = session.names_request().unwrap().unwrap();

        assert_eq!(query.message_type(), MessageType::NameQuery);
        assert_eq!(query.peers().unwrap(), vec![peer(5001), peer(5002)]);
    }

    #[test]
    fn test_room_list_event_renders_summaries() {
        let mut session = PeerSession::new("alice");
        let rooms = vec![RoomSummary {
            room_id: 1,
            members: 2,
            capacity: 20,
        }];

        let event = session
            .apply(&Packet::with_rooms(&rooms).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(event.to_string(), "Game: 1 - 2/20");
        assert_eq!(
            SessionEvent::Rooms(Vec::new()).to_string(),
            "No active games"
        );
    }

    #[test]
    fn test_self_endpoint_learned_from_responses() {
        let mut session = PeerSession::new("alice");
        assert_eq!(session.self_endpoint(), None);

        session
            .apply(&peers(MessageType::CreateGame, 1, &[5001]))
            .unwrap();
        assert_eq!(session.self_endpoint(), Some(peer(5001)));
        assert!(session.describe().contains("127.0.0.1:5001"));

        let mut joiner = PeerSession::new("bob");
        joiner
            .apply(&peers(MessageType::JoinGame, 1, &[5001, 5002]))
            .unwrap();
        assert_eq!(joiner.self_endpoint(), Some(peer(5002)));
        assert_eq!(joiner.other_peers(), vec![peer(5001)]);
    }

    #[test]
    fn test_snapshot_for_another_room_is_ignored() {
        let mut session = PeerSession::new("alice");

        let stray = session
            .apply(&peers(MessageType::MembershipUpdate, 3, &[5001, 5002]))
            .unwrap();
        assert_eq!(stray, None);
        assert!(session.peers().is_empty());

        session
            .apply(&peers(MessageType::JoinGame, 1, &[5003, 5001]))
            .unwrap();
        let late = session
            .apply(&peers(MessageType::MembershipUpdate, 3, &[5002]))
            .unwrap();

        assert_eq!(late, None);
        assert_eq!(session.room_id(), Some(1));
        assert_eq!(session.peers(), &[peer(5003), peer(5001)]);
    }
}
