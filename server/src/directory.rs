//! Room directory: the registry of which peer endpoint sits in which room
//!
//! This module owns every piece of server-side membership state:
//! - One record per peer endpoint, keyed by that endpoint
//! - Room creation, joining, moving between rooms and leaving
//! - Liveness flags used by the probe cycle to evict silent peers
//!
//! Rooms are not stored on their own. A room exists exactly as long as at
//! least one record points at its id, and every query derives it on demand.
//! Callers wrap the directory in a single lock, which makes every operation
//! here atomic with respect to every other.

use log::info;
use shared::{ErrorCode, RoomId, RoomSummary};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;

/// Server-side record of one peer
///
/// Each record holds:
/// - The endpoint the peer talks from, which is also its identity
/// - The display name it registered with
/// - The room it currently belongs to
/// - Whether it has answered the current liveness probe
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub endpoint: SocketAddr,
    pub name: String,
    pub room_id: RoomId,
    pub alive: bool,
    /// Orders members by when they entered their current room
    entered: u64,
}

/// A change applied to the directory, used to work out who must be told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Created {
        endpoint: SocketAddr,
        room_id: RoomId,
    },
    Joined {
        endpoint: SocketAddr,
        room_id: RoomId,
        /// Set when the peer moved here from another room
        left_room: Option<RoomId>,
    },
    Left {
        endpoint: SocketAddr,
        room_id: RoomId,
    },
}

/// Registry of all peers and, through them, all rooms
///
/// Enforces the configured room and member limits at insertion time and
/// guarantees that an endpoint maps to at most one room.
pub struct Directory {
    /// Records indexed by peer endpoint
    peers: HashMap<SocketAddr, PeerRecord>,
    /// Maximum number of rooms active at once
    max_rooms: usize,
    /// Maximum number of members in any one room
    max_members: usize,
    /// Next value for `PeerRecord::entered`
    next_entry: u64,
}

impl Directory {
    /// Creates an empty directory with the given limits
    pub fn new(max_rooms: usize, max_members: usize) -> Self {
        Self {
            peers: HashMap::new(),
            max_rooms,
            max_members,
            next_entry: 0,
        }
    }

    pub fn max_members(&self) -> usize {
        self.max_members
    }

    /// Opens a new room with `endpoint` as its only member
    ///
    /// Fails with `AlreadyInGame` if the endpoint already has a record and
    /// with `CapacityExceeded` once the room limit is reached. Otherwise the
    /// room gets the smallest id in `[1, 2 * max_rooms)` not currently used.
    pub fn create(&mut self, endpoint: SocketAddr, name: &str) -> Result<Mutation, ErrorCode> {
        if self.peers.contains_key(&endpoint) {
            return Err(ErrorCode::AlreadyInGame);
        }

        let active = self.active_rooms();
        if active.len() >= self.max_rooms {
            return Err(ErrorCode::CapacityExceeded);
        }

        let upper = (self.max_rooms as RoomId).saturating_mul(2);
        let room_id = (1..upper)
            .find(|id| !active.contains(id))
            .ok_or(ErrorCode::CapacityExceeded)?;

        self.insert(endpoint, name, room_id);
        info!("{} created game {}", endpoint, room_id);

        Ok(Mutation::Created { endpoint, room_id })
    }

    /// Adds `endpoint` to an existing room, moving it out of its old room if
    /// it had one
    ///
    /// Fails with `NotFound` if nobody is in `room_id`, `Full` if the room is
    /// at its member limit and `AlreadyInRoom` if the endpoint is already
    /// there. A failed join leaves every record untouched.
    pub fn join(
        &mut self,
        endpoint: SocketAddr,
        name: &str,
        room_id: RoomId,
    ) -> Result<Mutation, ErrorCode> {
        let occupants = self.member_count(room_id);
        if occupants == 0 {
            return Err(ErrorCode::NotFound);
        }
        if occupants >= self.max_members {
            return Err(ErrorCode::Full);
        }

        let left_room = self.peers.get(&endpoint).map(|record| record.room_id);
        if left_room == Some(room_id) {
            return Err(ErrorCode::AlreadyInRoom);
        }

        self.insert(endpoint, name, room_id);

        match left_room {
            Some(old) => info!("{} switched from game {} to {}", endpoint, old, room_id),
            None => info!("{} joined game {}", endpoint, room_id),
        }

        Ok(Mutation::Joined {
            endpoint,
            room_id,
            left_room,
        })
    }

    /// Removes the record for `endpoint`
    ///
    /// Returns `NotInGame` without touching anything if there is no record.
    pub fn leave(&mut self, endpoint: SocketAddr) -> Result<Mutation, ErrorCode> {
        let record = self.peers.remove(&endpoint).ok_or(ErrorCode::NotInGame)?;
        info!("{} left game {}", endpoint, record.room_id);

        Ok(Mutation::Left {
            endpoint,
            room_id: record.room_id,
        })
    }

    /// Summaries of every room in use, ordered by room id
    pub fn list(&self) -> Vec<RoomSummary> {
        let mut counts: BTreeMap<RoomId, u32> = BTreeMap::new();
        for record in self.peers.values() {
            *counts.entry(record.room_id).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|(room_id, members)| RoomSummary {
                room_id,
                members,
                capacity: self.max_members as u32,
            })
            .collect()
    }

    /// Endpoints in `room_id`, in the order they entered it
    pub fn members(&self, room_id: RoomId) -> Vec<SocketAddr> {
        let mut members: Vec<&PeerRecord> = self
            .peers
            .values()
            .filter(|record| record.room_id == room_id)
            .collect();
        members.sort_by_key(|record| record.entered);
        members.into_iter().map(|record| record.endpoint).collect()
    }

    pub fn member_count(&self, room_id: RoomId) -> usize {
        self.peers
            .values()
            .filter(|record| record.room_id == room_id)
            .count()
    }

    pub fn get(&self, endpoint: &SocketAddr) -> Option<&PeerRecord> {
        self.peers.get(endpoint)
    }

    pub fn room_of(&self, endpoint: &SocketAddr) -> Option<RoomId> {
        self.peers.get(endpoint).map(|record| record.room_id)
    }

    pub fn name_of(&self, endpoint: &SocketAddr) -> Option<&str> {
        self.peers.get(endpoint).map(|record| record.name.as_str())
    }

    /// Number of distinct rooms currently in use
    pub fn room_count(&self) -> usize {
        self.active_rooms().len()
    }

    /// Returns the number of registered peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns true if no peers are registered
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Starts a liveness cycle
    ///
    /// Clears every alive flag and returns the endpoints that must be probed.
    /// Anyone who has not been marked alive again by the time
    /// [`Directory::evict_unresponsive`] runs will be removed.
    pub fn begin_probe_cycle(&mut self) -> Vec<SocketAddr> {
        self.peers
            .values_mut()
            .map(|record| {
                record.alive = false;
                record.endpoint
            })
            .collect()
    }

    /// Records a probe response. Returns false for unknown endpoints.
    pub fn mark_alive(&mut self, endpoint: &SocketAddr) -> bool {
        match self.peers.get_mut(endpoint) {
            Some(record) => {
                record.alive = true;
                true
            }
            None => false,
        }
    }

    /// Removes every peer whose alive flag is still clear
    ///
    /// Each eviction goes through [`Directory::leave`], so the returned
    /// mutations are exactly what a voluntary leave would have produced.
    pub fn evict_unresponsive(&mut self) -> Vec<Mutation> {
        let silent: Vec<SocketAddr> = self
            .peers
            .values()
            .filter(|record| !record.alive)
            .map(|record| record.endpoint)
            .collect();

        silent
            .into_iter()
            .filter_map(|endpoint| {
                info!("{} did not answer the liveness probe, evicting", endpoint);
                self.leave(endpoint).ok()
            })
            .collect()
    }

    fn active_rooms(&self) -> BTreeSet<RoomId> {
        self.peers.values().map(|record| record.room_id).collect()
    }

    /// Inserts or replaces the record for `endpoint`. New records start alive
    /// so a cycle already in flight does not evict them.
    fn insert(&mut self, endpoint: SocketAddr, name: &str, room_id: RoomId) {
        let entered = self.next_entry;
        self.next_entry += 1;

        self.peers.insert(
            endpoint,
            PeerRecord {
                endpoint,
                name: name.to_string(),
                room_id,
                alive: true,
                entered,
            },
        );
    }
}
