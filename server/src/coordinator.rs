//! Room coordinator: turns a directory mutation into the packets that tell
//! every affected peer about it
//!
//! Member lists are always sent whole. Receivers replace their local copy
//! with whatever arrives, so a lost update is repaired by the next one.

use crate::directory::{Directory, Mutation};
use log::{debug, error};
use shared::{MessageType, Packet, ProtocolError, RoomId};
use std::net::SocketAddr;

/// One outbound datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: SocketAddr,
    pub packet: Packet,
}

/// Computes the response and membership snapshots for `mutation`.
///
/// Must be called with the same directory state the mutation left behind,
/// i.e. under the same lock guard, so the snapshots match the change.
pub fn deliveries_for(directory: &Directory, mutation: &Mutation) -> Vec<Delivery> {
    let result = match *mutation {
        Mutation::Created { endpoint, room_id } => created(directory, endpoint, room_id),
        Mutation::Joined {
            endpoint,
            room_id,
            left_room,
        } => joined(directory, endpoint, room_id, left_room),
        Mutation::Left { endpoint, room_id } => left(directory, endpoint, room_id),
    };

    match result {
        Ok(deliveries) => {
            debug!("{:?} fans out to {} peers", mutation, deliveries.len());
            deliveries
        }
        Err(e) => {
            error!("Failed to build notifications for {:?}: {}", mutation, e);
            Vec::new()
        }
    }
}

fn created(
    directory: &Directory,
    endpoint: SocketAddr,
    room_id: RoomId,
) -> Result<Vec<Delivery>, ProtocolError> {
    let members = directory.members(room_id);
    Ok(vec![Delivery {
        to: endpoint,
        packet: Packet::with_peers(MessageType::CreateGame, room_id, &members)?,
    }])
}

fn joined(
    directory: &Directory,
    endpoint: SocketAddr,
    room_id: RoomId,
    left_room: Option<RoomId>,
) -> Result<Vec<Delivery>, ProtocolError> {
    let members = directory.members(room_id);
    let welcome = Packet::with_peers(MessageType::JoinGame, room_id, &members)?;
    let update = Packet::with_peers(MessageType::MembershipUpdate, room_id, &members)?;

    let mut deliveries: Vec<Delivery> = members
        .iter()
        .map(|&member| Delivery {
            to: member,
            packet: if member == endpoint {
                welcome.clone()
            } else {
                update.clone()
            },
        })
        .collect();

    if let Some(origin) = left_room {
        deliveries.extend(room_update(directory, origin)?);
    }

    Ok(deliveries)
}

fn left(
    directory: &Directory,
    endpoint: SocketAddr,
    room_id: RoomId,
) -> Result<Vec<Delivery>, ProtocolError> {
    let mut deliveries = vec![Delivery {
        to: endpoint,
        packet: Packet::empty(MessageType::LeaveGame, room_id),
    }];
    deliveries.extend(room_update(directory, room_id)?);
    Ok(deliveries)
}

/// Snapshot of `room_id` sent to each remaining member; empty for a vacated room.
fn room_update(directory: &Directory, room_id: RoomId) -> Result<Vec<Delivery>, ProtocolError> {
    let members = directory.members(room_id);
    if members.is_empty() {
        return Ok(Vec::new());
    }

    let update = Packet::with_peers(MessageType::MembershipUpdate, room_id, &members)?;
    Ok(members
        .into_iter()
        .map(|member| Delivery {
            to: member,
            packet: update.clone(),
        })
        .collect())
}
