//! # Room Server Library
//!
//! This library provides the room directory server for the bingo game. The
//! server groups players into small rooms and then steps aside: once a room
//! exists, its members talk to each other directly and the server only keeps
//! the membership lists current.
//!
//! ## Core Responsibilities
//!
//! ### Room Directory
//! The server owns the only authoritative record of which peer endpoint sits
//! in which room. Peers can:
//! - Create a room and become its first member
//! - Join an existing room, or move to it from another room
//! - Leave their room
//! - List every room in use
//!
//! ### Membership Broadcasting
//! After every change the affected rooms receive their full member list.
//! Lists are complete snapshots, never deltas, so a lost update is repaired
//! by the next one.
//!
//! ### Liveness
//! Every probe period the server pings each registered peer on a dedicated
//! socket. Peers that do not answer within the period are removed exactly as
//! if they had left, and their former room is told.
//!
//! ## Architecture Design
//!
//! ### Single Exclusion Region
//! The directory sits behind one lock. Request handling and the liveness
//! monitor both take it for every mutation, and the member lists sent out
//! afterwards are computed under the same guard.
//!
//! ### UDP-Based Communication
//! All traffic is connectionless. There is no acknowledgement or retry: a
//! dropped request is a silent no-op until the operator repeats it.
//!
//! ### Two Sockets
//! Control traffic uses port N and liveness traffic port N+1, so probes never
//! queue behind directory requests.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Bind addresses, room and member limits, and the probe period.
//!
//! ### Directory Module (`directory`)
//! The peer registry and its create/join/leave/list operations, plus the
//! alive flags the liveness monitor works with.
//!
//! ### Coordinator Module (`coordinator`)
//! Works out which packets each directory mutation produces and who gets them.
//!
//! ### Network Module (`network`)
//! Socket tasks, request dispatch, the liveness monitor and the outbound queue.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let mut server = Server::new(config).await?;
//!
//!     // Serves requests and probes peers until shut down
//!     server.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod directory;
pub mod network;
