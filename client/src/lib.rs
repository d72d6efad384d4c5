//! # Bingo Client Library
//!
//! This library provides the peer side of the bingo game. A peer asks the
//! room server to place it in a room, then plays the round directly with the
//! other members of that room. The server never sees a drawn ball.
//!
//! ## Architecture Overview
//!
//! ### Server-Managed Membership
//! Everything about room membership comes from the server. The client sends
//! a request and waits for the answer; its local view only changes when a
//! response or a membership snapshot arrives. Snapshots are full member
//! lists and always replace the previous one.
//!
//! ### Peer-to-Peer Rounds
//! Drawn values travel from one member straight to every member of the room,
//! the sender included. No member is in charge: each one decides from its own
//! card whether to draw next, whether it has won and when to reset.
//!
//! ### Single Event Loop
//! Console lines and datagrams feed one `tokio::select!` loop, which owns the
//! session and the round state. Outgoing traffic goes through a queue to a
//! sender task that paces round fan-out.
//!
//! ## Module Organization
//!
//! ### Board Module (`board`)
//! The card and ball pool behind the [`board::Board`] trait:
//! - Dealing a 5x5 card with a free centre
//! - Drawing balls without repetition
//! - Marking called values and spotting a completed line
//!
//! ### Input Module (`input`)
//! Parses operator commands such as `-create-room` or `/j 3`.
//!
//! ### Network Module (`network`)
//! Socket handling, the event loop, probe replies and the outbound queue.
//!
//! ### Round Module (`round`)
//! The leaderless ball-calling state machine. It performs no I/O and returns
//! the broadcasts and notices each event produced.
//!
//! ### Session Module (`session`)
//! The local mirror of room id and member list, plus the requests sent to
//! the server.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientConfig, DEFAULT_DRAW_DELAY};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig {
//!         server_addr: "127.0.0.1:7400".parse()?,
//!         bind_addr: "0.0.0.0:0".parse()?,
//!         name: "alice".to_string(),
//!         draw_delay: DEFAULT_DRAW_DELAY,
//!     };
//!
//!     // Reads commands from stdin until it closes
//!     let mut client = Client::new(config).await?;
//!     client.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod board;
pub mod input;
pub mod network;
pub mod round;
pub mod session;
