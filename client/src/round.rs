//! Leaderless ball-calling protocol
//!
//! Once a room is formed there is no server-side turn order. Every member
//! runs this state machine on its own and decides locally whether it draws
//! the next value, whether it has won and when a round is over:
//!
//! - A member with `am_generating` set draws a value after each round
//!   message it receives and broadcasts it to the whole room, itself included.
//! - A member that registers a match without winning starts generating too,
//!   so drawing drifts towards whoever matched most recently.
//! - An election message makes every recipient reset its board, announce the
//!   reset and take over generation. Nothing arbitrates between recipients,
//!   so several members can end up generating at once.
//! - The first member to see a winning line on its own card stops and
//!   announces the reset. No other member confirms the win.
//!
//! The coordinator performs no I/O. Each handler returns the broadcasts and
//! operator notices it produced and the caller delivers them.

use crate::board::{Board, WinLine};
use shared::{MessageType, RESET_SENTINEL};
use std::fmt;

/// Fewest matches any winning line can need; the free centre covers the fifth cell.
pub const MIN_MATCHES_FOR_WIN: u32 = 4;

/// Text to send to every member of the room, with the type picked at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub message_type: MessageType,
    pub text: String,
}

/// Something the operator should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Drew(u8),
    Called(String),
    Matched(u8),
    Card(String),
    Won(WinLine),
    RoundReset,
    TookOver,
    PoolExhausted,
    Stopped,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Drew(ball) => write!(f, "Ball #: {}", ball),
            Notice::Called(text) => write!(f, "Called: {}", text),
            Notice::Matched(ball) => write!(f, "Match: {}", ball),
            Notice::Card(card) => write!(f, "{}", card.trim_end()),
            Notice::Won(line) => write!(f, "You have won with {}!", line),
            Notice::RoundReset => write!(f, "{}", RESET_SENTINEL),
            Notice::TookOver => write!(f, "Nobody is drawing, taking over with a new card"),
            Notice::PoolExhausted => write!(f, "Every ball has been drawn"),
            Notice::Stopped => write!(f, "Stopped drawing, asking the room to take over"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundAction {
    Broadcast(Broadcast),
    Notify(Notice),
}

/// Local view of the round: the card plus the three flags that drive the protocol.
pub struct RoundCoordinator<B: Board> {
    board: B,
    am_generating: bool,
    has_winner: bool,
    match_count: u32,
}

impl<B: Board> RoundCoordinator<B> {
    pub fn new(board: B) -> Self {
        Self {
            board,
            am_generating: false,
            has_winner: false,
            match_count: 0,
        }
    }

    pub fn am_generating(&self) -> bool {
        self.am_generating
    }

    pub fn has_winner(&self) -> bool {
        self.has_winner
    }

    pub fn match_count(&self) -> u32 {
        self.match_count
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    /// Operator start/stop.
    ///
    /// Starting clears any previous win and draws the first value. Stopping
    /// deals a new card and announces the reset; with nobody generating and
    /// no winner that announcement goes out as an election message, handing
    /// the round to the rest of the room.
    pub fn toggle(&mut self) -> Vec<RoundAction> {
        let mut actions = Vec::new();

        if self.am_generating {
            self.am_generating = false;
            self.reset_card();
            actions.push(RoundAction::Notify(Notice::Stopped));
            actions.push(self.broadcast(RESET_SENTINEL));
        } else {
            self.am_generating = true;
            self.has_winner = false;
            self.draw_next(&mut actions);
        }

        actions
    }

    /// Drops all round state when this peer changes rooms: stops drawing,
    /// forgets any win and deals a new card. Nothing is broadcast.
    pub fn leave_round(&mut self) {
        self.am_generating = false;
        self.has_winner = false;
        self.reset_card();
    }

    /// Someone reported that nobody is generating.
    ///
    /// Unconditionally stops, deals a new card, announces the reset as a round
    /// message and then takes over generation. Every recipient does the same.
    pub fn on_election(&mut self) -> Vec<RoundAction> {
        self.am_generating = false;
        self.has_winner = false;
        self.reset_card();

        let mut actions = vec![
            RoundAction::Broadcast(Broadcast {
                message_type: MessageType::RoundMessage,
                text: RESET_SENTINEL.to_string(),
            }),
            RoundAction::Notify(Notice::TookOver),
        ];

        self.am_generating = true;
        self.draw_next(&mut actions);
        actions
    }

    /// A drawn value or the reset sentinel arrived from a room member.
    pub fn on_round_message(&mut self, text: &str) -> Vec<RoundAction> {
        if text == RESET_SENTINEL {
            return vec![RoundAction::Notify(Notice::RoundReset)];
        }

        let mut actions = vec![RoundAction::Notify(Notice::Called(text.to_string()))];

        // Anything that is not a ball number simply misses.
        let hit = match text.trim().parse::<u8>() {
            Ok(ball) if self.board.mark(ball) => Some(ball),
            _ => None,
        };

        if let Some(ball) = hit {
            self.match_count += 1;
            actions.push(RoundAction::Notify(Notice::Matched(ball)));

            if self.match_count >= MIN_MATCHES_FOR_WIN {
                if let Some(line) = self.board.winning_line() {
                    self.has_winner = true;
                    self.am_generating = false;
                    actions.push(RoundAction::Notify(Notice::Card(self.board.render())));
                    actions.push(RoundAction::Notify(Notice::Won(line)));
                    self.reset_card();
                    actions.push(self.broadcast(RESET_SENTINEL));
                    return actions;
                }
            }

            actions.push(RoundAction::Notify(Notice::Card(self.board.render())));
            self.am_generating = true;
        }

        self.draw_next(&mut actions);
        actions
    }

    /// Draws and broadcasts one value if this member is generating.
    fn draw_next(&mut self, actions: &mut Vec<RoundAction>) {
        if !self.am_generating {
            return;
        }

        match self.board.draw() {
            Some(ball) => {
                actions.push(RoundAction::Notify(Notice::Drew(ball)));
                actions.push(self.broadcast(&ball.to_string()));
            }
            None => {
                self.am_generating = false;
                actions.push(RoundAction::Notify(Notice::PoolExhausted));
            }
        }
    }

    /// Round message while someone is generating or has won, election otherwise.
    fn broadcast(&self, text: &str) -> RoundAction {
        let message_type = if self.am_generating || self.has_winner {
            MessageType::RoundMessage
        } else {
            MessageType::ElectionMessage
        };

        RoundAction::Broadcast(Broadcast {
            message_type,
            text: text.to_string(),
        })
    }

    fn reset_card(&mut self) {
        self.board.reset();
        self.match_count = 0;
    }
}
