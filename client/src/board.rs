//! Bingo card and ball pool consulted by the round coordinator

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt;

pub const GRID: usize = 5;
pub const HIGHEST_BALL: u8 = 75;
const COLUMN_SPAN: u8 = 15;

/// A completed line on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinLine {
    Row(usize),
    Column(usize),
    /// Top-left to bottom-right
    Diagonal,
    /// Top-right to bottom-left
    AntiDiagonal,
}

impl fmt::Display for WinLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinLine::Row(row) => write!(f, "row {}", row + 1),
            WinLine::Column(col) => write!(f, "column {}", col + 1),
            WinLine::Diagonal => write!(f, "top-left to bottom-right diagonal"),
            WinLine::AntiDiagonal => write!(f, "top-right to bottom-left diagonal"),
        }
    }
}

/// Per-peer game state: draws values, matches called values and spots wins.
pub trait Board {
    /// Draws a value not drawn since the last reset, or `None` once the pool is empty.
    fn draw(&mut self) -> Option<u8>;

    /// Marks `value` on the card. Returns whether the card held it.
    fn mark(&mut self, value: u8) -> bool;

    /// A fully marked line, if any.
    fn winning_line(&self) -> Option<WinLine>;

    /// Deals a fresh card and refills the pool.
    fn reset(&mut self);

    /// Human-readable card for the operator.
    fn render(&self) -> String;
}

/// Standard 75-ball card: column B holds 1-15, I 16-30, N 31-45, G 46-60 and
/// O 61-75, with a free centre.
pub struct BingoBoard {
    /// `None` marks a covered cell (including the free centre).
    cells: [[Option<u8>; GRID]; GRID],
    pool: Vec<u8>,
    rng: StdRng,
}

impl BingoBoard {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic card and draw order, for tests and replays.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut board = Self {
            cells: [[None; GRID]; GRID],
            pool: Vec::new(),
            rng,
        };
        board.reset();
        board
    }

    /// Value at `row`, `col`, or `None` if covered.
    pub fn cell(&self, row: usize, col: usize) -> Option<u8> {
        self.cells[row][col]
    }

    pub fn remaining_draws(&self) -> usize {
        self.pool.len()
    }

    fn deal(&mut self) {
        for col in 0..GRID {
            let low = col as u8 * COLUMN_SPAN + 1;
            let column: Vec<u8> = (low..low + COLUMN_SPAN).collect();
            let picks: Vec<u8> = column
                .choose_multiple(&mut self.rng, GRID)
                .copied()
                .collect();

            for (row, value) in picks.into_iter().enumerate() {
                self.cells[row][col] = Some(value);
            }
        }
        self.cells[GRID / 2][GRID / 2] = None;
    }

    fn line_covered(&self, cells: impl IntoIterator<Item = (usize, usize)>) -> bool {
        cells.into_iter().all(|(row, col)| self.cells[row][col].is_none())
    }
}

impl Default for BingoBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for BingoBoard {
    fn draw(&mut self) -> Option<u8> {
        if self.pool.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.pool.len());
        Some(self.pool.swap_remove(index))
    }

    fn mark(&mut self, value: u8) -> bool {
        for row in self.cells.iter_mut() {
            for cell in row.iter_mut() {
                if *cell == Some(value) {
                    *cell = None;
                    return true;
                }
            }
        }
        false
    }

    fn winning_line(&self) -> Option<WinLine> {
        if let Some(row) = (0..GRID).find(|&row| self.line_covered((0..GRID).map(|c| (row, c)))) {
            return Some(WinLine::Row(row));
        }
        if let Some(col) = (0..GRID).find(|&col| self.line_covered((0..GRID).map(|r| (r, col)))) {
            return Some(WinLine::Column(col));
        }
        if self.line_covered((0..GRID).map(|i| (i, i))) {
            return Some(WinLine::Diagonal);
        }
        if self.line_covered((0..GRID).map(|i| (i, GRID - 1 - i))) {
            return Some(WinLine::AntiDiagonal);
        }
        None
    }

    fn reset(&mut self) {
        self.deal();
        self.pool = (1..=HIGHEST_BALL).collect();
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BingoBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   B    I    N    G    O")?;
        writeln!(f, "{}", "=".repeat(25))?;
        for row in &self.cells {
            for cell in row {
                match cell {
                    Some(value) => write!(f, "{:>4} ", value)?,
                    None => write!(f, "{:>4} ", "*")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
