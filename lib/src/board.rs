use crate::config::Config;
use crate::layout::{COLS, ROWS};
use crate::orb::OrbType;
use crate::Error;
use std::fmt;
use std::ops::{Deref, DerefMut};

type Grid = [[OrbType; COLS]; ROWS];

/// Classified orb types, organized as a two-dimensional grid of [ROWS] x [COLS].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board(Grid);

impl Deref for Board {
    type Target = Grid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Board {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let board_string = self
            .iter()
            .map(|row| row.iter().map(|orb| orb.external_code()).collect::<String>())
            .collect::<Vec<String>>()
            .join("\n");
        write!(f, "{}", board_string)
    }
}

impl Board {
    /// A board with every cell [OrbType::Unknown].
    pub fn new() -> Board {
        Board([[OrbType::Unknown; COLS]; ROWS])
    }

    /// Build a board from cells in row-major order. Missing cells are Unknown, extra cells are ignored.
    pub fn from_cells<I: IntoIterator<Item = OrbType>>(cells: I) -> Board {
        let mut board = Board::new();
        for (index, orb) in cells.into_iter().take(ROWS * COLS).enumerate() {
            board[index / COLS][index % COLS] = orb;
        }
        board
    }

    pub fn get(&self, row: usize, col: usize) -> Option<OrbType> {
        self.0.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Set a cell and return its previous type, or `None` if the position is off the board.
    pub fn set(&mut self, row: usize, col: usize, orb: OrbType) -> Option<OrbType> {
        let cell = self.0.get_mut(row).and_then(|r| r.get_mut(col))?;
        Some(std::mem::replace(cell, orb))
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = OrbType> + '_ {
        self.iter().flat_map(|row| row.iter().copied())
    }

    /// Encode with the external codes used by the board visualizers.
    pub fn encode(&self) -> String {
        self.cells().map(OrbType::external_code).collect()
    }

    /// Encode with the internal analysis codes.
    pub fn encode_internal(&self) -> String {
        self.cells().map(OrbType::internal_code).collect()
    }

    /// Inverse of [Board::encode].
    /// # Errors
    /// [Error::InvalidBoardString] if the string does not have exactly one known code per cell.
    pub fn decode(text: &str) -> Result<Board, Error> {
        Board::decode_with(text, OrbType::from_external_code)
    }

    /// Inverse of [Board::encode_internal].
    pub fn decode_internal(text: &str) -> Result<Board, Error> {
        Board::decode_with(text, OrbType::from_internal_code)
    }

    fn decode_with(text: &str, code: fn(char) -> Option<OrbType>) -> Result<Board, Error> {
        let cells = text
            .chars()
            .map(code)
            .collect::<Option<Vec<_>>>()
            .filter(|cells| cells.len() == ROWS * COLS)
            .ok_or_else(|| Error::InvalidBoardString(String::from(text)))?;
        Ok(Board::from_cells(cells))
    }

    /// Positions where `self` and `other` differ, as (row, col, ours, theirs).
    pub fn diff(&self, other: &Board) -> Vec<(usize, usize, OrbType, OrbType)> {
        self.cells()
            .zip(other.cells())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, (a, b))| (i / COLS, i % COLS, a, b))
            .collect()
    }
}

/// Links to the two board visualizers, both showing the same board string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardLinks {
    pub dawnglare: String,
    pub miruglare: String,
}

impl BoardLinks {
    pub fn new(board_text: &str, config: &Config) -> BoardLinks {
        BoardLinks {
            dawnglare: config.dawnglare_url.replace("{}", board_text),
            miruglare: config.miruglare_url.replace("{}", board_text),
        }
    }
}

impl fmt::Display for BoardLinks {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\n{}", self.dawnglare, self.miruglare)
    }
}
