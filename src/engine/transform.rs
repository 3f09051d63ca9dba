//! Maps the four move directions onto the left-compress primitive of [`super::line`].
//!
//! A direction is treated as a set of lines, each read from its head (the edge tiles slide
//! toward) to its tail. Left reads rows as they are, right reads rows reversed, up reads
//! columns (the transposed board) and down reads columns reversed.

use super::delta::DeltaEvent;
use super::line::{compress, LineEvent};
use super::state::{Grid, Pos, Score, Tile, TileId, Value};
use crate::error::Error;

/// Direction represents the direction tiles slide in.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Direction {
    #[default]
    Left,
    Right,
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Self::Left),
            "right" | "r" => Ok(Self::Right),
            "up" | "u" => Ok(Self::Up),
            "down" | "d" => Ok(Self::Down),
            _ => Err(Error::InvalidDirection(s.to_string())),
        }
    }
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
    ];

    /// Board coordinate of the `idx`th cell, counted from the head, of line `line` on a board
    /// with `size` rows and columns.
    pub fn cell(&self, size: usize, line: usize, idx: usize) -> Pos {
        match self {
            Self::Left => Pos(line, idx),
            Self::Right => Pos(line, size - 1 - idx),
            Self::Up => Pos(idx, line),
            Self::Down => Pos(size - 1 - idx, line),
        }
    }

    fn indices(&self, size: usize) -> Indices {
        Indices::new(*self, size)
    }
}

// Indices walks every board coordinate line by line, each line from head to tail.
struct Indices {
    direction: Direction,
    size: usize,
    next: usize,
}

impl Indices {
    fn new(direction: Direction, size: usize) -> Self {
        Indices {
            direction,
            size,
            next: 0,
        }
    }
}

impl Iterator for Indices {
    type Item = Pos;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == self.size * self.size {
            return None;
        }
        let (line, idx) = (self.next / self.size, self.next % self.size);
        self.next += 1;
        Some(self.direction.cell(self.size, line, idx))
    }
}

/// The result of sliding a whole board in one direction, before any spawn.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Shifted {
    pub board: Grid<Value>,
    pub id_board: Grid<TileId>,
    pub score: Score,
    pub changed: bool,
    pub events: Vec<DeltaEvent>,
}

/// Slides every line of `board` toward the edge named by `direction`.
///
/// `changed` is false exactly when no cell value differs from `board`, and in that case no events
/// are reported.
pub fn shift(board: &Grid<Value>, id_board: &Grid<TileId>, direction: Direction) -> Shifted {
    let size = board.size();
    let mut out = Shifted {
        board: Grid::new(size),
        id_board: Grid::new(size),
        score: 0,
        changed: false,
        events: Vec::new(),
    };
    if size == 0 {
        return out;
    }

    let idxs = direction.indices(size).collect::<Vec<Pos>>();
    for line in idxs.chunks(size) {
        let tiles = line
            .iter()
            .map(|pos| Tile::new(board.get(*pos), id_board.get(*pos)))
            .collect::<Vec<_>>();
        let compressed = compress(&tiles);
        for (pos, tile) in line.iter().zip(&compressed.tiles) {
            out.board.set(*pos, tile.value);
            out.id_board.set(*pos, tile.id);
        }
        out.score += compressed.score;
        out.events
            .extend(compressed.events.into_iter().map(|e| place(e, line)));
    }

    out.changed = out.board != *board;
    if !out.changed {
        out.events.clear();
    }
    out
}

// place converts a line-relative event to board coordinates.
fn place(event: LineEvent, line: &[Pos]) -> DeltaEvent {
    match event {
        LineEvent::Move { id, from, to } => DeltaEvent::Move {
            id,
            from: line[from],
            to: line[to],
        },
        LineEvent::Merge {
            from_ids,
            new_id,
            at,
            value,
        } => DeltaEvent::Merge {
            from_ids,
            new_id,
            at: line[at],
            value,
        },
    }
}
