use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

pub type Value = u32;

pub type TileId = u64;

pub type Score = u64;

/// Upper bound for `next_id`. Ids stay within the integers a JSON number holds exactly.
pub const ID_LIMIT: TileId = 1 << 53;

/// Pos is a (row, column) coordinate on the board.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Pos(pub usize, pub usize);

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({0},{1})", self.0, self.1)
    }
}

impl Pos {
    pub fn row(&self) -> usize {
        self.0
    }

    pub fn col(&self) -> usize {
        self.1
    }
}

/// Tile is a value and the identity of the tile carrying it. An empty cell is `Tile::EMPTY`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Tile {
    pub value: Value,
    pub id: TileId,
}

impl Tile {
    pub const EMPTY: Tile = Tile { value: 0, id: 0 };

    pub fn new(value: Value, id: TileId) -> Self {
        Self { value, id }
    }

    pub fn is_empty(&self) -> bool {
        self.value == 0
    }
}

/// Grid is a square, row-major board of cells.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Grid<T> {
    size: usize,
    cells: Vec<T>,
}

impl<T: Copy + Default> Grid<T> {
    /// An all-default (empty) grid with `size` rows and columns.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![T::default(); size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, pos: Pos) -> T {
        self.cells[self.offset(pos)]
    }

    pub fn set(&mut self, pos: Pos, value: T) {
        let offset = self.offset(pos);
        self.cells[offset] = value;
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.size.max(1))
    }

    /// Every cell paired with its position, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Pos, T)> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (Pos(i / size, i % size), *v))
    }

    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    fn offset(&self, pos: Pos) -> usize {
        assert!(
            pos.0 < self.size && pos.1 < self.size,
            "position {} outside {1}x{1} grid",
            pos,
            self.size
        );
        pos.0 * self.size + pos.1
    }
}

impl<T: PartialEq> Grid<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.cells.contains(value)
    }
}

impl<T: Copy + Default> TryFrom<Vec<Vec<T>>> for Grid<T> {
    type Error = Error;

    fn try_from(rows: Vec<Vec<T>>) -> Result<Self, Self::Error> {
        let size = rows.len();
        if size == 0 {
            return Err(Error::malformed("grid has no rows"));
        }
        let mut cells = Vec::with_capacity(size * size);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(Error::malformed(format!(
                    "row {y} has {0} cells, expected {size}",
                    row.len()
                )));
            }
            cells.extend(row);
        }
        Ok(Self { size, cells })
    }
}

impl<T: Copy + Default, const N: usize> From<[[T; N]; N]> for Grid<T> {
    fn from(rows: [[T; N]; N]) -> Self {
        Self {
            size: N,
            cells: rows.iter().flatten().copied().collect(),
        }
    }
}

impl<T: Copy + Default + Serialize> Serialize for Grid<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.rows())
    }
}

impl<'de, T: Copy + Default + Deserialize<'de>> Deserialize<'de> for Grid<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows: Vec<Vec<T>> = Vec::deserialize(deserializer)?;
        Grid::try_from(rows).map_err(serde::de::Error::custom)
    }
}

/// GameState is one immutable snapshot of a game.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Grid<Value>,
    pub id_board: Grid<TileId>,
    pub score: Score,
    pub game_over: bool,
    pub game_won: bool,
    pub next_id: TileId,
}

impl GameState {
    /// An empty board of the given size with all counters at their starting values.
    pub fn empty(size: usize) -> Self {
        Self {
            board: Grid::new(size),
            id_board: Grid::new(size),
            score: 0,
            game_over: false,
            game_won: false,
            next_id: 1,
        }
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn empty_cells(&self) -> Vec<Pos> {
        self.board
            .iter()
            .filter(|(_, v)| *v == 0)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Sum of all tile values on the board.
    pub fn total(&self) -> u64 {
        self.board.iter().map(|(_, v)| v as u64).sum()
    }

    /// Checks the board invariants: values are zero or powers of two no smaller than 2, the
    /// identity board is the same size and occupied in lockstep, and tile ids are unique and
    /// below `next_id`, which itself lies in `1..ID_LIMIT`.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.id_board.size() != self.board.size() {
            return Err(Error::malformed(format!(
                "id_board is {0}x{0} but board is {1}x{1}",
                self.id_board.size(),
                self.board.size()
            )));
        }
        if self.next_id == 0 {
            return Err(Error::malformed("next_id must start at 1"));
        }
        if self.next_id >= ID_LIMIT {
            return Err(Error::malformed(format!(
                "next_id {0} is past the id limit {ID_LIMIT}",
                self.next_id
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for (pos, value) in self.board.iter() {
            let id = self.id_board.get(pos);
            if value != 0 && (value < 2 || !value.is_power_of_two()) {
                return Err(Error::malformed(format!(
                    "value {value} at {pos} is not a tile value"
                )));
            }
            if (value == 0) != (id == 0) {
                return Err(Error::malformed(format!(
                    "value {value} and id {id} at {pos} disagree on occupancy"
                )));
            }
            if id != 0 && id >= self.next_id {
                return Err(Error::malformed(format!(
                    "tile id {id} at {pos} was never issued, next id is {0}",
                    self.next_id
                )));
            }
            if id != 0 && !seen.insert(id) {
                return Err(Error::malformed(format!("tile id {id} appears twice")));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .board
            .iter()
            .map(|(_, v)| v.to_string().len())
            .max()
            .unwrap_or(1);
        for row in self.board.rows() {
            let cells = row
                .iter()
                .map(|v| match v {
                    0 => format!("{:>width$}", "."),
                    v => format!("{:>width$}", v),
                })
                .collect::<Vec<_>>();
            writeln!(f, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}
