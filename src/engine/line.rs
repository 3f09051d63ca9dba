//! Compression of a single line of tiles toward its head.

use super::state::{Score, Tile, TileId, Value};

/// An event produced while compressing one line. Indices refer to positions within the line
/// before compression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LineEvent {
    Move {
        id: TileId,
        from: usize,
        to: usize,
    },
    Merge {
        from_ids: (TileId, TileId),
        new_id: TileId,
        at: usize,
        value: Value,
    },
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Compressed {
    pub tiles: Vec<Tile>,
    pub score: Score,
    pub events: Vec<LineEvent>,
}

/// The value two neighbouring tiles combine into, or `None` if they cannot merge. Tiles at the
/// largest representable value stay apart.
pub fn merged(a: Value, b: Value) -> Option<Value> {
    if a != 0 && a == b {
        a.checked_mul(2)
    } else {
        None
    }
}

/// Slides every tile in `line` toward index 0, merging equal neighbours.
///
/// Each tile takes part in at most one merge: once two tiles combine, the scan moves past both
/// of them, so a freshly merged tile never merges again in the same call. The merged tile keeps
/// the id of the tile nearer the head.
pub fn compress(line: &[Tile]) -> Compressed {
    let tiles = line
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_empty())
        .map(|(idx, t)| (idx, *t))
        .collect::<Vec<_>>();

    let mut out = Compressed {
        tiles: Vec::with_capacity(line.len()),
        ..Default::default()
    };
    let mut write = 0usize;
    let mut i = 0usize;
    while i < tiles.len() {
        let (idx, tile) = tiles[i];
        let pair = tiles
            .get(i + 1)
            .and_then(|&(next_idx, next)| Some((next_idx, next, merged(tile.value, next.value)?)));
        match pair {
            Some((next_idx, next, value)) => {
                out.moved(tile.id, idx, write);
                out.moved(next.id, next_idx, write);
                out.events.push(LineEvent::Merge {
                    from_ids: (tile.id, next.id),
                    new_id: tile.id,
                    at: write,
                    value,
                });
                out.tiles.push(Tile::new(value, tile.id));
                out.score += Score::from(value);
                i += 2;
            }
            _ => {
                out.moved(tile.id, idx, write);
                out.tiles.push(tile);
                i += 1;
            }
        }
        write += 1;
    }
    out.tiles.resize(line.len(), Tile::EMPTY);
    out
}

impl Compressed {
    fn moved(&mut self, id: TileId, from: usize, to: usize) {
        if from != to {
            self.events.push(LineEvent::Move { id, from, to });
        }
    }

    pub fn values(&self) -> Vec<Value> {
        self.tiles.iter().map(|t| t.value).collect()
    }
}
