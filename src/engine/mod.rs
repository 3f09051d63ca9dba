pub mod delta;
pub mod game;
pub mod history;
pub mod line;
pub mod spawn;
pub mod state;
pub mod transform;

/// Smallest supported board size.
pub const MIN_SIZE: usize = 3;
/// Largest supported board size.
pub const MAX_SIZE: usize = 8;

/// A tile of this value wins the game.
pub const WIN_VALUE: state::Value = 2048;

pub use delta::{Delta, DeltaEvent};
pub use game::{check_size, is_game_over, Engine, Outcome};
pub use history::{History, HISTORY_CAPACITY};
pub use state::{GameState, Grid, Pos, Score, Tile, TileId, Value, ID_LIMIT};
pub use transform::Direction;
