//! A deterministic engine for 2048-style sliding tile games.
//!
//! [`Engine`] holds one game. Every move or undo returns the resulting [`GameState`] along with
//! a [`Delta`], the ordered list of tile moves, merges and spawns that led to it, so a front end
//! can animate the change without diffing boards. Games and their undo history persist through
//! the [`save`] module.

pub mod engine;
pub mod error;
pub mod save;

pub use engine::{Delta, DeltaEvent, Direction, Engine, GameState, Outcome};
pub use error::{Error, Result};
pub use save::{Profile, SaveData};
