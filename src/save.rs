//! Persistence codec: converts a game and its undo history to and from plain data.
//!
//! The persisted shape is
//!
//! ```text
//! {
//!   "state": {"board": [[..]], "id_board": [[..]], "score": 0, "game_over": false,
//!             "game_won": false, "next_id": 1},
//!   "history": [<state>, ...],
//!   "delta_history": [[{"type": "move", ...}, ...], ...]
//! }
//! ```
//!
//! `history` and `delta_history` run oldest first and always have the same length. Anything that
//! does not fit this shape is rejected with [`Error::MalformedSave`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::{check_size, Delta, GameState, History, Score};
use crate::error::{Error, Result};

/// SaveData is one game and its undo history in persistable form.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub state: GameState,
    pub history: Vec<GameState>,
    pub delta_history: Vec<Delta>,
}

impl SaveData {
    pub fn new(state: &GameState, history: &History) -> Self {
        Self {
            state: state.clone(),
            history: history.states().cloned().collect(),
            delta_history: history.deltas().cloned().collect(),
        }
    }

    /// Reads save data from a plain JSON value. Shape is checked, invariants are not; see
    /// [`SaveData::into_parts`].
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::malformed(e.to_string()))
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Checks every snapshot and splits the data into a current state and an undo history.
    pub fn into_parts(self) -> Result<(GameState, History)> {
        let size = self.state.size();
        check_size(size).map_err(|e| Error::malformed(e.to_string()))?;
        self.state.validate()?;
        for (i, state) in self.history.iter().enumerate() {
            if state.size() != size {
                return Err(Error::malformed(format!(
                    "history entry {i} is {0}x{0}, current board is {size}x{size}",
                    state.size()
                )));
            }
            state.validate()?;
        }
        let history = History::from_parts(self.history, self.delta_history)?;
        Ok((self.state, history))
    }
}

/// Flattens a state and its history into save data.
pub fn serialize(state: &GameState, history: &History) -> SaveData {
    SaveData::new(state, history)
}

/// Rebuilds a state and history from a plain JSON value.
pub fn deserialize(value: serde_json::Value) -> Result<(GameState, History)> {
    SaveData::from_value(value)?.into_parts()
}

pub fn to_string(data: &SaveData) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

/// Parses save data from JSON text. Syntax errors count as malformed saves.
pub fn from_str(s: &str) -> Result<SaveData> {
    serde_json::from_str(s).map_err(|e| Error::malformed(e.to_string()))
}

/// Profile is everything a front end keeps between sessions: the last board size played, and
/// for every board size its best score and its unfinished game.
///
/// Saves are held as raw JSON so one unreadable game does not make the whole profile unusable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub board_size: usize,
    #[serde(default)]
    pub best_scores: BTreeMap<usize, Score>,
    #[serde(default)]
    pub saves: BTreeMap<usize, serde_json::Value>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            board_size: 4,
            best_scores: BTreeMap::new(),
            saves: BTreeMap::new(),
        }
    }
}

impl Profile {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The last board size played, or the default size if the stored one is not supported.
    pub fn playable_size(&self) -> usize {
        match check_size(self.board_size) {
            Ok(()) => self.board_size,
            Err(e) => {
                let fallback = Self::default().board_size;
                log::warn!("profile board size unusable, playing {fallback}x{fallback}: {e}");
                fallback
            }
        }
    }

    pub fn best_score(&self, size: usize) -> Score {
        self.best_scores.get(&size).copied().unwrap_or(0)
    }

    /// Records `score` for `size` if it beats the stored best.
    pub fn record_best(&mut self, size: usize, score: Score) {
        let best = self.best_scores.entry(size).or_insert(0);
        *best = (*best).max(score);
    }

    /// The saved game for `size`, if there is one. A game filed under the wrong size counts as
    /// malformed.
    pub fn save(&self, size: usize) -> Option<Result<SaveData>> {
        let value = self.saves.get(&size)?;
        Some(SaveData::from_value(value.clone()).and_then(|data| {
            match data.state.size() {
                n if n == size => Ok(data),
                n => Err(Error::malformed(format!(
                    "game saved under size {size} is {n}x{n}"
                ))),
            }
        }))
    }

    pub fn store(&mut self, data: &SaveData) -> Result<()> {
        let size = data.state.size();
        self.saves.insert(size, data.to_value()?);
        self.record_best(size, data.state.score);
        Ok(())
    }
}
