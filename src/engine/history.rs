use std::collections::VecDeque;

use super::delta::Delta;
use super::state::GameState;
use crate::error::{Error, Result};

/// How many moves can be undone.
pub const HISTORY_CAPACITY: usize = 10;

/// Entry pairs the state before a move with the delta that move produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub state: GameState,
    pub delta: Delta,
}

/// History is a bounded stack of prior states. Pushing past capacity evicts the oldest entry.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct History {
    entries: VecDeque<Entry>,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    /// Rebuilds a history from parallel lists of states and deltas, oldest first.
    pub fn from_parts(states: Vec<GameState>, deltas: Vec<Delta>) -> Result<Self> {
        if states.len() != deltas.len() {
            return Err(Error::malformed(format!(
                "{0} history states but {1} history deltas",
                states.len(),
                deltas.len()
            )));
        }
        if states.len() > HISTORY_CAPACITY {
            return Err(Error::malformed(format!(
                "{0} history entries, at most {HISTORY_CAPACITY} are kept",
                states.len()
            )));
        }
        Ok(Self {
            entries: states
                .into_iter()
                .zip(deltas)
                .map(|(state, delta)| Entry { state, delta })
                .collect(),
        })
    }

    pub fn push(&mut self, state: GameState, delta: Delta) {
        self.entries.push_back(Entry { state, delta });
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn pop(&mut self) -> Option<Entry> {
        self.entries.pop_back()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to most recent.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn states(&self) -> impl Iterator<Item = &GameState> {
        self.iter().map(|e| &e.state)
    }

    pub fn deltas(&self) -> impl Iterator<Item = &Delta> {
        self.iter().map(|e| &e.delta)
    }
}
