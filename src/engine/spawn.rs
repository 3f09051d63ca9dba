use rand::distributions::Distribution;
use rand::distributions::WeightedIndex;
use rand::seq::SliceRandom;
use rand::Rng;

use super::delta::DeltaEvent;
use super::state::{GameState, Value};

const NEW_TILE_CHOICES: [Value; 2] = [2, 4];
const NEW_TILE_WEIGHTS: [u8; 2] = [9, 1];

/// Spawner places new tiles on empty cells.
#[derive(Clone, Debug)]
pub struct Spawner {
    weighted_index: WeightedIndex<u8>,
}

impl Default for Spawner {
    fn default() -> Self {
        Spawner {
            weighted_index: WeightedIndex::new(NEW_TILE_WEIGHTS)
                .expect("NEW_TILE_WEIGHTS should never be empty"),
        }
    }
}

impl Spawner {
    /// Places a 2 (nine times in ten) or a 4 on an empty cell chosen uniformly at random,
    /// labelled with the state's `next_id`.
    ///
    /// Returns a new state and the matching spawn event, or a copy of `state` and `None` when the
    /// board is full.
    pub fn spawn<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        rng: &mut R,
    ) -> (GameState, Option<DeltaEvent>) {
        let empties = state.empty_cells();
        let at = match empties.choose(rng) {
            Some(at) => *at,
            None => return (state.clone(), None),
        };
        let value = NEW_TILE_CHOICES[self.weighted_index.sample(rng)];
        let id = state.next_id;

        let mut next = state.clone();
        next.board.set(at, value);
        next.id_board.set(at, id);
        next.next_id = id + 1;
        log::trace!("spawned {value} as #{id} at {at}");
        (next, Some(DeltaEvent::Spawn { id, at }))
    }
}
