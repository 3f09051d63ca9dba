use std::collections::BTreeMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::delta::Delta;
use super::history::History;
use super::line::merged;
use super::spawn::Spawner;
use super::state::{GameState, Grid, Pos, Score, Value};
use super::transform::{self, Direction};
use super::{MAX_SIZE, MIN_SIZE, WIN_VALUE};
use crate::error::{Error, Result};
use crate::save::SaveData;

/// Outcome is what a move or an undo hands back to the caller: the resulting state, whether
/// anything changed, and the events that describe the change.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub state: GameState,
    pub changed: bool,
    pub delta: Delta,
}

impl Outcome {
    fn unchanged(state: &GameState) -> Self {
        Self {
            state: state.clone(),
            changed: false,
            delta: Delta::new(),
        }
    }
}

/// Engine owns one game: its current state, the undo history and the random source used for
/// spawning.
///
/// With a seed, every `new_game` restarts the random source from that seed, so the same
/// sequence of moves always produces the same game.
///
/// Best scores are kept per board size.
pub struct Engine<R = ChaCha8Rng> {
    seed: Option<u64>,
    rng: R,
    spawner: Spawner,
    state: GameState,
    history: History,
    best_scores: BTreeMap<usize, Score>,
}

impl Engine {
    /// Starts a game on a `size` x `size` board using the default random source.
    pub fn new(size: usize, seed: Option<u64>) -> Result<Self> {
        Self::seeded(size, seed)
    }
}

impl<R: RngCore + SeedableRng> Engine<R> {
    /// Starts a game on a `size` x `size` board using a random source of type `R`.
    pub fn seeded(size: usize, seed: Option<u64>) -> Result<Self> {
        check_size(size)?;
        let mut engine = Self {
            seed,
            rng: new_rng(seed),
            spawner: Spawner::default(),
            state: GameState::empty(size),
            history: History::new(),
            best_scores: BTreeMap::new(),
        };
        engine.new_game(size)?;
        Ok(engine)
    }

    /// Discards the current game and history and deals a fresh board with two tiles.
    pub fn new_game(&mut self, size: usize) -> Result<&GameState> {
        check_size(size)?;
        self.rng = new_rng(self.seed);
        let mut state = GameState::empty(size);
        for _ in 0..2 {
            state = self.spawner.spawn(&state, &mut self.rng).0;
        }
        self.history.clear();
        self.state = state;
        log::debug!("new {size}x{size} game, seed {:?}", self.seed);
        Ok(&self.state)
    }

    /// Slides the board toward `direction`.
    ///
    /// When nothing moves the engine is left untouched and the outcome has `changed == false`
    /// and an empty delta. Otherwise a tile is spawned, the previous state goes onto the
    /// history, and the delta lists every move and merge followed by the spawn.
    pub fn shift(&mut self, direction: Direction) -> Outcome {
        let shifted = transform::shift(&self.state.board, &self.state.id_board, direction);
        if !shifted.changed {
            log::trace!("shift {direction} changed nothing");
            return Outcome::unchanged(&self.state);
        }

        let moved = GameState {
            game_won: self.state.game_won || shifted.board.contains(&WIN_VALUE),
            board: shifted.board,
            id_board: shifted.id_board,
            score: self.state.score + shifted.score,
            game_over: false,
            next_id: self.state.next_id,
        };
        let mut delta = Delta::from(shifted.events);
        let (mut next, spawned) = self.spawner.spawn(&moved, &mut self.rng);
        if let Some(event) = spawned {
            delta.push(event);
        }
        next.game_over = is_game_over(&next.board);

        if next.game_won && !self.state.game_won {
            log::info!("reached {WIN_VALUE} with score {0}", next.score);
        }
        if next.game_over {
            log::info!("no moves left, final score {0}", next.score);
        }

        let prev = std::mem::replace(&mut self.state, next);
        self.history.push(prev, delta.clone());
        self.record_best();
        log::debug!(
            "shift {direction}: {0} events, score {1}",
            delta.len(),
            self.state.score
        );
        Outcome {
            state: self.state.clone(),
            changed: true,
            delta,
        }
    }

    /// Steps back to the state before the most recent move.
    ///
    /// The returned delta is the inverse of that move's delta. Tile ids are never handed out
    /// twice, so `next_id` keeps its current value rather than the restored one.
    pub fn undo(&mut self) -> Outcome {
        let entry = match self.history.pop() {
            Some(entry) => entry,
            None => {
                log::trace!("nothing to undo");
                return Outcome::unchanged(&self.state);
            }
        };
        let mut restored = entry.state;
        restored.next_id = restored.next_id.max(self.state.next_id);
        self.state = restored;
        log::debug!("undo, {0} more steps available", self.history.len());
        Outcome {
            state: self.state.clone(),
            changed: true,
            delta: entry.delta.invert(),
        }
    }

    /// Snapshot of the current game and its history in persistable form.
    pub fn serialize_save(&self) -> SaveData {
        SaveData::new(&self.state, &self.history)
    }

    /// Replaces the current game and history with a saved one, adopting its board size.
    ///
    /// On error the engine is left as it was; callers usually fall back to `new_game`.
    pub fn load_save(&mut self, data: SaveData) -> Result<&GameState> {
        let (state, history) = data.into_parts()?;
        self.state = state;
        self.history = history;
        self.record_best();
        log::debug!(
            "loaded {0}x{0} game with {1} undo steps",
            self.state.size(),
            self.history.len()
        );
        Ok(&self.state)
    }
}

impl<R> Engine<R> {
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn size(&self) -> usize {
        self.state.size()
    }

    /// Best score reached on a board of the current size.
    pub fn best_score(&self) -> Score {
        self.best_scores.get(&self.size()).copied().unwrap_or(0)
    }

    /// Raises the best score for `size` to `score` if it is higher, e.g. from a stored profile.
    pub fn set_best_score(&mut self, size: usize, score: Score) {
        let best = self.best_scores.entry(size).or_insert(0);
        *best = (*best).max(score);
    }

    fn record_best(&mut self) {
        let (size, score) = (self.size(), self.state.score);
        self.set_best_score(size, score);
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: GameState) {
        self.history.clear();
        self.state = state;
    }
}

/// Whether `board` is full and has no two equal neighbours in a row or column.
pub fn is_game_over(board: &Grid<Value>) -> bool {
    let size = board.size();
    for (pos, value) in board.iter() {
        if value == 0 {
            return false;
        }
        let (r, c) = (pos.row(), pos.col());
        if c + 1 < size && merged(value, board.get(Pos(r, c + 1))).is_some() {
            return false;
        }
        if r + 1 < size && merged(value, board.get(Pos(r + 1, c))).is_some() {
            return false;
        }
    }
    true
}

/// Fails with [`Error::InvalidSize`] unless `size` is a supported board size.
pub fn check_size(size: usize) -> Result<()> {
    if (MIN_SIZE..=MAX_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(Error::InvalidSize(size))
    }
}

fn new_rng<R: SeedableRng>(seed: Option<u64>) -> R {
    match seed {
        Some(seed) => R::seed_from_u64(seed),
        None => R::from_entropy(),
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::SmallRng;
    use rand::seq::SliceRandom;
    use rand::Rng;
    use rstest::*;

    use super::*;
    use crate::engine::delta::DeltaEvent;
    use crate::engine::state::TileId;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn engine() -> Engine {
        init_logger();
        Engine::new(4, Some(42)).unwrap()
    }

    fn state(board: [[Value; 4]; 4], ids: [[TileId; 4]; 4], next_id: TileId) -> GameState {
        let mut s = GameState::empty(4);
        s.board = board.into();
        s.id_board = ids.into();
        s.next_id = next_id;
        s
    }

    fn spawned(delta: &Delta) -> Vec<Pos> {
        delta
            .events()
            .iter()
            .filter_map(|e| match e {
                DeltaEvent::Spawn { at, .. } => Some(*at),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_game_deals_two_tiles() {
        let engine = engine();
        let tiles = engine
            .state()
            .board
            .iter()
            .filter(|(_, v)| *v != 0)
            .collect::<Vec<_>>();
        assert_eq!(tiles.len(), 2);
        assert_ne!(tiles[0].0, tiles[1].0);
        assert!(tiles.iter().all(|(_, v)| *v == 2 || *v == 4));
        assert_eq!(engine.state().next_id, 3);
        assert_eq!(engine.state().score, 0);
        assert!(engine.history().is_empty());
        assert!(engine.state().validate().is_ok());
    }

    #[test]
    fn new_game_is_reproducible() {
        let mut a = engine();
        let first = a.state().clone();
        a.shift(Direction::Left);
        a.shift(Direction::Up);
        let again = a.new_game(4).unwrap().clone();
        assert_eq!(first, again);
        assert!(a.history().is_empty());

        let b = engine();
        assert_eq!(first, *b.state());
    }

    #[test]
    fn same_seed_same_trace() {
        let mut a = engine();
        let mut b = engine();
        for direction in [Direction::Left, Direction::Down, Direction::Right, Direction::Up]
            .iter()
            .cycle()
            .take(40)
        {
            assert_eq!(a.shift(*direction), b.shift(*direction));
        }
    }

    #[rstest]
    #[case(2)]
    #[case(9)]
    fn invalid_size(#[case] size: usize) {
        assert!(matches!(Engine::new(size, None), Err(Error::InvalidSize(s)) if s == size));
        let mut engine = engine();
        assert!(engine.new_game(size).is_err());
        assert_eq!(engine.size(), 4);
    }

    #[test]
    fn packed_tile_does_not_move() {
        let mut engine = engine();
        let initial = state(
            [[2, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
            [[1, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
            2,
        );
        engine.set_state(initial.clone());
        for _ in 0..3 {
            let outcome = engine.shift(Direction::Left);
            assert!(!outcome.changed);
            assert!(outcome.delta.is_empty());
            assert_eq!(outcome.state, initial);
            assert_eq!(*engine.state(), initial);
        }
        assert!(engine.history().is_empty());
    }

    #[test]
    fn merge_row_left() {
        let mut engine = engine();
        engine.set_state(state(
            [[2, 2, 4, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
            [[1, 2, 3, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
            4,
        ));
        let outcome = engine.shift(Direction::Left);
        assert!(outcome.changed);
        assert_eq!(outcome.state.score, 4);
        assert_eq!(outcome.state.board.to_rows()[0][..2], [4, 4]);
        assert_eq!(
            outcome.delta.events()[..3],
            [
                DeltaEvent::Move {
                    id: 2,
                    from: Pos(0, 1),
                    to: Pos(0, 0)
                },
                DeltaEvent::Merge {
                    from_ids: (1, 2),
                    new_id: 1,
                    at: Pos(0, 0),
                    value: 4
                },
                DeltaEvent::Move {
                    id: 3,
                    from: Pos(0, 2),
                    to: Pos(0, 1)
                },
            ]
        );
        assert!(matches!(
            outcome.delta.events()[3],
            DeltaEvent::Spawn { id: 4, .. }
        ));
        assert_eq!(outcome.delta.len(), 4);
        assert_eq!(outcome.state.next_id, 5);
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn win_is_sticky() {
        let mut engine = engine();
        engine.set_state(state(
            [[1024, 1024, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
            [[1, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
            3,
        ));
        assert!(!engine.state().game_won);
        let outcome = engine.shift(Direction::Left);
        assert!(outcome.state.game_won);
        assert_eq!(outcome.state.board.get(Pos(0, 0)), 2048);

        let outcome = engine.shift(Direction::Right);
        assert!(outcome.changed);
        assert!(outcome.state.game_won);
        for direction in Direction::ALL {
            engine.shift(direction);
            assert!(engine.state().game_won);
        }
    }

    #[test]
    fn value_is_conserved() {
        let mut engine = engine();
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let before = engine.state().total();
            let direction = *Direction::ALL.choose(&mut rng).unwrap();
            let outcome = engine.shift(direction);
            if !outcome.changed {
                assert_eq!(outcome.state.total(), before);
                continue;
            }
            let spawn = spawned(&outcome.delta)
                .iter()
                .map(|at| outcome.state.board.get(*at) as u64)
                .sum::<u64>();
            assert_eq!(outcome.state.total(), before + spawn);
        }
    }

    #[test]
    fn undo_restores_previous_state() {
        let mut engine = engine();
        let before = engine.state().clone();
        let outcome = Direction::ALL
            .iter()
            .map(|d| engine.shift(*d))
            .find(|o| o.changed)
            .expect("a fresh board can always move");
        let after_next_id = outcome.state.next_id;

        let undone = engine.undo();
        assert!(undone.changed);
        assert_eq!(undone.delta, outcome.delta.invert());
        let restored = engine.state();
        assert_eq!(restored.board, before.board);
        assert_eq!(restored.id_board, before.id_board);
        assert_eq!(restored.score, before.score);
        assert_eq!(restored.game_won, before.game_won);
        assert_eq!(restored.game_over, before.game_over);
        assert_eq!(restored.next_id, after_next_id);
        assert!(restored.next_id > before.next_id);
    }

    #[test]
    fn undo_without_history() {
        let mut engine = engine();
        let before = engine.state().clone();
        let outcome = engine.undo();
        assert!(!outcome.changed);
        assert!(outcome.delta.is_empty());
        assert_eq!(outcome.state, before);
    }

    #[test]
    fn undo_walks_back_ten_moves() {
        let mut engine = engine();
        let mut boards = vec![engine.state().board.clone()];
        while boards.len() < 13 {
            let outcome = Direction::ALL
                .iter()
                .map(|d| engine.shift(*d))
                .find(|o| o.changed)
                .expect("game should not end within a dozen moves");
            boards.push(outcome.state.board);
        }
        assert_eq!(engine.history().len(), 10);
        for expected in boards.iter().rev().skip(1).take(10) {
            let outcome = engine.undo();
            assert!(outcome.changed);
            assert_eq!(outcome.state.board, *expected);
        }
        assert!(!engine.undo().changed);
    }

    #[test]
    fn ids_stay_unique() {
        let mut engine = engine();
        let mut rng = SmallRng::seed_from_u64(1234);
        let mut next_id = engine.state().next_id;
        for step in 0..500 {
            if engine.state().game_over {
                engine.new_game(4).unwrap();
                next_id = engine.state().next_id;
            }
            match rng.gen_range(0..5) {
                4 => engine.undo(),
                d => engine.shift(Direction::ALL[d]),
            };
            let state = engine.state();
            assert!(state.validate().is_ok(), "step {step}: {state}");
            assert!(state.next_id >= next_id, "next_id went backwards");
            next_id = state.next_id;
        }
    }

    #[test]
    fn full_board_without_pairs_is_over() {
        let board = Grid::from([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(is_game_over(&board));
    }

    #[rstest]
    #[case::horizontal_pair([[2, 2, 8, 4], [4, 8, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]])]
    #[case::vertical_pair([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 4]])]
    #[case::empty_cell([[2, 4, 2, 4], [4, 2, 0, 2], [2, 4, 2, 4], [4, 2, 4, 2]])]
    fn board_with_moves_is_not_over(#[case] board: [[Value; 4]; 4]) {
        assert!(!is_game_over(&Grid::from(board)));
    }

    #[test]
    fn last_move_can_end_game() {
        let mut engine = engine();
        engine.set_state(state(
            [[2, 2, 8, 16], [16, 32, 64, 128], [32, 64, 128, 256], [16, 32, 64, 512]],
            [
                [1, 2, 3, 4],
                [5, 6, 7, 8],
                [9, 10, 11, 12],
                [13, 14, 15, 16],
            ],
            17,
        ));
        let outcome = engine.shift(Direction::Left);
        assert!(outcome.changed);
        assert_eq!(spawned(&outcome.delta), vec![Pos(0, 3)]);
        assert!(outcome.state.game_over);

        for direction in Direction::ALL {
            let outcome = engine.shift(direction);
            assert!(!outcome.changed, "shifting {direction}");
        }
        assert!(engine.undo().changed);
        assert!(!engine.state().game_over);
    }

    #[test]
    fn save_round_trip() {
        let mut engine = engine();
        for direction in [Direction::Left, Direction::Up, Direction::Right] {
            engine.shift(direction);
        }
        let data = engine.serialize_save();
        let text = crate::save::to_string(&data).unwrap();

        let mut other = Engine::new(5, Some(1)).unwrap();
        other.load_save(crate::save::from_str(&text).unwrap()).unwrap();
        assert_eq!(other.state(), engine.state());
        assert_eq!(other.history(), engine.history());
        assert_eq!(other.size(), 4);
        assert_eq!(other.undo(), engine.undo());
    }

    #[test]
    fn best_score_per_size() {
        let mut engine = engine();
        let mut best = 0;
        for direction in Direction::ALL.iter().cycle().take(40) {
            best = best.max(engine.shift(*direction).state.score);
        }
        assert_eq!(engine.best_score(), best);

        engine.new_game(3).unwrap();
        assert_eq!(engine.best_score(), 0);
        engine.set_best_score(3, 12);
        assert_eq!(engine.best_score(), 12);

        engine.new_game(4).unwrap();
        assert_eq!(engine.best_score(), best);
    }

    #[test]
    fn tiles_at_ceiling_stay_apart() {
        let top = 1 << 31;
        let mut saved = GameState::empty(3);
        saved.board = Grid::from([[top, top, 0], [0, 0, 0], [0, 0, 0]]);
        saved.id_board = Grid::from([[1, 2, 0], [0, 0, 0], [0, 0, 0]]);
        saved.next_id = 3;

        let mut engine = engine();
        engine
            .load_save(SaveData::new(&saved, &History::new()))
            .unwrap();
        assert!(!engine.shift(Direction::Left).changed);

        let outcome = engine.shift(Direction::Right);
        assert!(outcome.changed);
        assert_eq!(outcome.state.board.get(Pos(0, 1)), top);
        assert_eq!(outcome.state.board.get(Pos(0, 2)), top);
        assert_eq!(outcome.state.score, 0);
        assert!(outcome.state.validate().is_ok());
    }

    #[test]
    fn pair_at_ceiling_is_not_a_move() {
        let top = 1 << 31;
        assert!(is_game_over(&Grid::from([
            [top, top, 2],
            [4, 8, 16],
            [32, 64, 128]
        ])));
    }

    #[test]
    fn generic_random_source() {
        let mut a = Engine::<SmallRng>::seeded(3, Some(5)).unwrap();
        let b = Engine::<SmallRng>::seeded(3, Some(5)).unwrap();
        assert_eq!(a.state(), b.state());
        assert_eq!(a.size(), 3);
        a.shift(Direction::Down);
        assert!(a.state().validate().is_ok());
    }
}
