// Copyright 2026 Tobin Edwards
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

//! The uniform state interface the agents play against.
//!
//! [`GameState`] is the capability every concrete game satisfies;
//! [`StateHandle`] wraps a game state together with its cached legal-move
//! list and implements the object-safe [`State`] trait handed to agents;
//! [`StateSeed`] is the sealed, cloneable tag that yields fresh handles.
//! [`TraceRecorder`] wraps a state to record the played moves for a
//! deterministic replay, which both smart training and regression tests
//! rely on.

use serde::{Deserialize, Serialize};

use super::checkers::{CheckersMove, CheckersState, CHECKERS_STATE_SIZE};
use super::chess::{ChessMove, ChessState};
use super::moves::Move;
use super::FIELDS_COUNT;

/// Bit-tag identifying which game a state, seed or agent belongs to.
/// The tags combine bitwise: an agent carrying `CHECKERS | CHESS` is
/// compatible with either game.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateTypeId(u32);

impl StateTypeId {
    pub const INVALID: Self = Self(0);
    pub const CHECKERS: Self = Self(1);
    pub const CHESS: Self = Self(1 << 1);
    pub const ALL: Self = Self(Self::CHECKERS.0 | Self::CHESS.0);

    /// The common type of two tags, [`StateTypeId::INVALID`] when they
    /// share nothing.
    #[inline]
    pub const fn common(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn is_compatible_with(self, other: Self) -> bool {
        self.common(other).0 != 0
    }

    /// Size of the int-vector projection of the tagged state type.
    pub fn state_size(self) -> usize {
        match self {
            Self::CHECKERS => CHECKERS_STATE_SIZE,
            Self::CHESS => FIELDS_COUNT as usize,
            _ => panic!("state size is undefined for {self:?}"),
        }
    }

    /// The start-configuration seed of the tagged state type.
    pub fn start_seed(self) -> StateSeed {
        match self {
            Self::CHECKERS => StateSeed::Checkers(CheckersState::start()),
            Self::CHESS => StateSeed::Chess(ChessState::start()),
            _ => panic!("start seed is undefined for {self:?}"),
        }
    }
}

/// Capability contract of a concrete game state. The set is closed:
/// checkers, chess, and the trace recorder over either. States cross
/// thread boundaries (parallel training pairs, parallel ensemble
/// voting), hence the marker bounds.
pub trait GameState: Clone + Send + Sync + 'static {
    type Move: Clone + PartialEq + std::fmt::Debug + Send + Sync;

    /// The concrete state a trace recorder of this state replays on.
    type Base: GameState<Move = Self::Move, Base = Self::Base>;

    /// Fills `out_result` with the legal moves; returns the draw flag.
    fn moves(&self, out_result: &mut Vec<Self::Move>) -> bool;

    /// Applies a move and flips the board to the opponent's perspective.
    fn make_move_and_invert(&mut self, mv: &Self::Move);

    fn is_inverted(&self) -> bool;

    /// Int-vector projection of the current state.
    fn to_vector(&self) -> Vec<i32>;

    /// Int-vector projection of the afterstate of `mv`.
    fn vector_after(&self, mv: &Self::Move) -> Vec<i32>;

    /// Shaping reward of a transition between two int-vector states.
    fn reward(prev_state: &[i32], next_state: &[i32]) -> f64;

    /// 64-element UI projection.
    fn to_vector_64(&self) -> Vec<i32>;

    /// 64-element UI projection of the inverted state.
    fn to_vector_64_inverted(&self) -> Vec<i32>;

    fn to_ui_move(mv: &Self::Move) -> Move;

    fn is_capture(mv: &Self::Move) -> bool;

    /// Placeholder move stored by the trace recorder before the actual
    /// move of a position is known.
    fn invalid_move() -> Self::Move;

    fn type_id() -> StateTypeId;

    /// A seed able to reproduce the current position.
    fn seed(&self) -> StateSeed;

    /// The base-state copy a trace recorder starts from.
    fn base_state(&self) -> Self::Base;
}

impl GameState for CheckersState {
    type Move = CheckersMove;
    type Base = CheckersState;

    fn moves(&self, out_result: &mut Vec<CheckersMove>) -> bool {
        CheckersState::moves(self, out_result)
    }

    fn make_move_and_invert(&mut self, mv: &CheckersMove) {
        CheckersState::make_move_and_invert(self, mv)
    }

    fn is_inverted(&self) -> bool {
        CheckersState::is_inverted(self)
    }

    fn to_vector(&self) -> Vec<i32> {
        CheckersState::to_vector(self)
    }

    fn vector_after(&self, mv: &CheckersMove) -> Vec<i32> {
        CheckersState::vector_after(self, mv)
    }

    fn reward(prev_state: &[i32], next_state: &[i32]) -> f64 {
        CheckersState::calc_reward(prev_state, next_state)
    }

    fn to_vector_64(&self) -> Vec<i32> {
        CheckersState::to_vector_64(self)
    }

    fn to_vector_64_inverted(&self) -> Vec<i32> {
        CheckersState::to_vector_64_inverted(self)
    }

    fn to_ui_move(mv: &CheckersMove) -> Move {
        mv.to_move()
    }

    fn is_capture(mv: &CheckersMove) -> bool {
        mv.is_capturing()
    }

    fn invalid_move() -> CheckersMove {
        CheckersMove::invalid()
    }

    fn type_id() -> StateTypeId {
        StateTypeId::CHECKERS
    }

    fn seed(&self) -> StateSeed {
        StateSeed::Checkers(self.clone())
    }

    fn base_state(&self) -> CheckersState {
        self.clone()
    }
}

impl GameState for ChessState {
    type Move = ChessMove;
    type Base = ChessState;

    fn moves(&self, out_result: &mut Vec<ChessMove>) -> bool {
        ChessState::moves(self, out_result)
    }

    fn make_move_and_invert(&mut self, mv: &ChessMove) {
        ChessState::make_move_and_invert(self, mv)
    }

    fn is_inverted(&self) -> bool {
        ChessState::is_inverted(self)
    }

    fn to_vector(&self) -> Vec<i32> {
        ChessState::to_vector(self)
    }

    fn vector_after(&self, mv: &ChessMove) -> Vec<i32> {
        ChessState::vector_after(self, mv)
    }

    fn reward(prev_state: &[i32], next_state: &[i32]) -> f64 {
        ChessState::calc_reward(prev_state, next_state)
    }

    fn to_vector_64(&self) -> Vec<i32> {
        ChessState::to_vector_64(self)
    }

    fn to_vector_64_inverted(&self) -> Vec<i32> {
        ChessState::to_vector_64_inverted(self)
    }

    fn to_ui_move(mv: &ChessMove) -> Move {
        mv.to_move()
    }

    fn is_capture(mv: &ChessMove) -> bool {
        mv.is_capturing()
    }

    fn invalid_move() -> ChessMove {
        ChessMove::invalid()
    }

    fn type_id() -> StateTypeId {
        StateTypeId::CHESS
    }

    fn seed(&self) -> StateSeed {
        StateSeed::Chess(self.clone())
    }

    fn base_state(&self) -> ChessState {
        self.clone()
    }
}

/// A state that replays a fixed sequence of recorded moves: every
/// position offers exactly the recorded move, and applying anything else
/// is refused. Serves smart training and as a reference oracle in
/// regression tests.
///
/// A recorder always wraps a *base* state (never another recorder), so
/// handles over recorders bottom out.
#[derive(Debug, Clone)]
pub struct TraceRecorder<S: GameState> {
    state: S,
    moves_counter: usize,
    moves: Vec<S::Move>,
    draw_flags: Vec<bool>,
}

impl<S: GameState> TraceRecorder<S> {
    pub fn new(init_state: &S) -> Self {
        Self {
            state: init_state.clone(),
            moves_counter: 0,
            moves: Vec::new(),
            draw_flags: Vec::new(),
        }
    }

    /// Appends a (move, draw-flag) record.
    fn add_record(&mut self, mv: S::Move, draw_flag: bool) {
        assert_eq!(
            self.moves.len(),
            self.draw_flags.len(),
            "record added after the recorder was finalized"
        );
        self.moves.push(mv);
        self.draw_flags.push(draw_flag);
    }

    /// Adds the final record, which carries a draw flag but no move.
    fn add_final_record(&mut self, draw_flag: bool) {
        self.draw_flags.push(draw_flag);
    }

    /// Substitutes the latest recorded move.
    fn adjust_last_move(&mut self, mv: S::Move) {
        *self.moves.last_mut().expect("no recorded move to adjust") = mv;
    }
}

impl<S: GameState> GameState for TraceRecorder<S> {
    type Move = S::Move;
    type Base = S::Base;

    fn moves(&self, out_result: &mut Vec<S::Move>) -> bool {
        assert!(
            self.moves_counter <= self.moves.len() && self.moves_counter < self.draw_flags.len(),
            "cannot generate moves past the recorded trace"
        );

        out_result.clear();
        if self.moves_counter < self.moves.len() {
            out_result.push(self.moves[self.moves_counter].clone());
        }
        self.draw_flags[self.moves_counter]
    }

    fn make_move_and_invert(&mut self, mv: &S::Move) {
        assert!(
            self.moves_counter < self.moves.len() && *mv == self.moves[self.moves_counter],
            "move diverges from the recorded trace"
        );
        self.state.make_move_and_invert(mv);
        self.moves_counter += 1;
    }

    fn is_inverted(&self) -> bool {
        self.state.is_inverted()
    }

    fn to_vector(&self) -> Vec<i32> {
        self.state.to_vector()
    }

    fn vector_after(&self, mv: &S::Move) -> Vec<i32> {
        self.state.vector_after(mv)
    }

    fn reward(prev_state: &[i32], next_state: &[i32]) -> f64 {
        S::reward(prev_state, next_state)
    }

    fn to_vector_64(&self) -> Vec<i32> {
        self.state.to_vector_64()
    }

    fn to_vector_64_inverted(&self) -> Vec<i32> {
        self.state.to_vector_64_inverted()
    }

    fn to_ui_move(mv: &S::Move) -> Move {
        S::to_ui_move(mv)
    }

    fn is_capture(mv: &S::Move) -> bool {
        S::is_capture(mv)
    }

    fn invalid_move() -> S::Move {
        S::invalid_move()
    }

    fn type_id() -> StateTypeId {
        S::type_id()
    }

    fn seed(&self) -> StateSeed {
        self.state.seed()
    }

    fn base_state(&self) -> S::Base {
        self.state.base_state()
    }
}

/// A cloneable tag able to produce a fresh playable state. The enum is
/// sealed: the set of games is closed by design.
#[derive(Debug, Clone, PartialEq)]
pub enum StateSeed {
    Checkers(CheckersState),
    Chess(ChessState),
}

impl StateSeed {
    pub fn state_type(&self) -> StateTypeId {
        match self {
            Self::Checkers(_) => StateTypeId::CHECKERS,
            Self::Chess(_) => StateTypeId::CHESS,
        }
    }

    /// Yields a fresh state handle, optionally wired to a trace
    /// recorder.
    pub fn new_state(&self, initialize_recorder: bool) -> Box<dyn State> {
        match self {
            Self::Checkers(state) => {
                Box::new(StateHandle::new(state.clone(), initialize_recorder))
            }
            Self::Chess(state) => Box::new(StateHandle::new(state.clone(), initialize_recorder)),
        }
    }
}

/// The read-and-step interface agents and the board orchestrator see.
/// Implementations cache the legal-move list; `move_invert_reset` is the
/// sole mutator and refreshes the cache. Shared references cross thread
/// boundaries during parallel ensemble voting.
pub trait State: Send + Sync {
    /// Number of available moves (0 means the position is terminal).
    fn moves_count(&self) -> i32;

    /// Int-vector projection of the current state.
    fn evaluate(&self) -> Vec<i32>;

    /// Int-vector projection of the afterstate of the move with the
    /// given id; `0 <= move_id < moves_count` is the caller's burden.
    fn evaluate_after(&self, move_id: i32) -> Vec<i32>;

    /// Shaping reward of a transition between two int-vector states.
    fn calc_reward(&self, prev_state: &[i32], next_state: &[i32]) -> f64;

    /// A seed able to reproduce the current position (for search).
    fn current_seed(&self) -> StateSeed;

    /// The available moves in UI form.
    fn all_moves(&self) -> Vec<Move>;

    fn is_capture_action(&self, move_id: i32) -> bool;

    fn is_inverted(&self) -> bool;

    fn is_draw(&self) -> bool;

    /// Applies the move with the given id, inverts the board and
    /// regenerates the cached legal-move list.
    fn move_invert_reset(&mut self, move_id: i32);

    /// UI projection of the current state.
    fn evaluate_ui(&self) -> Vec<i32>;

    /// UI projection of the inverted state.
    fn evaluate_ui_inverted(&self) -> Vec<i32>;

    /// A replay handle over the recorded trace, when recording was
    /// requested at construction.
    fn recorded_state(&self) -> Option<Box<dyn State>>;

    fn state_type(&self) -> StateTypeId;
}

/// [`State`] implementation wrapping any [`GameState`]. The trace
/// recorder, when requested, always records over the base state, so a
/// replay handle carries no recorder of its own kind.
pub struct StateHandle<S: GameState> {
    state: S,
    actions: Vec<S::Move>,
    is_draw: bool,
    trace_recorder: Option<TraceRecorder<S::Base>>,
}

impl<S: GameState + 'static> StateHandle<S> {
    pub fn new(state: S, initialize_recorder: bool) -> Self {
        let mut actions = Vec::new();
        let is_draw = state.moves(&mut actions);

        let trace_recorder = initialize_recorder.then(|| {
            let mut recorder = TraceRecorder::<S::Base>::new(&state.base_state());
            recorder.add_record(S::invalid_move(), is_draw);
            recorder
        });

        Self {
            state,
            actions,
            is_draw,
            trace_recorder,
        }
    }

    /// Copy of the wrapped state (diagnostics support).
    pub fn state(&self) -> S {
        self.state.clone()
    }
}

impl<S: GameState + 'static> State for StateHandle<S> {
    fn moves_count(&self) -> i32 {
        self.actions.len() as i32
    }

    fn evaluate(&self) -> Vec<i32> {
        self.state.to_vector()
    }

    fn evaluate_after(&self, move_id: i32) -> Vec<i32> {
        self.state.vector_after(&self.actions[move_id as usize])
    }

    fn calc_reward(&self, prev_state: &[i32], next_state: &[i32]) -> f64 {
        S::reward(prev_state, next_state)
    }

    fn current_seed(&self) -> StateSeed {
        self.state.seed()
    }

    fn all_moves(&self) -> Vec<Move> {
        self.actions.iter().map(|mv| S::to_ui_move(mv)).collect()
    }

    fn is_capture_action(&self, move_id: i32) -> bool {
        S::is_capture(&self.actions[move_id as usize])
    }

    fn is_inverted(&self) -> bool {
        self.state.is_inverted()
    }

    fn is_draw(&self) -> bool {
        self.is_draw
    }

    fn move_invert_reset(&mut self, move_id: i32) {
        let action = self.actions[move_id as usize].clone();

        if let Some(recorder) = &mut self.trace_recorder {
            recorder.adjust_last_move(action.clone());
        }

        self.state.make_move_and_invert(&action);
        self.is_draw = self.state.moves(&mut self.actions);

        if let Some(recorder) = &mut self.trace_recorder {
            if self.actions.is_empty() {
                recorder.add_final_record(self.is_draw);
            } else {
                recorder.add_record(S::invalid_move(), self.is_draw);
            }
        }
    }

    fn evaluate_ui(&self) -> Vec<i32> {
        self.state.to_vector_64()
    }

    fn evaluate_ui_inverted(&self) -> Vec<i32> {
        self.state.to_vector_64_inverted()
    }

    fn recorded_state(&self) -> Option<Box<dyn State>> {
        self.trace_recorder
            .as_ref()
            .map(|recorder| Box::new(StateHandle::new(recorder.clone(), false)) as Box<dyn State>)
    }

    fn state_type(&self) -> StateTypeId {
        S::type_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags_combine_bitwise() {
        assert!(StateTypeId::CHECKERS.is_compatible_with(StateTypeId::ALL));
        assert!(StateTypeId::CHESS.is_compatible_with(StateTypeId::ALL));
        assert!(!StateTypeId::CHECKERS.is_compatible_with(StateTypeId::CHESS));
        assert_eq!(
            StateTypeId::ALL.common(StateTypeId::CHESS),
            StateTypeId::CHESS
        );
        assert_eq!(
            StateTypeId::CHECKERS.common(StateTypeId::CHESS),
            StateTypeId::INVALID
        );
    }

    #[test]
    fn test_state_sizes() {
        assert_eq!(StateTypeId::CHECKERS.state_size(), 32);
        assert_eq!(StateTypeId::CHESS.state_size(), 64);
    }

    #[test]
    fn test_start_seeds_yield_playable_states() {
        let checkers = StateTypeId::CHECKERS.start_seed().new_state(false);
        assert_eq!(checkers.moves_count(), 7);
        assert!(!checkers.is_draw());
        assert_eq!(checkers.evaluate().len(), 32);

        let chess = StateTypeId::CHESS.start_seed().new_state(false);
        assert_eq!(chess.moves_count(), 20);
        assert!(!chess.is_draw());
        assert_eq!(chess.evaluate().len(), 64);
    }

    #[test]
    fn test_handle_applies_and_inverts() {
        let mut handle = StateTypeId::CHECKERS.start_seed().new_state(false);
        assert!(!handle.is_inverted());
        let before = handle.evaluate();
        handle.move_invert_reset(0);
        assert!(handle.is_inverted());
        assert_ne!(handle.evaluate(), before);
        assert!(handle.moves_count() > 0);
    }

    #[test]
    fn test_afterstate_matches_applied_move() {
        let mut handle = StateTypeId::CHESS.start_seed().new_state(false);
        let afterstate = handle.evaluate_after(5);
        handle.move_invert_reset(5);
        // The handle inverted after applying, so compare against the
        // inverted rendition of the recorded afterstate.
        let mut expected = afterstate;
        crate::board::chess::invert_state_vector(&mut expected);
        assert_eq!(handle.evaluate(), expected);
    }

    #[test]
    fn test_trace_replay_reproduces_the_episode() {
        let mut handle = StateTypeId::CHECKERS.start_seed().new_state(true);
        let mut played = Vec::new();
        for ply in 0..40 {
            if handle.moves_count() == 0 || handle.is_draw() {
                break;
            }
            let move_id = (ply * 3) % handle.moves_count();
            played.push(handle.evaluate());
            handle.move_invert_reset(move_id);
        }

        let mut replay = handle.recorded_state().expect("recorder was requested");
        for expected in &played {
            assert_eq!(replay.evaluate(), *expected);
            assert_eq!(replay.moves_count(), 1, "replay offers the recorded move");
            replay.move_invert_reset(0);
        }
        assert_eq!(replay.evaluate(), handle.evaluate());
        if handle.moves_count() == 0 {
            assert_eq!(replay.moves_count(), 0);
            assert_eq!(replay.is_draw(), handle.is_draw());
        }
    }

    #[test]
    #[should_panic(expected = "diverges")]
    fn test_trace_replay_refuses_divergent_moves() {
        let mut recorder = TraceRecorder::<CheckersState>::new(&CheckersState::start());
        let moves = CheckersState::start().moves_vec();
        recorder.add_record(moves[0].clone(), false);
        recorder.add_final_record(false);
        recorder.make_move_and_invert(&moves[1]);
    }
}
