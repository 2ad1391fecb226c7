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

use super::checkers::CheckersState;
use super::chess::ChessState;
use super::position::PiecePosition;
use super::state::{StateSeed, StateTypeId};

/// Editor for setting up arbitrary board configurations (UI support for
/// custom initial positions). Starts from the initial configuration of
/// the requested game; the edited board can be turned into a
/// [`StateSeed`] for play at any time.
#[derive(Debug, Clone)]
pub enum StateEditor {
    Checkers(CheckersState),
    Chess(ChessState),
}

impl StateEditor {
    /// An editor over the start configuration of the given state type.
    pub fn new(state_type_id: StateTypeId) -> Self {
        match state_type_id {
            StateTypeId::CHECKERS => Self::Checkers(CheckersState::start()),
            StateTypeId::CHESS => Self::Chess(ChessState::start()),
            _ => panic!("no editor for {state_type_id:?}"),
        }
    }

    pub fn state_type(&self) -> StateTypeId {
        match self {
            Self::Checkers(_) => StateTypeId::CHECKERS,
            Self::Chess(_) => StateTypeId::CHESS,
        }
    }

    /// 64-element UI projection of the edited board.
    pub fn to_vector(&self) -> Vec<i32> {
        match self {
            Self::Checkers(state) => state.to_vector_64(),
            Self::Chess(state) => state.to_vector_64(),
        }
    }

    /// Piece tokens (including space) the given square can take. An
    /// empty collection means the square is not editable.
    pub fn options(&self, pos: &PiecePosition) -> Vec<i32> {
        match self {
            Self::Checkers(state) => state.edit_options(pos),
            Self::Chess(state) => state.edit_options(pos),
        }
    }

    /// Applies the option with the given index (into [`Self::options`])
    /// to the given square.
    pub fn apply_option(&mut self, pos: &PiecePosition, option_id: usize) {
        match self {
            Self::Checkers(state) => state.apply_edit_option(pos, option_id),
            Self::Chess(state) => state.apply_edit_option(pos, option_id),
        }
    }

    /// Resets to the initial configuration.
    pub fn reset(&mut self) {
        match self {
            Self::Checkers(state) => state.reset_edit(),
            Self::Chess(state) => state.reset_edit(),
        }
    }

    /// Clears the board: empty for checkers, kings only for chess.
    pub fn clear(&mut self) {
        match self {
            Self::Checkers(state) => state.clear_edit(),
            Self::Chess(state) => state.clear_edit(),
        }
    }

    /// A seed reproducing the edited position.
    pub fn seed(&self) -> StateSeed {
        match self {
            Self::Checkers(state) => StateSeed::Checkers(state.clone()),
            Self::Chess(state) => StateSeed::Chess(state.clone()),
        }
    }
}
