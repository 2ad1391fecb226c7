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

use serde::{Deserialize, Serialize};

use super::position::PiecePosition;

/// The simplest piece motion: one start, one end, and the position of a
/// captured piece if any (invalid position means "no capture").
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubMove {
    pub start: PiecePosition,
    pub end: PiecePosition,
    pub capture: PiecePosition,
}

impl SubMove {
    pub const fn new(start: PiecePosition, end: PiecePosition) -> Self {
        Self {
            start,
            end,
            capture: PiecePosition::invalid(),
        }
    }

    pub const fn with_capture(start: PiecePosition, end: PiecePosition, capture: PiecePosition) -> Self {
        Self { start, end, capture }
    }

    /// Aligns the sub-move with the inverted rendition of a state.
    pub fn invert(&mut self) {
        self.start = self.start.inverted();
        self.end = self.end.inverted();
        if self.capture.is_valid() {
            self.capture = self.capture.inverted();
        }
    }

    #[must_use]
    pub fn inverted(&self) -> Self {
        let mut result = *self;
        result.invert();
        result
    }
}

/// UI-facing compound move shared between the two games: an ordered
/// sequence of sub-moves plus a promotion rank (chess only, zero when no
/// promotion is involved). Checkers capture chains produce one sub-move
/// per jump; every chess move is a single sub-move.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Move {
    pub sub_moves: Vec<SubMove>,
    pub final_rank: i32,
}

impl Move {
    pub fn new(sub_moves: Vec<SubMove>) -> Self {
        Self {
            sub_moves,
            final_rank: 0,
        }
    }

    pub fn with_final_rank(sub_moves: Vec<SubMove>, final_rank: i32) -> Self {
        Self {
            sub_moves,
            final_rank,
        }
    }

    /// Aligns the move with the inverted rendition of a state.
    pub fn invert(&mut self) {
        for sub_move in &mut self.sub_moves {
            sub_move.invert();
        }
    }

    #[must_use]
    pub fn inverted(&self) -> Self {
        let mut result = self.clone();
        result.invert();
        result
    }
}

impl From<SubMove> for Move {
    fn from(sub_move: SubMove) -> Self {
        Self::new(vec![sub_move])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_move_inversion() {
        let sub_move = SubMove::with_capture(
            PiecePosition::new(2, 1),
            PiecePosition::new(4, 3),
            PiecePosition::new(3, 2),
        );
        let inverted = sub_move.inverted();
        assert_eq!(inverted.start, PiecePosition::new(5, 6));
        assert_eq!(inverted.end, PiecePosition::new(3, 4));
        assert_eq!(inverted.capture, PiecePosition::new(4, 5));
        assert_eq!(inverted.inverted(), sub_move);
    }

    #[test]
    fn test_invalid_capture_stays_invalid() {
        let sub_move = SubMove::new(PiecePosition::new(0, 1), PiecePosition::new(1, 2));
        assert_eq!(sub_move.inverted().capture, PiecePosition::invalid());
    }

    #[test]
    fn test_move_inversion() {
        let mv = Move::new(vec![
            SubMove::new(PiecePosition::new(1, 0), PiecePosition::new(2, 1)),
            SubMove::new(PiecePosition::new(2, 1), PiecePosition::new(3, 2)),
        ]);
        assert_eq!(mv.inverted().inverted(), mv);
    }
}
