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

use super::piece;
use crate::board::moves::{Move, SubMove};
use crate::board::position::PiecePosition;

/// Move instruction for chess. Only [`super::ChessState`] constructs
/// valid instances; castling is encoded as the king's two-field move and
/// expanded into its rook component on application.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ChessMove {
    /// Index of the start field.
    pub(crate) start_field_id: i32,

    /// Index of the finish field.
    pub(crate) finish_field_id: i32,

    /// Whether the move captures.
    pub(crate) captures: bool,

    /// Rank the moving piece assumes on arrival (pawn promotion); ignored
    /// when zero.
    pub(crate) final_rank: i32,
}

impl Default for ChessMove {
    fn default() -> Self {
        Self::invalid()
    }
}

impl ChessMove {
    pub(crate) const fn new(start_field_id: i32, finish_field_id: i32, captures: bool) -> Self {
        Self {
            start_field_id,
            finish_field_id,
            captures,
            final_rank: piece::SPACE,
        }
    }

    pub(crate) const fn promotion(
        start_field_id: i32,
        finish_field_id: i32,
        captures: bool,
        final_rank: i32,
    ) -> Self {
        Self {
            start_field_id,
            finish_field_id,
            captures,
            final_rank,
        }
    }

    pub(crate) const fn invalid() -> Self {
        Self {
            start_field_id: -1,
            finish_field_id: -1,
            captures: false,
            final_rank: -1,
        }
    }

    #[inline]
    pub(crate) fn start(&self) -> PiecePosition {
        PiecePosition::from_linear(self.start_field_id as usize)
    }

    #[inline]
    pub(crate) fn finish(&self) -> PiecePosition {
        PiecePosition::from_linear(self.finish_field_id as usize)
    }

    /// Rank of the moving piece after the move is applied.
    #[inline]
    pub(crate) fn final_piece_rank(&self, start_piece_rank: i32) -> i32 {
        if self.final_rank != piece::SPACE {
            self.final_rank
        } else {
            start_piece_rank
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.captures
    }

    pub fn to_move(&self) -> Move {
        Move::with_final_rank(
            vec![SubMove::new(self.start(), self.finish())],
            self.final_rank,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_piece_rank() {
        let quiet = ChessMove::new(8, 16, false);
        assert_eq!(quiet.final_piece_rank(piece::PAWN), piece::PAWN);

        let promo = ChessMove::promotion(48, 56, false, piece::QUEEN);
        assert_eq!(promo.final_piece_rank(piece::PAWN), piece::QUEEN);
    }

    #[test]
    fn test_to_move() {
        let mv = ChessMove::new(3, 19, true);
        let ui_move = mv.to_move();
        assert_eq!(ui_move.sub_moves.len(), 1);
        assert_eq!(ui_move.sub_moves[0].start, PiecePosition::new(0, 3));
        assert_eq!(ui_move.sub_moves[0].end, PiecePosition::new(2, 3));
        assert_eq!(ui_move.final_rank, piece::SPACE);
    }
}
