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

//! Bit-level encoding of chess piece tokens.
//!
//! A token packs the piece rank into its low three bits and carries three
//! flag bits on top: "still on its initial square" (rooks and kings, for
//! castling rights), "just advanced two squares" (pawns, the en-passant
//! mark) and "anti piece" (the rival color). The anti-piece of a token is
//! the token with the anti bit toggled, so all flags survive inversion.

/// Bits reserved for the piece rank.
pub const RANK_BITS: i32 = 3;

/// Mask extracting the plain rank from a full token.
pub const RANK_MASK: i32 = (1 << RANK_BITS) - 1;

/// The piece is a rook or king that has not moved yet.
pub const INITIAL_POSITION_FLAG: i32 = 1 << RANK_BITS;

/// The piece is a pawn that just advanced two squares.
pub const EN_PASSANT_FLAG: i32 = INITIAL_POSITION_FLAG << 1;

/// The piece belongs to the rival side.
pub const ANTI_PIECE_FLAG: i32 = INITIAL_POSITION_FLAG << 2;

/// Bits taken by a full piece token (rank + flags).
pub const TOKEN_BITS: i32 = RANK_BITS + 3;

/// Mask covering a full piece token.
pub const TOKEN_MASK: i32 = (1 << TOKEN_BITS) - 1;

pub const SPACE: i32 = 0;
pub const PAWN: i32 = 1;
pub const BISHOP: i32 = 2;
pub const KNIGHT: i32 = 3;
pub const ROOK: i32 = 4;
pub const QUEEN: i32 = 5;
pub const KING: i32 = 6;

/// Rook and king tokens of the start configuration.
pub const INIT_ROOK: i32 = ROOK | INITIAL_POSITION_FLAG;
pub const INIT_KING: i32 = KING | INITIAL_POSITION_FLAG;

/// The anti-piece of a token; spaces stay spaces.
#[inline]
pub const fn anti(piece_token: i32) -> i32 {
    if is_space(piece_token) {
        piece_token
    } else {
        piece_token ^ ANTI_PIECE_FLAG
    }
}

#[inline]
pub const fn is_space(piece_token: i32) -> bool {
    piece_token == SPACE
}

#[inline]
pub const fn is_piece(piece_token: i32) -> bool {
    piece_token != SPACE
}

#[inline]
pub const fn is_ally_piece(piece_token: i32) -> bool {
    is_piece(piece_token) && (piece_token & ANTI_PIECE_FLAG) == 0
}

#[inline]
pub const fn is_rival_piece(piece_token: i32) -> bool {
    (piece_token & ANTI_PIECE_FLAG) != 0
}

/// True for the ally king.
#[inline]
pub const fn is_king(piece_token: i32) -> bool {
    is_ally_piece(piece_token) && min_rank(piece_token) == KING
}

/// True for any king, ally or rival.
#[inline]
pub const fn is_a_king(piece_token: i32) -> bool {
    min_rank(piece_token) == KING
}

/// True for the ally pawn.
#[inline]
pub const fn is_pawn(piece_token: i32) -> bool {
    is_ally_piece(piece_token) && min_rank(piece_token) == PAWN
}

#[inline]
pub const fn is_in_init_pos(piece_token: i32) -> bool {
    (piece_token & INITIAL_POSITION_FLAG) != 0
}

#[inline]
pub const fn is_en_passant(piece_token: i32) -> bool {
    (piece_token & EN_PASSANT_FLAG) != 0
}

/// Plain rank of a token, with every flag stripped.
#[inline]
pub const fn min_rank(piece_token: i32) -> i32 {
    piece_token & RANK_MASK
}

/// Full token with anything beyond the rank-and-flag bits erased.
#[inline]
pub const fn full_rank(piece_token: i32) -> i32 {
    piece_token & TOKEN_MASK
}

/// The start configuration, ally side on rows 0 and 1. The ally king
/// starts on file index 3; after an inversion the (new) ally king sits on
/// file index 4, which is why castling never assumes a fixed king file.
pub fn init_board_state() -> Vec<i32> {
    let mut result = vec![SPACE; 64];
    let back_rank = [INIT_ROOK, KNIGHT, BISHOP, INIT_KING, QUEEN, BISHOP, KNIGHT, INIT_ROOK];
    for (col, &token) in back_rank.iter().enumerate() {
        result[col] = token;
        result[56 + col] = anti(token);
    }
    for col in 0..8 {
        result[8 + col] = PAWN;
        result[48 + col] = anti(PAWN);
    }
    result
}
