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

//! Enumerated attack directions of the chess pieces.
//!
//! Every direction carries a unique bit token from a 24-bit space split
//! into three 8-bit groups: long-range straight/diagonal rays (queen,
//! rook, bishop), short-range king steps, and knight jumps. The bit-OR of
//! tokens is what the per-field attack maps store; a field is threatened
//! iff its rival token is non-zero.
//!
//! The tables describe ally pieces. Rival attacks reuse the same tables
//! with negated increments, so a token always identifies the ally-oriented
//! direction it came from.

use once_cell::sync::Lazy;

use super::piece;
use crate::board::position::PiecePosition;

/// Bits per direction group.
pub const BITS_PER_GROUP: i32 = 8;

/// Mask of the long-range group (queen, rook, bishop rays).
pub const LONG_RANGE_GROUP_MASK: i32 = (1 << BITS_PER_GROUP) - 1;

/// Mask of the short-range (king) group.
pub const SHORT_RANGE_GROUP_MASK: i32 = LONG_RANGE_GROUP_MASK << BITS_PER_GROUP;

/// Mask of the knight-jump group.
pub const KNIGHT_GROUP_MASK: i32 = LONG_RANGE_GROUP_MASK << (2 * BITS_PER_GROUP);

/// Bits taken by a full attack token.
pub const TOTAL_BITS: i32 = 3 * BITS_PER_GROUP;

/// Mask covering a full attack token.
pub const TOKEN_MASK: i32 = (1 << TOTAL_BITS) - 1;

/// Bits taken by the compressed form of an attack token.
pub const TOTAL_COMPRESSED_BITS: i32 = BITS_PER_GROUP + 2;

/// One attack direction: a position increment plus its unique bit token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackDirection {
    pub dir: PiecePosition,
    pub token: i32,
}

impl AttackDirection {
    const fn new(row: i32, col: i32, token: i32) -> Self {
        Self {
            dir: PiecePosition::new(row, col),
            token,
        }
    }

    /// True iff the increment may be applied repeatedly, i.e. the token
    /// belongs to the long-range group.
    #[inline]
    pub const fn is_long_range(&self) -> bool {
        (self.token & LONG_RANGE_GROUP_MASK) != 0
    }

    /// Whether `end` can be reached from `start` by stacking this
    /// direction's increment. On success the returned multiplier tells
    /// how many increments it takes (always 1 for short-range
    /// directions).
    pub fn can_reach(&self, start: &PiecePosition, end: &PiecePosition) -> Option<i32> {
        assert!(
            self.dir.row != 0 || self.dir.col != 0,
            "undefined direction"
        );

        if !self.is_long_range() {
            return (*start + self.dir == *end).then_some(1);
        }

        // Long-range increments are unit vectors, so the multiplier falls
        // out of a coordinate difference.
        if self.dir.row == 0 {
            return (start.row == end.row).then_some((end.col - start.col) * self.dir.col);
        }

        let multiplier = (end.row - start.row) * self.dir.row;

        if self.dir.col == 0 {
            return (start.col == end.col).then_some(multiplier);
        }

        (multiplier == (end.col - start.col) * self.dir.col).then_some(multiplier)
    }
}

/// All long-range straight and diagonal rays (the queen's movement).
pub static QUEEN_DIRECTIONS: [AttackDirection; 8] = [
    AttackDirection::new(1, 0, 1 << 0),
    AttackDirection::new(-1, 0, 1 << 1),
    AttackDirection::new(0, 1, 1 << 2),
    AttackDirection::new(0, -1, 1 << 3),
    AttackDirection::new(1, 1, 1 << 4),
    AttackDirection::new(-1, -1, 1 << 5),
    AttackDirection::new(-1, 1, 1 << 6),
    AttackDirection::new(1, -1, 1 << 7),
];

/// All short-range king steps.
pub static KING_DIRECTIONS: [AttackDirection; 8] = [
    AttackDirection::new(1, 0, 1 << BITS_PER_GROUP),
    AttackDirection::new(-1, 0, 1 << (BITS_PER_GROUP + 1)),
    AttackDirection::new(0, 1, 1 << (BITS_PER_GROUP + 2)),
    AttackDirection::new(0, -1, 1 << (BITS_PER_GROUP + 3)),
    AttackDirection::new(1, 1, 1 << (BITS_PER_GROUP + 4)),
    AttackDirection::new(-1, -1, 1 << (BITS_PER_GROUP + 5)),
    AttackDirection::new(-1, 1, 1 << (BITS_PER_GROUP + 6)),
    AttackDirection::new(1, -1, 1 << (BITS_PER_GROUP + 7)),
];

/// All knight jumps.
pub static KNIGHT_DIRECTIONS: [AttackDirection; 8] = [
    AttackDirection::new(1, 2, 1 << (2 * BITS_PER_GROUP)),
    AttackDirection::new(-1, -2, 1 << (2 * BITS_PER_GROUP + 1)),
    AttackDirection::new(2, 1, 1 << (2 * BITS_PER_GROUP + 2)),
    AttackDirection::new(-2, -1, 1 << (2 * BITS_PER_GROUP + 3)),
    AttackDirection::new(-1, 2, 1 << (2 * BITS_PER_GROUP + 4)),
    AttackDirection::new(1, -2, 1 << (2 * BITS_PER_GROUP + 5)),
    AttackDirection::new(-2, 1, 1 << (2 * BITS_PER_GROUP + 6)),
    AttackDirection::new(2, -1, 1 << (2 * BITS_PER_GROUP + 7)),
];

/// Forward-diagonal pawn attacks (ally orientation).
pub static PAWN_DIRECTIONS: Lazy<[AttackDirection; 2]> =
    Lazy::new(|| [KING_DIRECTIONS[4], KING_DIRECTIONS[7]]);

/// Backward-diagonal pawn attacks, the mirror of [`PAWN_DIRECTIONS`].
pub static ANTI_PAWN_DIRECTIONS: Lazy<[AttackDirection; 2]> =
    Lazy::new(|| [KING_DIRECTIONS[5], KING_DIRECTIONS[6]]);

/// The diagonal half of the queen rays.
pub static BISHOP_DIRECTIONS: Lazy<[AttackDirection; 4]> = Lazy::new(|| {
    [
        QUEEN_DIRECTIONS[4],
        QUEEN_DIRECTIONS[5],
        QUEEN_DIRECTIONS[6],
        QUEEN_DIRECTIONS[7],
    ]
});

/// The straight half of the queen rays.
pub static ROOK_DIRECTIONS: Lazy<[AttackDirection; 4]> = Lazy::new(|| {
    [
        QUEEN_DIRECTIONS[0],
        QUEEN_DIRECTIONS[1],
        QUEEN_DIRECTIONS[2],
        QUEEN_DIRECTIONS[3],
    ]
});

/// The attack directions of a piece given its (full or minimal) rank
/// token. Rival tokens get the same ally-oriented tables; callers negate
/// the increments when propagating rival attacks.
pub fn attack_directions(piece_rank_token: i32) -> &'static [AttackDirection] {
    match piece::min_rank(piece_rank_token) {
        piece::PAWN => &*PAWN_DIRECTIONS,
        piece::BISHOP => &*BISHOP_DIRECTIONS,
        piece::ROOK => &*ROOK_DIRECTIONS,
        piece::KNIGHT => &KNIGHT_DIRECTIONS,
        piece::QUEEN => &QUEEN_DIRECTIONS,
        piece::KING => &KING_DIRECTIONS,
        _ => panic!("unknown piece token: {piece_rank_token}"),
    }
}

#[inline]
pub fn king_attack_directions() -> &'static [AttackDirection] {
    &KING_DIRECTIONS
}

#[inline]
pub fn pawn_attack_directions() -> &'static [AttackDirection] {
    &*PAWN_DIRECTIONS
}

/// Decodes the long-range component of an attack bit-set back into
/// directions. Short-range and knight bits do not need decoding: only
/// long-range attacks propagate through empty fields.
pub fn decode_long_range(encoded_attack_directions: i32) -> Vec<AttackDirection> {
    if (encoded_attack_directions & LONG_RANGE_GROUP_MASK) == 0 {
        return Vec::new();
    }

    QUEEN_DIRECTIONS
        .iter()
        .filter(|dir| (dir.token & encoded_attack_directions) != 0)
        .copied()
        .collect()
}

/// Compressed rendition of an attack bit-set for UI projections: the
/// long-range bits verbatim plus one bit per non-empty remaining group.
pub const fn compress(encoded_attack_directions: i32) -> i32 {
    (encoded_attack_directions & LONG_RANGE_GROUP_MASK)
        | (((encoded_attack_directions & SHORT_RANGE_GROUP_MASK) != 0) as i32) << BITS_PER_GROUP
        | (((encoded_attack_directions & KNIGHT_GROUP_MASK) != 0) as i32) << (BITS_PER_GROUP + 1)
}
