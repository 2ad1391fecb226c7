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
use std::fmt;
use std::ops::{Add, AddAssign, Div, Neg, Sub, SubAssign};

use super::{COLUMNS, ROWS};

/// Position of a piece on an 8x8 board, expressed as a signed (row, col)
/// pair. Out-of-range coordinates are representable on purpose: move
/// generation walks positions off the edge of the board and tests them
/// with [`PiecePosition::is_valid`].
///
/// The default value is the invalid position (-1, -1), used as the "no
/// capture" marker in [`super::SubMove`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PiecePosition {
    pub row: i32,
    pub col: i32,
}

impl Default for PiecePosition {
    fn default() -> Self {
        Self::invalid()
    }
}

impl PiecePosition {
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// The canonical invalid position.
    #[inline]
    pub const fn invalid() -> Self {
        Self { row: -1, col: -1 }
    }

    /// True iff both coordinates lie on the board.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.row >= 0 && self.row < ROWS && self.col >= 0 && self.col < COLUMNS
    }

    /// True iff the position sits on a playable (dark) square of a
    /// checkerboard: on the board with (row + col) odd.
    #[inline]
    pub const fn is_checkerboard_valid(&self) -> bool {
        self.is_valid() && (self.row + self.col) % 2 == 1
    }

    /// Mirrors the position through the board center, aligning it with the
    /// inverted rendition of a state.
    #[inline]
    pub const fn inverted(&self) -> Self {
        Self {
            row: ROWS - 1 - self.row,
            col: COLUMNS - 1 - self.col,
        }
    }

    /// True iff `other` lies on one of the two diagonals through `self`.
    #[inline]
    pub const fn same_diagonal(&self, other: &Self) -> bool {
        (self.row - other.row).abs() == (self.col - other.col).abs()
    }

    /// Linear field index for a position on the full 8x8 board.
    #[inline]
    pub const fn to_linear(&self) -> usize {
        (self.row * COLUMNS + self.col) as usize
    }

    /// Inverse of [`PiecePosition::to_linear`].
    #[inline]
    pub const fn from_linear(field_id: usize) -> Self {
        Self {
            row: field_id as i32 / COLUMNS,
            col: field_id as i32 % COLUMNS,
        }
    }
}

impl fmt::Display for PiecePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl Add for PiecePosition {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl AddAssign for PiecePosition {
    fn add_assign(&mut self, rhs: Self) {
        self.row += rhs.row;
        self.col += rhs.col;
    }
}

impl Sub for PiecePosition {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.row - rhs.row, self.col - rhs.col)
    }
}

impl SubAssign for PiecePosition {
    fn sub_assign(&mut self, rhs: Self) {
        self.row -= rhs.row;
        self.col -= rhs.col;
    }
}

impl Neg for PiecePosition {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.row, -self.col)
    }
}

impl Div<i32> for PiecePosition {
    type Output = Self;
    fn div(self, divisor: i32) -> Self {
        Self::new(self.row / divisor, self.col / divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(PiecePosition::new(0, 0).is_valid());
        assert!(PiecePosition::new(7, 7).is_valid());
        assert!(!PiecePosition::new(-1, 3).is_valid());
        assert!(!PiecePosition::new(3, 8).is_valid());
        assert!(!PiecePosition::invalid().is_valid());
    }

    #[test]
    fn test_checkerboard_validity() {
        assert!(PiecePosition::new(0, 1).is_checkerboard_valid());
        assert!(PiecePosition::new(1, 0).is_checkerboard_valid());
        assert!(!PiecePosition::new(0, 0).is_checkerboard_valid());
        assert!(!PiecePosition::new(7, 7).is_checkerboard_valid());
        assert!(!PiecePosition::new(8, 1).is_checkerboard_valid());
    }

    #[test]
    fn test_arithmetic() {
        let a = PiecePosition::new(2, 3);
        let b = PiecePosition::new(1, -1);
        assert_eq!(a + b, PiecePosition::new(3, 2));
        assert_eq!(a - b, PiecePosition::new(1, 4));
        assert_eq!(-b, PiecePosition::new(-1, 1));
        assert_eq!(PiecePosition::new(4, -2) / 2, PiecePosition::new(2, -1));
    }

    #[test]
    fn test_inversion_is_involution() {
        for row in 0..8 {
            for col in 0..8 {
                let pos = PiecePosition::new(row, col);
                assert_eq!(pos.inverted().inverted(), pos);
            }
        }
    }

    #[test]
    fn test_linear_round_trip() {
        for field_id in 0..64 {
            let pos = PiecePosition::from_linear(field_id);
            assert!(pos.is_valid());
            assert_eq!(pos.to_linear(), field_id);
        }
    }

    #[test]
    fn test_same_diagonal() {
        let a = PiecePosition::new(3, 3);
        assert!(a.same_diagonal(&PiecePosition::new(5, 5)));
        assert!(a.same_diagonal(&PiecePosition::new(0, 6)));
        assert!(!a.same_diagonal(&PiecePosition::new(3, 5)));
    }
}
