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

use super::moves::{Move, SubMove};
use super::position::PiecePosition;
use super::{COLUMNS, ROWS};

/// Number of playable fields in one board row.
pub const FIELDS_IN_ROW: i32 = COLUMNS / 2;

/// Number of playable (dark) fields on the board.
pub const CHECKERS_STATE_SIZE: usize = (ROWS * FIELDS_IN_ROW) as usize;

/// Piece token of the checkers game. The numeric value doubles as the
/// entry of the int-vector state projection; the anti-piece of a token is
/// its arithmetic negation.
///
/// `Captured` / `AntiCaptured` mark pieces taken earlier in an unfinished
/// capture chain: they block the path and cannot be captured again, but
/// are only removed once the whole chain has been applied. The trace
/// markers are reserved for board diagnostics overlays.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum Piece {
    AntiTraceMarker = -4,
    AntiCaptured = -3,
    AntiKing = -2,
    AntiMan = -1,
    #[default]
    Space = 0,
    Man = 1,
    King = 2,
    Captured = 3,
    TraceMarker = 4,
}

use Piece::{AntiCaptured, AntiKing, AntiMan, AntiTraceMarker, Captured, King, Man, Space, TraceMarker};

impl Piece {
    pub const MIN_VALUE: i32 = -4;
    pub const MAX_VALUE: i32 = 4;

    #[inline]
    pub const fn to_int(self) -> i32 {
        self as i32
    }

    pub const fn from_int(value: i32) -> Option<Self> {
        match value {
            -4 => Some(AntiTraceMarker),
            -3 => Some(AntiCaptured),
            -2 => Some(AntiKing),
            -1 => Some(AntiMan),
            0 => Some(Space),
            1 => Some(Man),
            2 => Some(King),
            3 => Some(Captured),
            4 => Some(TraceMarker),
            _ => None,
        }
    }

    /// The same piece seen from the other side of the board.
    #[inline]
    pub const fn anti(self) -> Self {
        match self {
            AntiTraceMarker => TraceMarker,
            AntiCaptured => Captured,
            AntiKing => King,
            AntiMan => Man,
            Space => Space,
            Man => AntiMan,
            King => AntiKing,
            Captured => AntiCaptured,
            TraceMarker => AntiTraceMarker,
        }
    }

    #[inline]
    pub const fn is_ally(self) -> bool {
        matches!(self, Man | King)
    }

    #[inline]
    pub const fn is_rival(self) -> bool {
        matches!(self, AntiMan | AntiKing)
    }

    #[inline]
    pub const fn is_alive(self) -> bool {
        self.is_ally() || self.is_rival()
    }

    #[inline]
    pub const fn is_king(self) -> bool {
        matches!(self, King | AntiKing)
    }

    #[inline]
    pub const fn is_trace_marker(self) -> bool {
        matches!(self, TraceMarker | AntiTraceMarker)
    }
}

/// Per-token piece counts of a state, used by the shaping reward.
#[derive(Debug, Clone, Copy, Default)]
struct StateScore {
    scores: [i32; (Piece::MAX_VALUE - Piece::MIN_VALUE + 1) as usize],
}

impl StateScore {
    fn of(state: &[i32]) -> Self {
        let mut result = Self::default();
        for &token in state {
            // Tokens outside the piece range indicate a corrupted state.
            assert!(
                (Piece::MIN_VALUE..=Piece::MAX_VALUE).contains(&token),
                "not a checkers piece token: {token}"
            );
            result.scores[(token - Piece::MIN_VALUE) as usize] += 1;
        }
        result
    }

    #[inline]
    fn get(&self, piece: Piece) -> i32 {
        self.scores[(piece.to_int() - Piece::MIN_VALUE) as usize]
    }

    fn diff(&self, other: &Self) -> Self {
        let mut result = Self::default();
        for (item, (a, b)) in result
            .scores
            .iter_mut()
            .zip(self.scores.iter().zip(other.scores.iter()))
        {
            *item = a - b;
        }
        result
    }
}

/// Move instruction for checkers: a start, a finish and the coordinates of
/// the captured pieces ordered along the chain.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct CheckersMove {
    pub(crate) start: PiecePosition,
    pub(crate) finish: PiecePosition,
    pub(crate) captures: Vec<PiecePosition>,
}

impl CheckersMove {
    pub(crate) fn new(start: PiecePosition, finish: PiecePosition) -> Self {
        Self {
            start,
            finish,
            captures: Vec::new(),
        }
    }

    pub(crate) fn with_captures(
        start: PiecePosition,
        finish: PiecePosition,
        captures: Vec<PiecePosition>,
    ) -> Self {
        Self {
            start,
            finish,
            captures,
        }
    }

    pub(crate) fn invalid() -> Self {
        Self::new(PiecePosition::invalid(), PiecePosition::invalid())
    }

    pub fn is_capturing(&self) -> bool {
        !self.captures.is_empty()
    }

    /// Extends the chain with a continuation that starts where this move
    /// ends.
    fn continue_with(&mut self, continuation: &CheckersMove) {
        assert_eq!(
            self.finish, continuation.start,
            "capture chain continuation must start at the current finish"
        );
        self.finish = continuation.finish;
        self.captures.extend_from_slice(&continuation.captures);
    }

    /// Splits the chain into its single-jump components. The intermediate
    /// landing squares are reconstructed from consecutive capture
    /// positions: the piece lands on the diagonal through the next capture,
    /// one square past the current one when both captures share a diagonal.
    fn to_sub_moves(&self) -> Vec<SubMove> {
        let mut result = Vec::with_capacity(self.captures.len().max(1));
        let mut prev_pos = self.start;

        for capture_id in 0..self.captures.len().saturating_sub(1) {
            let capture = self.captures[capture_id];
            let next_pos =
                intermediate_capture_position(prev_pos, capture, self.captures[capture_id + 1]);
            result.push(SubMove::with_capture(prev_pos, next_pos, capture));
            prev_pos = next_pos;
        }

        let mut final_sub_move = SubMove::new(prev_pos, self.finish);
        if let Some(&capture) = self.captures.last() {
            final_sub_move.capture = capture;
        }
        result.push(final_sub_move);

        result
    }

    pub fn to_move(&self) -> Move {
        Move::new(self.to_sub_moves())
    }
}

/// Landing square of a jump over `capture` when the next jump takes
/// `next_capture`: the intersection of the capture diagonal with the line
/// from the next capture, or the square right past the capture when both
/// captures share a diagonal.
fn intermediate_capture_position(
    prev_piece_pos: PiecePosition,
    capture_pos: PiecePosition,
    next_capture_pos: PiecePosition,
) -> PiecePosition {
    let v = capture_pos - prev_piece_pos;

    assert!(
        v.row.abs() == v.col.abs() && v.row != 0 && capture_pos != next_capture_pos,
        "piece position must be on the same diagonal as the capture"
    );

    let delta = v.col * v.col + v.row * v.row;
    let c_1 = prev_piece_pos.row * v.col - prev_piece_pos.col * v.row;
    let c_2 = next_capture_pos.row * v.row + next_capture_pos.col * v.col;
    let delta_row = c_1 * v.col + c_2 * v.row;
    let delta_col = c_2 * v.col - c_1 * v.row;

    assert!(
        delta_row % delta == 0 && delta_col % delta == 0,
        "captures do not define a landing square"
    );

    let result = PiecePosition::new(delta_row / delta, delta_col / delta);
    if result != next_capture_pos {
        return result;
    }

    // Both captures sit on one diagonal: land right past the first one.
    let capture_diff = next_capture_pos - capture_pos;
    assert!(
        capture_diff.col.abs() == capture_diff.row.abs() && capture_diff.col.abs() >= 2,
        "impossible to find a position between two captures"
    );

    capture_pos + v / v.row.abs()
}

/// State of the checkers game: 32 piece tokens indexed by playable (dark)
/// squares in row-major order, plus a flag tracking whether the state is
/// inverted with respect to the initial orientation. The side to move
/// always owns the positive tokens.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CheckersState {
    cells: [Piece; CHECKERS_STATE_SIZE],
    inverted: bool,
}

impl Default for CheckersState {
    fn default() -> Self {
        Self::start()
    }
}

impl CheckersState {
    pub fn new(cells: [Piece; CHECKERS_STATE_SIZE], inverted: bool) -> Self {
        Self { cells, inverted }
    }

    /// The start configuration: twelve men per side, side to move at the
    /// bottom.
    pub fn start() -> Self {
        let mut cells = [Space; CHECKERS_STATE_SIZE];
        for (field_id, cell) in cells.iter_mut().enumerate() {
            if field_id < 12 {
                *cell = Man;
            } else if field_id >= 20 {
                *cell = AntiMan;
            }
        }
        Self {
            cells,
            inverted: false,
        }
    }

    #[inline]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Linear playable-square index of a checkerboard-valid position.
    pub fn position_to_field_id(position: &PiecePosition) -> usize {
        assert!(
            position.is_checkerboard_valid(),
            "not a playable square: {position}"
        );
        Self::position_to_field_id_unchecked(position)
    }

    #[inline]
    fn position_to_field_id_unchecked(position: &PiecePosition) -> usize {
        let offset = position.col - i32::from(position.row % 2 == 0);
        (position.row * FIELDS_IN_ROW) as usize + (offset / 2) as usize
    }

    /// Inverse of [`CheckersState::position_to_field_id`].
    pub fn field_id_to_position(field_id: usize) -> PiecePosition {
        assert!(field_id < CHECKERS_STATE_SIZE, "invalid field id: {field_id}");
        let row = field_id as i32 / FIELDS_IN_ROW;
        let col = (field_id as i32 % FIELDS_IN_ROW) * 2 + i32::from(row % 2 == 0);
        PiecePosition::new(row, col)
    }

    #[inline]
    pub fn piece(&self, position: &PiecePosition) -> Piece {
        self.cells[Self::position_to_field_id(position)]
    }

    /// Mirrors the board in place, negating piece tokens, so that the
    /// other side becomes the (positive) side to move.
    pub fn invert(&mut self) {
        invert_cells(&mut self.cells);
        self.inverted = !self.inverted;
    }

    #[must_use]
    pub fn inverted_copy(&self) -> Self {
        let mut result = self.clone();
        result.invert();
        result
    }

    /// Int-vector projection of the state: a copy of the 32 tokens.
    pub fn to_vector(&self) -> Vec<i32> {
        self.cells.iter().map(|piece| piece.to_int()).collect()
    }

    pub fn to_vector_inverted(&self) -> Vec<i32> {
        let mut result = self.to_vector();
        invert_cells(&mut result);
        result
    }

    /// Int-vector projection after applying `mv`, without mutating the
    /// state. This is the afterstate the value network consumes.
    pub fn vector_after(&self, mv: &CheckersMove) -> Vec<i32> {
        let mut result = self.to_vector();
        apply_move_to_cells(&mut result, mv, true);
        result
    }

    pub fn vector_after_inverted(&self, mv: &CheckersMove) -> Vec<i32> {
        let mut result = self.vector_after(mv);
        invert_cells(&mut result);
        result
    }

    /// 64-element projection placing each token at its full-board
    /// coordinate (zeros on the light squares).
    pub fn to_vector_64(&self) -> Vec<i32> {
        expand_to_64(&self.to_vector())
    }

    pub fn to_vector_64_inverted(&self) -> Vec<i32> {
        expand_to_64(&self.to_vector_inverted())
    }

    /// Shaping reward for a state transition, from the difference of the
    /// material scores.
    pub fn calc_reward(prev_state: &[i32], next_state: &[i32]) -> f64 {
        let diff = StateScore::of(next_state).diff(&StateScore::of(prev_state));

        (2.0 * f64::from(diff.get(King)) + f64::from(diff.get(Man))
            - f64::from(diff.get(AntiMan))
            - 2.0 * f64::from(diff.get(AntiKing)))
            / 50.0
    }

    /// Fills `out_result` with the legal moves of the side to move.
    /// Returns the draw flag, which is always `false`: there is no drawn
    /// position in checkers, only the orchestrator's capture-less cap.
    pub fn moves(&self, out_result: &mut Vec<CheckersMove>) -> bool {
        self.capturing_moves(out_result);
        if out_result.is_empty() {
            self.non_capturing_moves(out_result);
        }
        false
    }

    pub fn moves_vec(&self) -> Vec<CheckersMove> {
        let mut result = Vec::new();
        self.moves(&mut result);
        result
    }

    /// Applies `mv`. With `remove_captured` unset the captured pieces stay
    /// on the board as markers, which is how unfinished capture chains
    /// forbid taking the same piece twice.
    fn apply(&mut self, mv: &CheckersMove, remove_captured: bool) {
        debug_assert!(self.is_valid_move(&mv.to_sub_moves()), "invalid move");
        apply_move_to_pieces(&mut self.cells, mv, remove_captured);
    }

    pub fn make_move(&mut self, mv: &CheckersMove) {
        self.apply(mv, true);
    }

    pub fn make_move_and_invert(&mut self, mv: &CheckersMove) {
        self.make_move(mv);
        self.invert();
    }

    fn capturing_moves(&self, out_result: &mut Vec<CheckersMove>) {
        out_result.clear();
        for field_id in 0..CHECKERS_STATE_SIZE {
            if !self.cells[field_id].is_ally() {
                continue;
            }
            self.piece_capturing_moves(&Self::field_id_to_position(field_id), out_result);
        }
    }

    fn non_capturing_moves(&self, out_result: &mut Vec<CheckersMove>) {
        out_result.clear();
        for field_id in 0..CHECKERS_STATE_SIZE {
            let piece = self.cells[field_id];
            if !piece.is_ally() {
                continue;
            }
            let start_pos = Self::field_id_to_position(field_id);
            for right_diagonal in [false, true] {
                for positive_direction in [false, true] {
                    if piece == Man && !positive_direction {
                        continue; // a man cannot move backwards
                    }
                    self.directed_quiet_moves(
                        &start_pos,
                        right_diagonal,
                        positive_direction,
                        out_result,
                    );
                }
            }
        }
    }

    /// Appends all complete capture chains of the piece on `start_pos`.
    fn piece_capturing_moves(&self, start_pos: &PiecePosition, out_result: &mut Vec<CheckersMove>) {
        let piece = self.piece(start_pos);
        assert!(piece.is_ally(), "no ally piece on {start_pos}");

        for right_diagonal in [false, true] {
            for positive_direction in [false, true] {
                let base_moves =
                    self.directed_capturing_moves(start_pos, right_diagonal, positive_direction);

                if base_moves.is_empty() {
                    continue;
                }

                if piece == Man {
                    assert_eq!(
                        base_moves.len(),
                        1,
                        "a man has a single landing square per direction"
                    );
                    if base_moves[0].finish.row == ROWS - 1 {
                        // Promoted mid-capture: the new king must stop.
                        out_result.push(base_moves[0].clone());
                        continue;
                    }
                }

                for base_move in &base_moves {
                    let mut state_copy = self.clone();
                    state_copy.apply(base_move, false);

                    let mut continuations = Vec::new();
                    state_copy.piece_capturing_moves(&base_move.finish, &mut continuations);

                    out_result.push(base_move.clone());
                    for continuation in &continuations {
                        let mut chained = base_move.clone();
                        chained.continue_with(continuation);
                        out_result.push(chained);
                    }
                }
            }
        }
    }

    /// Single-jump captures of one piece along one diagonal direction:
    /// walk out (one square for a man, any distance for a king), find a
    /// rival piece, and emit one move per empty landing square past it.
    fn directed_capturing_moves(
        &self,
        start_pos: &PiecePosition,
        right_diagonal: bool,
        positive_direction: bool,
    ) -> Vec<CheckersMove> {
        let piece = self.piece(start_pos);
        assert!(piece.is_ally(), "no ally piece on {start_pos}");

        let step = if positive_direction { 1 } else { -1 };
        let max_search_dist = if piece == Man { 1 } else { i32::MAX };
        let mut search_dist = 0;
        let mut temp_pos;

        loop {
            search_dist += step;
            temp_pos = diagonal_step(start_pos, search_dist, right_diagonal);
            if search_dist.abs() >= max_search_dist
                || !temp_pos.is_checkerboard_valid()
                || self.piece(&temp_pos) != Space
            {
                break;
            }
        }

        if !temp_pos.is_checkerboard_valid() || !self.piece(&temp_pos).is_rival() {
            return Vec::new(); // nothing to capture
        }

        let pos_to_capture = temp_pos;
        let mut result = Vec::new();

        loop {
            search_dist += step;
            temp_pos = diagonal_step(start_pos, search_dist, right_diagonal);

            if temp_pos.is_checkerboard_valid() && self.piece(&temp_pos) == Space {
                result.push(CheckersMove::with_captures(
                    *start_pos,
                    temp_pos,
                    vec![pos_to_capture],
                ));
            } else {
                break;
            }

            if search_dist.abs() >= max_search_dist {
                break;
            }
        }

        result
    }

    /// Quiet moves of one piece along one diagonal direction.
    fn directed_quiet_moves(
        &self,
        start_pos: &PiecePosition,
        right_diagonal: bool,
        positive_direction: bool,
        out_result: &mut Vec<CheckersMove>,
    ) {
        let piece = self.piece(start_pos);
        assert!(piece.is_ally(), "no ally piece on {start_pos}");

        let step = if positive_direction { 1 } else { -1 };
        let max_search_dist = if piece == Man { 1 } else { i32::MAX };
        let mut search_dist = 0;

        loop {
            search_dist += step;
            let temp_pos = diagonal_step(start_pos, search_dist, right_diagonal);

            if !temp_pos.is_checkerboard_valid() || self.piece(&temp_pos) != Space {
                break;
            }
            out_result.push(CheckersMove::new(*start_pos, temp_pos));

            if search_dist.abs() >= max_search_dist {
                break;
            }
        }
    }

    /// Diagnostics check: re-validates a move expressed as sub-moves
    /// against the current board.
    pub(crate) fn is_valid_move(&self, sub_moves: &[SubMove]) -> bool {
        if !is_valid_sub_move_chain(sub_moves) {
            return false;
        }

        let piece = self.piece(&sub_moves[0].start);
        if !piece.is_ally() {
            return false;
        }

        for sub_move in sub_moves {
            let capture = sub_move.capture;
            if capture.is_valid() && !self.piece(&capture).is_rival() {
                return false;
            }

            if piece == Man {
                let dist = (sub_move.start.row - sub_move.end.row).abs();
                let expected = if capture.is_valid() { 2 } else { 1 };
                if dist != expected || (sub_move.start.col - sub_move.end.col).abs() != expected {
                    return false;
                }
            }

            let mut temp = sub_move.start;
            loop {
                temp = diagonal_step_towards(&temp, 1, &sub_move.end);
                if !temp.is_checkerboard_valid() {
                    return false;
                }
                let current = self.piece(&temp);
                // A rival piece on the path must be the captured one; an
                // ally piece must be the one that is moving (a chain may
                // cross its own start square); markers block everything.
                if (current.is_rival() && sub_move.capture != temp)
                    || (current.is_ally() && temp != sub_moves[0].start)
                    || (current != Space && !current.is_rival() && !current.is_ally())
                {
                    return false;
                }
                if temp == sub_move.end {
                    break;
                }
            }
        }

        true
    }

    /// Legal piece tokens the given square may take through editing.
    /// Playable squares accept any live piece or space; the rest of the
    /// board stays empty.
    pub fn edit_options(&self, pos: &PiecePosition) -> Vec<i32> {
        if !pos.is_checkerboard_valid() {
            return Vec::new();
        }
        [Space, Man, King, AntiMan, AntiKing]
            .iter()
            .map(|piece| piece.to_int())
            .collect()
    }

    /// Applies the edit option with the given index to the given square.
    pub fn apply_edit_option(&mut self, pos: &PiecePosition, option_id: usize) {
        let options = self.edit_options(pos);
        assert!(option_id < options.len(), "invalid edit option id");
        self.cells[Self::position_to_field_id(pos)] =
            Piece::from_int(options[option_id]).expect("edit options are piece tokens");
    }

    /// Resets the edited board to the start configuration.
    pub fn reset_edit(&mut self) {
        *self = Self::start();
    }

    /// Removes every piece from the board.
    pub fn clear_edit(&mut self) {
        self.cells = [Space; CHECKERS_STATE_SIZE];
        self.inverted = false;
    }
}

/// One diagonal step helper: `step` squares from `start_pos` along the
/// chosen diagonal.
fn diagonal_step(start_pos: &PiecePosition, step: i32, right_diagonal: bool) -> PiecePosition {
    PiecePosition::new(
        start_pos.row + step,
        if right_diagonal {
            start_pos.col + step
        } else {
            start_pos.col - step
        },
    )
}

/// `step` squares from `start_pos` towards `pointer`, which must share a
/// diagonal with it.
fn diagonal_step_towards(
    start_pos: &PiecePosition,
    step: i32,
    pointer: &PiecePosition,
) -> PiecePosition {
    assert!(
        start_pos.same_diagonal(pointer) && start_pos != pointer,
        "pointer must sit on the same diagonal"
    );
    let row_dir = (pointer.row - start_pos.row).signum();
    let col_dir = (pointer.col - start_pos.col).signum();
    PiecePosition::new(start_pos.row + row_dir * step, start_pos.col + col_dir * step)
}

fn is_valid_sub_move(sub_move: &SubMove) -> bool {
    sub_move.start != sub_move.end
        && sub_move.start != sub_move.capture
        && sub_move.end != sub_move.capture
        && sub_move.start.same_diagonal(&sub_move.end)
        && (!sub_move.capture.is_valid()
            || (sub_move.start.same_diagonal(&sub_move.capture)
                && sub_move.end.same_diagonal(&sub_move.capture)))
}

fn is_valid_sub_move_chain(sub_moves: &[SubMove]) -> bool {
    if sub_moves.is_empty() || sub_moves.iter().any(|sub_move| !is_valid_sub_move(sub_move)) {
        return false;
    }

    // Only a single capture-less sub-move may lack a capture position.
    if sub_moves.len() > 1 && sub_moves.iter().any(|sub_move| !sub_move.capture.is_valid()) {
        return false;
    }

    sub_moves
        .windows(2)
        .all(|pair| pair[1].start == pair[0].end)
}

fn invert_cells<T: InvertibleCell>(cells: &mut [T]) {
    let half = cells.len() / 2;
    for field_id in 0..half {
        let mirror_id = cells.len() - 1 - field_id;
        let temp = cells[field_id];
        cells[field_id] = cells[mirror_id].anti_cell();
        cells[mirror_id] = temp.anti_cell();
    }
}

fn apply_move_to_pieces(cells: &mut [Piece; CHECKERS_STATE_SIZE], mv: &CheckersMove, remove_captured: bool) {
    for capture_pos in &mv.captures {
        if capture_pos.is_valid() {
            cells[CheckersState::position_to_field_id_unchecked(capture_pos)] =
                if remove_captured { Space } else { AntiCaptured };
        }
    }

    let start_id = CheckersState::position_to_field_id_unchecked(&mv.start);
    let mut piece_to_move = cells[start_id];

    // A man that visits the last row becomes a king.
    if piece_to_move == Man && mv.finish.row == ROWS - 1 {
        piece_to_move = King;
    }

    cells[CheckersState::position_to_field_id_unchecked(&mv.finish)] = piece_to_move;
    cells[start_id] = Space;
}

fn apply_move_to_cells(cells: &mut [i32], mv: &CheckersMove, remove_captured: bool) {
    for capture_pos in &mv.captures {
        if capture_pos.is_valid() {
            cells[CheckersState::position_to_field_id_unchecked(capture_pos)] =
                if remove_captured { Space } else { AntiCaptured }.to_int();
        }
    }

    let start_id = CheckersState::position_to_field_id_unchecked(&mv.start);
    let mut piece_to_move = cells[start_id];

    if piece_to_move == Man.to_int() && mv.finish.row == ROWS - 1 {
        piece_to_move = King.to_int();
    }

    cells[CheckersState::position_to_field_id_unchecked(&mv.finish)] = piece_to_move;
    cells[start_id] = Space.to_int();
}

fn expand_to_64(state_vec: &[i32]) -> Vec<i32> {
    let mut result = vec![0; state_vec.len() * 2];
    for (field_id, &token) in state_vec.iter().enumerate() {
        let pos = CheckersState::field_id_to_position(field_id);
        result[(pos.row * COLUMNS + pos.col) as usize] = token;
    }
    result
}

trait InvertibleCell: Copy {
    fn anti_cell(self) -> Self;
}

impl InvertibleCell for Piece {
    fn anti_cell(self) -> Self {
        self.anti()
    }
}

impl InvertibleCell for i32 {
    fn anti_cell(self) -> Self {
        -self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_id_round_trip() {
        for field_id in 0..CHECKERS_STATE_SIZE {
            let pos = CheckersState::field_id_to_position(field_id);
            assert!(pos.is_checkerboard_valid());
            assert_eq!(CheckersState::position_to_field_id(&pos), field_id);
        }
    }

    #[test]
    fn test_start_position_has_seven_quiet_moves() {
        let state = CheckersState::start();
        let moves = state.moves_vec();
        assert_eq!(moves.len(), 7);
        assert!(moves.iter().all(|mv| !mv.is_capturing()));
        // No man may reach the last row with an opening move.
        assert!(moves.iter().all(|mv| mv.finish.row < ROWS - 1));
    }

    #[test]
    fn test_inversion_is_involution() {
        let mut state = CheckersState::start();
        let moves = state.moves_vec();
        state.make_move_and_invert(&moves[3]);

        let reference = state.clone();
        state.invert();
        assert_ne!(state, reference);
        state.invert();
        assert_eq!(state, reference);
    }

    #[test]
    fn test_vector_inversion_matches_state_inversion() {
        let state = CheckersState::start();
        let inverted_vec = state.to_vector_inverted();
        assert_eq!(inverted_vec, state.inverted_copy().to_vector());
    }

    #[test]
    fn test_mandatory_capture_suppresses_quiet_moves() {
        let mut cells = [Space; CHECKERS_STATE_SIZE];
        cells[CheckersState::position_to_field_id(&PiecePosition::new(2, 1))] = Man;
        cells[CheckersState::position_to_field_id(&PiecePosition::new(3, 2))] = AntiMan;
        cells[CheckersState::position_to_field_id(&PiecePosition::new(0, 1))] = Man;
        let state = CheckersState::new(cells, false);

        let moves = state.moves_vec();
        assert!(!moves.is_empty());
        assert!(moves.iter().all(CheckersMove::is_capturing));
        assert!(moves
            .iter()
            .all(|mv| mv.captures == vec![PiecePosition::new(3, 2)]));
    }

    #[test]
    fn test_man_capture_chain() {
        // A man on (2, 1) can jump (3, 2) and then (5, 4), or stop after
        // the first jump.
        let mut cells = [Space; CHECKERS_STATE_SIZE];
        cells[CheckersState::position_to_field_id(&PiecePosition::new(2, 1))] = Man;
        cells[CheckersState::position_to_field_id(&PiecePosition::new(3, 2))] = AntiMan;
        cells[CheckersState::position_to_field_id(&PiecePosition::new(5, 4))] = AntiMan;
        let state = CheckersState::new(cells, false);

        let moves = state.moves_vec();
        let chain = moves
            .iter()
            .find(|mv| mv.captures.len() == 2)
            .expect("double capture must be generated");
        assert_eq!(chain.finish, PiecePosition::new(6, 5));
        assert!(moves.iter().any(|mv| mv.captures.len() == 1));
    }

    #[test]
    fn test_capture_chain_cannot_take_a_piece_twice() {
        // Four rival men around a square lattice would let a king loop
        // forever if captured pieces were removed mid-chain.
        let mut cells = [Space; CHECKERS_STATE_SIZE];
        cells[CheckersState::position_to_field_id(&PiecePosition::new(0, 1))] = King;
        for rival in [
            PiecePosition::new(1, 2),
            PiecePosition::new(3, 2),
            PiecePosition::new(1, 4),
            PiecePosition::new(3, 4),
        ] {
            cells[CheckersState::position_to_field_id(&rival)] = AntiMan;
        }
        let state = CheckersState::new(cells, false);

        let moves = state.moves_vec();
        assert!(moves.iter().all(|mv| mv.captures.len() <= 4));
        for mv in &moves {
            for (i, a) in mv.captures.iter().enumerate() {
                assert!(
                    mv.captures[i + 1..].iter().all(|b| a != b),
                    "piece captured twice"
                );
            }
        }
    }

    #[test]
    fn test_man_promoted_mid_chain_stops() {
        // Jumping to the last row promotes and ends the move even though
        // another capture would be available to a king.
        let mut cells = [Space; CHECKERS_STATE_SIZE];
        cells[CheckersState::position_to_field_id(&PiecePosition::new(5, 2))] = Man;
        cells[CheckersState::position_to_field_id(&PiecePosition::new(6, 3))] = AntiMan;
        cells[CheckersState::position_to_field_id(&PiecePosition::new(6, 5))] = AntiMan;
        let state = CheckersState::new(cells, false);

        let moves = state.moves_vec();
        assert!(moves.iter().all(|mv| mv.captures.len() == 1));
        let promotion = moves
            .iter()
            .find(|mv| mv.finish == PiecePosition::new(7, 4))
            .expect("promotion jump must exist");

        let mut next = state.clone();
        next.make_move(promotion);
        assert_eq!(next.piece(&PiecePosition::new(7, 4)), King);
    }

    #[test]
    fn test_quiet_promotion() {
        let mut cells = [Space; CHECKERS_STATE_SIZE];
        cells[CheckersState::position_to_field_id(&PiecePosition::new(6, 1))] = Man;
        let state = CheckersState::new(cells, false);

        let moves = state.moves_vec();
        assert_eq!(moves.len(), 2);
        for mv in &moves {
            let mut next = state.clone();
            next.make_move(mv);
            assert_eq!(next.piece(&mv.finish), King);
        }
    }

    #[test]
    fn test_reward_is_material_difference() {
        let prev = CheckersState::start().to_vector();
        let mut next = prev.clone();
        // The mover loses nothing, the rival loses a man and a king.
        next[20] = Space.to_int();
        next[21] = Space.to_int();
        next[22] = AntiKing.to_int();
        next[23] = Space.to_int();

        let reward = CheckersState::calc_reward(&prev, &next);
        // Four anti-men left the board and one anti-king appeared:
        // (-(-4) - 2 * 1) / 50.
        assert!((reward - 2.0 / 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_sub_move_round_trip() {
        let mv = CheckersMove::with_captures(
            PiecePosition::new(2, 1),
            PiecePosition::new(6, 5),
            vec![PiecePosition::new(3, 2), PiecePosition::new(5, 4)],
        );
        let sub_moves = mv.to_move().sub_moves;
        assert_eq!(sub_moves.len(), 2);
        assert_eq!(sub_moves[0].start, PiecePosition::new(2, 1));
        assert_eq!(sub_moves[0].end, PiecePosition::new(4, 3));
        assert_eq!(sub_moves[0].capture, PiecePosition::new(3, 2));
        assert_eq!(sub_moves[1].end, PiecePosition::new(6, 5));
    }

    #[test]
    fn test_edit_cycle() {
        let mut state = CheckersState::start();
        state.clear_edit();
        assert!(state.to_vector().iter().all(|&token| token == 0));

        let pos = PiecePosition::new(4, 3);
        let options = state.edit_options(&pos);
        let king_id = options
            .iter()
            .position(|&token| token == King.to_int())
            .unwrap();
        state.apply_edit_option(&pos, king_id);
        assert_eq!(state.piece(&pos), King);

        state.reset_edit();
        assert_eq!(state, CheckersState::start());
    }
}
