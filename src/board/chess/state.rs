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

use super::attack::{self, AttackDirection};
use super::moves::ChessMove;
use super::piece;
use crate::board::position::PiecePosition;
use crate::board::{FIELDS_COUNT, ROWS};

/// One field of the chess board: the piece token plus the bit-OR of all
/// attack tokens reaching the field from rival and from ally pieces.
///
/// Invariant: `rival_attack != 0` iff a rival piece threatens the field
/// with a path that stops at or before it; long-range attacks propagate
/// through empty fields and terminate at (and including) the first piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Field {
    pub piece: i32,
    pub rival_attack: i32,
    pub ally_attack: i32,
}

impl Field {
    fn new(piece: i32) -> Self {
        Self {
            piece,
            rival_attack: 0,
            ally_attack: 0,
        }
    }

    /// Assigns the inverted rendition of `other`: anti piece, attack maps
    /// swapped. Attack tokens are invariant under inversion because rival
    /// attacks are stored with ally-oriented tokens.
    fn assign_inverted(&mut self, other: &Field) {
        self.piece = piece::anti(other.piece);
        self.ally_attack = other.rival_attack;
        self.rival_attack = other.ally_attack;
    }

    fn add_attack_flag(&mut self, attack_flag: i32, rival_token: bool) {
        if rival_token {
            self.rival_attack |= attack_flag;
        } else {
            self.ally_attack |= attack_flag;
        }
    }

    fn remove_attack_flag(&mut self, attack_flag: i32, rival_token: bool) {
        if rival_token {
            self.rival_attack &= !attack_flag;
        } else {
            self.ally_attack &= !attack_flag;
        }
    }

    /// Plain projection: the piece token without attack data.
    fn to_int(&self) -> i32 {
        piece::full_rank(self.piece)
    }

    /// UI projection: the piece token with both attack maps compressed in.
    fn to_int_ui(&self) -> i32 {
        piece::full_rank(self.piece)
            | (attack::compress(self.rival_attack) << piece::TOKEN_BITS)
            | (attack::compress(self.ally_attack)
                << (attack::TOTAL_COMPRESSED_BITS + piece::TOKEN_BITS))
    }
}

/// State of the chess game: 64 fields with incrementally maintained
/// attack maps, plus a flag tracking whether the state is inverted with
/// respect to the initial orientation. The side to move always owns the
/// ally (positive) tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChessState {
    data: [Field; FIELDS_COUNT as usize],
    is_inverted: bool,
}

impl Default for ChessState {
    fn default() -> Self {
        Self::start()
    }
}

impl ChessState {
    /// Builds a state (attack maps included) from a 64-token board
    /// vector.
    pub fn new(board_state: &[i32], inverted: bool) -> Self {
        assert_eq!(
            board_state.len(),
            FIELDS_COUNT as usize,
            "unexpected state size"
        );

        let mut result = Self {
            data: [Field::default(); FIELDS_COUNT as usize],
            is_inverted: inverted,
        };
        for (field, &token) in result.data.iter_mut().zip(board_state) {
            *field = Field::new(token);
        }

        for field_id in 0..FIELDS_COUNT as usize {
            let field = result.data[field_id];
            if piece::is_space(field.piece) {
                continue;
            }
            let rival = piece::is_rival_piece(field.piece);
            result.commit_attack(
                attack::attack_directions(field.piece),
                &PiecePosition::from_linear(field_id),
                rival,
            );
        }

        result
    }

    /// The start configuration.
    pub fn start() -> Self {
        Self::new(&piece::init_board_state(), false)
    }

    #[inline]
    pub fn is_inverted(&self) -> bool {
        self.is_inverted
    }

    /// Fills `out_result` with the legal moves of the side to move and
    /// returns the draw flag: stalemate (no moves, king not attacked) or
    /// insufficient material (kings alone, or kings plus a single minor
    /// piece).
    pub fn moves(&self, out_result: &mut Vec<ChessMove>) -> bool {
        out_result.clear();

        let king_field_id = self.locate_king();
        let king_pos = PiecePosition::from_linear(king_field_id);

        self.append_king_moves(king_field_id, out_result);

        let mut piece_score_sum = 0;
        let mut alive_pieces_cnt = 0;

        for field_id in 0..FIELDS_COUNT as usize {
            alive_pieces_cnt += i32::from(self.is_piece(field_id));
            piece_score_sum += piece::min_rank(self.data[field_id].piece);

            if !self.is_ally(field_id) || field_id == king_field_id {
                continue;
            }

            if self.is_pawn(field_id) {
                self.append_pawn_moves(field_id, out_result, &king_pos);
                continue;
            }

            let attack_directions = attack::attack_directions(self.data[field_id].piece);
            self.append_moves(field_id, out_result, attack_directions, &king_pos);
        }

        piece_score_sum -= 2 * piece::KING;
        let stale_mate = out_result.is_empty() && !self.is_threatened(king_field_id);

        stale_mate
            || (alive_pieces_cnt <= 3
                && (piece_score_sum == 0
                    || piece_score_sum == piece::BISHOP
                    || piece_score_sum == piece::KNIGHT))
    }

    pub fn moves_vec(&self) -> Vec<ChessMove> {
        let mut result = Vec::new();
        self.moves(&mut result);
        result
    }

    /// Applies `mv`, keeping the attack maps consistent. Castling is one
    /// move but two piece motions.
    pub fn make_move(&mut self, mv: &ChessMove) {
        let second_component = self.compound_second_component(mv);
        self.apply_component(mv);

        if let Some(second) = second_component {
            self.apply_component(&second);
        }
    }

    pub fn make_move_and_invert(&mut self, mv: &ChessMove) {
        self.make_move(mv);
        self.invert();
    }

    /// Mirrors the board in place through its center, swapping piece
    /// colors and the two attack maps of every field.
    pub fn invert(&mut self) {
        let half = FIELDS_COUNT as usize / 2;
        for field_id in 0..half {
            let mirror_id = FIELDS_COUNT as usize - field_id - 1;
            let temp = self.data[field_id];
            let mirror = self.data[mirror_id];
            self.data[field_id].assign_inverted(&mirror);
            self.data[mirror_id].assign_inverted(&temp);
        }
        self.is_inverted = !self.is_inverted;
    }

    /// Int-vector projection of the state: full piece tokens, no attack
    /// data.
    pub fn to_vector(&self) -> Vec<i32> {
        self.data.iter().map(Field::to_int).collect()
    }

    pub fn to_vector_inverted(&self) -> Vec<i32> {
        let mut result = self.to_vector();
        invert_state_vector(&mut result);
        result
    }

    /// Int-vector projection after applying `mv`, without mutating the
    /// state. This is the afterstate the value network consumes.
    pub fn vector_after(&self, mv: &ChessMove) -> Vec<i32> {
        assert!(
            self.is_ally(mv.start_field_id as usize) && !self.is_ally(mv.finish_field_id as usize),
            "invalid move"
        );

        let mut result = self.to_vector();
        let second_component = self.compound_second_component(mv);

        apply_move_to_vector(&mut result, mv);
        if let Some(second) = second_component {
            apply_move_to_vector(&mut result, &second);
        }

        result
    }

    pub fn vector_after_inverted(&self, mv: &ChessMove) -> Vec<i32> {
        let mut result = self.vector_after(mv);
        invert_state_vector(&mut result);
        result
    }

    /// UI projection with compressed attack maps folded into each token.
    pub fn to_vector_64(&self) -> Vec<i32> {
        self.data.iter().map(Field::to_int_ui).collect()
    }

    pub fn to_vector_64_inverted(&self) -> Vec<i32> {
        let mut state_copy = self.clone();
        state_copy.invert();
        state_copy.to_vector_64()
    }

    /// Chess carries no shaping reward: the game outcome is the only
    /// training signal.
    pub fn calc_reward(_prev_state: &[i32], _next_state: &[i32]) -> f64 {
        0.0
    }

    /// True iff `mv` takes a piece.
    pub fn is_capture_move(&self, mv: &ChessMove) -> bool {
        assert!(
            self.is_ally(mv.start_field_id as usize) && !self.is_ally(mv.finish_field_id as usize),
            "invalid move"
        );
        self.is_rival(mv.finish_field_id as usize)
    }

    /// Index of the ally king's field. A mid-game board without an ally
    /// king indicates a move-generator bug.
    fn locate_king(&self) -> usize {
        self.data
            .iter()
            .position(|field| piece::is_king(field.piece))
            .expect("no ally king on the board")
    }

    fn apply_component(&mut self, mv: &ChessMove) {
        let start = mv.start();
        let finish = mv.finish();
        assert!(start.is_valid() && finish.is_valid(), "invalid move positions");

        let start_id = start.to_linear();
        let finish_id = finish.to_linear();
        let start_field = self.data[start_id];
        let finish_piece = self.data[finish_id].piece;

        assert!(
            !piece::is_rival_piece(start_field.piece),
            "only an ally piece can be moved"
        );
        assert!(
            !piece::is_ally_piece(finish_piece),
            "an ally piece cannot be captured"
        );

        // Lift the moving piece: re-propagate both sides' long-range rays
        // past the now-empty start square and withdraw the piece's own
        // attacks.
        self.commit_attack(&attack::decode_long_range(start_field.rival_attack), &start, true);
        self.withdraw_attack(attack::attack_directions(start_field.piece), &start, false);
        self.commit_attack(&attack::decode_long_range(start_field.ally_attack), &start, false);

        let moving_piece = mv.final_piece_rank(start_field.piece);
        self.data[start_id].piece = piece::SPACE;

        // On the finish square, withdraw either the captured piece's
        // outgoing attacks or the long-range rays that used to continue
        // past the (then empty) square.
        let rival_attacks_to_withdraw = if piece::is_rival_piece(finish_piece) {
            attack::attack_directions(finish_piece).to_vec()
        } else {
            attack::decode_long_range(self.data[finish_id].rival_attack)
        };
        self.withdraw_attack(&rival_attacks_to_withdraw, &finish, true);

        if piece::is_space(finish_piece) {
            let ally_attacks = attack::decode_long_range(self.data[finish_id].ally_attack);
            self.withdraw_attack(&ally_attacks, &finish, false);
        }

        self.commit_attack(attack::attack_directions(moving_piece), &finish, false);

        self.data[finish_id].piece = piece::min_rank(moving_piece);
    }

    fn commit_attack(
        &mut self,
        attack_directions: &[AttackDirection],
        position: &PiecePosition,
        rival: bool,
    ) {
        self.process_attack(attack_directions, position, rival, |field, token| {
            field.add_attack_flag(token, rival);
        });
    }

    fn withdraw_attack(
        &mut self,
        attack_directions: &[AttackDirection],
        position: &PiecePosition,
        rival: bool,
    ) {
        self.process_attack(attack_directions, position, rival, |field, token| {
            field.remove_attack_flag(token, rival);
        });
    }

    /// Applies `operation` to every field covered by the given attack
    /// directions from `position`. Rival attacks run with negated
    /// increments; long-range directions propagate through empty fields
    /// and stop at (including) the first piece.
    fn process_attack(
        &mut self,
        attack_directions: &[AttackDirection],
        position: &PiecePosition,
        negate_dir: bool,
        operation: impl Fn(&mut Field, i32),
    ) {
        for attack in attack_directions {
            let dir = if negate_dir { -attack.dir } else { attack.dir };

            let mut next_field_pos = *position + dir;
            if !next_field_pos.is_valid() {
                continue;
            }

            let mut next_field_id = next_field_pos.to_linear();
            operation(&mut self.data[next_field_id], attack.token);

            if attack.is_long_range() {
                while piece::is_space(self.data[next_field_id].piece) {
                    next_field_pos += dir;
                    if !next_field_pos.is_valid() {
                        break;
                    }
                    next_field_id = next_field_pos.to_linear();
                    operation(&mut self.data[next_field_id], attack.token);
                }
            }
        }
    }

    /// Decides whether the ally king would be attacked after the given
    /// move, without touching the attack maps. Accounts for rays the
    /// moving piece was blocking from the king and for attacks on the
    /// destination that no longer apply after a capture.
    fn is_king_threatened_after_move(
        &self,
        move_start_pos: &PiecePosition,
        move_finish_pos: &PiecePosition,
        king_field_pos: &PiecePosition,
    ) -> bool {
        assert!(
            move_start_pos.is_valid() && move_finish_pos.is_valid() && king_field_pos.is_valid(),
            "invalid positions"
        );

        let start_field = &self.data[move_start_pos.to_linear()];
        let finish_field = &self.data[move_finish_pos.to_linear()];

        assert!(
            piece::is_ally_piece(start_field.piece) && !piece::is_ally_piece(finish_field.piece),
            "impossible move"
        );

        let mut result = self.data[king_field_pos.to_linear()].rival_attack;

        let attack_directions_to_commit = attack::decode_long_range(start_field.rival_attack);
        let induced_attack =
            self.rival_attack_on_field(&attack_directions_to_commit, move_start_pos, king_field_pos);

        if induced_attack != 0 && result != 0 {
            // Already in check, and the moving piece is busy covering the
            // king from another ray.
            return true;
        }

        if induced_attack == 0 && result == 0 {
            return false;
        }

        if induced_attack != 0 {
            let covered_attack = attack::decode_long_range(induced_attack);
            assert_eq!(
                covered_attack.len(),
                1,
                "one piece cannot cover more than one ray to the king"
            );

            // A pinned piece may only move along the ray it is covering.
            let covered_attack_dir = covered_attack[0].dir;
            let move_dir = *move_finish_pos - *move_start_pos;
            return move_dir.col * covered_attack_dir.row != move_dir.row * covered_attack_dir.col;
        }

        let attack_directions_to_withdraw = if piece::is_rival_piece(finish_field.piece) {
            attack::attack_directions(finish_field.piece).to_vec()
        } else {
            attack::decode_long_range(finish_field.rival_attack)
        };

        result &= !self.rival_attack_on_field(
            &attack_directions_to_withdraw,
            move_finish_pos,
            king_field_pos,
        );

        result != 0
    }

    /// Token of the single direction from the given collection whose ray
    /// from `source_position` reaches `focus_field_pos` (with only empty
    /// fields in between), or zero.
    fn rival_attack_on_field(
        &self,
        rival_attack_directions: &[AttackDirection],
        source_position: &PiecePosition,
        focus_field_pos: &PiecePosition,
    ) -> i32 {
        for attack_dir in rival_attack_directions {
            let neg_attack_dir = AttackDirection {
                dir: -attack_dir.dir,
                token: attack_dir.token,
            };

            let Some(steps_count) = neg_attack_dir.can_reach(source_position, focus_field_pos)
            else {
                continue;
            };
            if steps_count <= 0 {
                continue;
            }

            if steps_count == 1 {
                return neg_attack_dir.token;
            }

            let mut next_pos = *source_position + neg_attack_dir.dir;
            while piece::is_space(self.data[next_pos.to_linear()].piece)
                && next_pos != *focus_field_pos
            {
                next_pos += neg_attack_dir.dir;
            }

            if next_pos == *focus_field_pos {
                return neg_attack_dir.token;
            }

            // At most one direction of a collection can point at the
            // focus field.
            return 0;
        }

        0
    }

    fn append_king_moves(&self, king_field_id: usize, moves: &mut Vec<ChessMove>) {
        let king_field = &self.data[king_field_id];
        assert!(piece::is_king(king_field.piece), "no ally king on the field");

        let start_pos = PiecePosition::from_linear(king_field_id);
        let is_check = self.is_threatened(king_field_id);

        // When in check, stepping along a checking ray keeps the king
        // inside it: such directions are dropped up front.
        let restricted;
        let attack_directions: &[AttackDirection] = if is_check {
            restricted = remove_same_directions(
                attack::king_attack_directions(),
                &attack::decode_long_range(king_field.rival_attack),
            );
            &restricted
        } else {
            attack::king_attack_directions()
        };

        for attack_dir in attack_directions {
            let finish_field_pos = start_pos + attack_dir.dir;
            if !finish_field_pos.is_valid() {
                continue;
            }
            let finish_field_id = finish_field_pos.to_linear();
            if self.is_threatened(finish_field_id) || self.is_ally(finish_field_id) {
                continue;
            }

            moves.push(ChessMove::new(
                king_field_id as i32,
                finish_field_id as i32,
                self.is_rival(finish_field_id),
            ));
        }

        // Castling. An initial-position king sits on field 3 or 4, so
        // both rook corners stay in range.
        if !piece::is_in_init_pos(king_field.piece) || self.is_threatened(king_field_id) {
            return;
        }

        let king = king_field_id as i32;

        if king >= 3
            && piece::is_in_init_pos(self.data[0].piece)
            && (self.is_space((king - 3) as usize) || king - 3 == 0)
            && self.is_space_and_not_threatened((king - 2) as usize)
            && self.is_space_and_not_threatened((king - 1) as usize)
        {
            moves.push(ChessMove::new(king, king - 2, false));
        }

        if king + 3 <= 7
            && piece::is_in_init_pos(self.data[7].piece)
            && self.is_space_and_not_threatened((king + 1) as usize)
            && self.is_space_and_not_threatened((king + 2) as usize)
            && (self.is_space((king + 3) as usize) || king + 3 == 7)
        {
            moves.push(ChessMove::new(king, king + 2, false));
        }
    }

    /// Pawn moves without promotion handling.
    fn append_pawn_moves_basic(
        &self,
        pawn_field_id: usize,
        moves: &mut Vec<ChessMove>,
        king_pos: &PiecePosition,
    ) {
        assert!(
            piece::is_pawn(self.data[pawn_field_id].piece),
            "no ally pawn on the field"
        );

        let start_pos = PiecePosition::from_linear(pawn_field_id);

        for attack_dir in attack::pawn_attack_directions() {
            let finish_pos = start_pos + attack_dir.dir;
            if !finish_pos.is_valid() {
                continue;
            }

            let finish_pos_lin = finish_pos.to_linear();
            if self.is_rival(finish_pos_lin)
                && !self.is_king_threatened_after_move(&start_pos, &finish_pos, king_pos)
            {
                moves.push(ChessMove::new(
                    pawn_field_id as i32,
                    finish_pos_lin as i32,
                    true,
                ));
            }
        }

        let mut finish_pos = start_pos;
        let possible_steps_forward = if finish_pos.row == 1 { 2 } else { 1 };

        for _ in 0..possible_steps_forward {
            finish_pos.row += 1;
            if !finish_pos.is_valid() {
                return;
            }

            let next_field_id = finish_pos.to_linear();
            if !self.is_space(next_field_id) {
                return;
            }

            if !self.is_king_threatened_after_move(&start_pos, &finish_pos, king_pos) {
                moves.push(ChessMove::new(
                    pawn_field_id as i32,
                    next_field_id as i32,
                    false,
                ));
            }
        }
    }

    /// Pawn moves with the promotion fan-out on the second-to-last row.
    fn append_pawn_moves(
        &self,
        pawn_field_id: usize,
        moves: &mut Vec<ChessMove>,
        king_pos: &PiecePosition,
    ) {
        const PROMOTION_OPTIONS: [i32; 4] =
            [piece::QUEEN, piece::BISHOP, piece::KNIGHT, piece::ROOK];

        let start_pos = PiecePosition::from_linear(pawn_field_id);
        if start_pos.row != ROWS - 2 {
            self.append_pawn_moves_basic(pawn_field_id, moves, king_pos);
            return;
        }

        let mut temp_moves = Vec::new();
        self.append_pawn_moves_basic(pawn_field_id, &mut temp_moves, king_pos);

        for temp_move in &temp_moves {
            for promo_option in PROMOTION_OPTIONS {
                moves.push(ChessMove::promotion(
                    temp_move.start_field_id,
                    temp_move.finish_field_id,
                    temp_move.is_capturing(),
                    promo_option,
                ));
            }
        }
    }

    /// Moves of a non-pawn, non-king piece along its attack directions.
    fn append_moves(
        &self,
        start_field_id: usize,
        moves: &mut Vec<ChessMove>,
        attack_directions: &[AttackDirection],
        king_pos: &PiecePosition,
    ) {
        let start_pos = PiecePosition::from_linear(start_field_id);

        for attack_dir in attack_directions {
            let mut finish_pos = start_pos + attack_dir.dir;

            if attack_dir.is_long_range() {
                while self.validate_and_append_move(&start_pos, &finish_pos, moves, king_pos) {
                    finish_pos += attack_dir.dir;
                }
            } else {
                self.validate_and_append_move(&start_pos, &finish_pos, moves, king_pos);
            }
        }
    }

    /// Validates a candidate move, appends it when legal, and reports
    /// whether walking further along the same direction makes sense.
    fn validate_and_append_move(
        &self,
        start_pos: &PiecePosition,
        finish_pos: &PiecePosition,
        moves: &mut Vec<ChessMove>,
        king_pos: &PiecePosition,
    ) -> bool {
        if !finish_pos.is_valid() {
            return false;
        }

        let finish_field_id = finish_pos.to_linear();
        if self.is_ally(finish_field_id) {
            return false;
        }

        if self.is_king_threatened_after_move(start_pos, finish_pos, king_pos) {
            // The move exposes the king, but squares further along the
            // direction may still be fine (the ray geometry can differ).
            return true;
        }

        moves.push(ChessMove::new(
            start_pos.to_linear() as i32,
            finish_field_id as i32,
            self.is_rival(finish_field_id),
        ));

        // A capture terminates a long-range walk.
        !self.is_rival(finish_field_id)
    }

    #[inline]
    fn is_ally(&self, field_id: usize) -> bool {
        piece::is_ally_piece(self.data[field_id].piece)
    }

    #[inline]
    fn is_rival(&self, field_id: usize) -> bool {
        piece::is_rival_piece(self.data[field_id].piece)
    }

    #[inline]
    fn is_piece(&self, field_id: usize) -> bool {
        piece::is_piece(self.data[field_id].piece)
    }

    #[inline]
    fn is_space(&self, field_id: usize) -> bool {
        piece::is_space(self.data[field_id].piece)
    }

    #[inline]
    fn is_space_and_not_threatened(&self, field_id: usize) -> bool {
        self.is_space(field_id) && !self.is_threatened(field_id)
    }

    #[inline]
    fn is_threatened(&self, field_id: usize) -> bool {
        self.data[field_id].rival_attack != 0
    }

    #[inline]
    fn is_pawn(&self, field_id: usize) -> bool {
        piece::is_pawn(self.data[field_id].piece)
    }

    fn is_castling_move(&self, mv: &ChessMove) -> bool {
        piece::is_king(self.data[mv.start_field_id as usize].piece)
            && (mv.start_field_id - mv.finish_field_id).abs() == 2
    }

    /// The rook component of a castling move, if `mv` is one.
    fn compound_second_component(&self, mv: &ChessMove) -> Option<ChessMove> {
        if !self.is_castling_move(mv) {
            return None;
        }

        Some(if mv.start_field_id - mv.finish_field_id > 0 {
            ChessMove::new(0, mv.finish_field_id + 1, false)
        } else {
            ChessMove::new(7, mv.finish_field_id - 1, false)
        })
    }

    /// Legal piece tokens the given field may take through editing. Kings
    /// are not offered: reset and clear are the only operations that
    /// place them, which keeps the one-ally-king invariant structural.
    pub fn edit_options(&self, pos: &PiecePosition) -> Vec<i32> {
        if !pos.is_valid() {
            return Vec::new();
        }
        let mut result = vec![piece::SPACE];
        for rank in [
            piece::PAWN,
            piece::BISHOP,
            piece::KNIGHT,
            piece::ROOK,
            piece::QUEEN,
        ] {
            result.push(rank);
        }
        for rank in [
            piece::PAWN,
            piece::BISHOP,
            piece::KNIGHT,
            piece::ROOK,
            piece::QUEEN,
        ] {
            result.push(piece::anti(rank));
        }
        result
    }

    /// Applies the edit option with the given index to the given field
    /// and rebuilds the attack maps.
    pub fn apply_edit_option(&mut self, pos: &PiecePosition, option_id: usize) {
        let options = self.edit_options(pos);
        assert!(option_id < options.len(), "invalid edit option id");

        let mut board = self.to_vector();
        board[pos.to_linear()] = options[option_id];
        *self = Self::new(&board, self.is_inverted);
    }

    /// Resets the edited board to the start configuration.
    pub fn reset_edit(&mut self) {
        *self = Self::start();
    }

    /// Removes everything but the two kings (on their initial fields).
    pub fn clear_edit(&mut self) {
        let mut board = vec![piece::SPACE; FIELDS_COUNT as usize];
        board[3] = piece::INIT_KING;
        board[59] = piece::anti(piece::INIT_KING);
        *self = Self::new(&board, false);
    }
}

/// Inverts a plain 64-token state vector in place.
pub(crate) fn invert_state_vector(state_vec: &mut [i32]) {
    let half = state_vec.len() / 2;
    for field_id in 0..half {
        let mirror_field_id = state_vec.len() - field_id - 1;
        let temp = state_vec[field_id];
        state_vec[field_id] = piece::anti(state_vec[mirror_field_id]);
        state_vec[mirror_field_id] = piece::anti(temp);
    }
}

fn apply_move_to_vector(state_vector: &mut [i32], mv: &ChessMove) {
    state_vector[mv.finish_field_id as usize] =
        piece::min_rank(mv.final_piece_rank(state_vector[mv.start_field_id as usize]));
    state_vector[mv.start_field_id as usize] = piece::SPACE;
}

/// Directions from `source` that are not opposite to any direction in
/// `dirs_to_check`; dropping "coinciding" directions provided that the
/// latter collection holds rival attack directions.
fn remove_same_directions(
    source: &[AttackDirection],
    dirs_to_check: &[AttackDirection],
) -> Vec<AttackDirection> {
    if dirs_to_check.is_empty() {
        return source.to_vec();
    }

    source
        .iter()
        .filter(|source_dir| {
            let op_source_dir = -source_dir.dir;
            dirs_to_check
                .iter()
                .all(|check_dir| check_dir.dir != op_source_dir)
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{thread_rng, Rng};

    /// Plays random games, invoking `functor` for every picked move, and
    /// checks that the exotic branches are actually exercised.
    fn run_standard_game_play_test(mut functor: impl FnMut(&mut ChessState, &ChessMove)) {
        let episodes_to_play = 50;

        let mut rng = thread_rng();
        let mut available_moves = Vec::new();
        let mut castling_moves_executed = 0;
        let mut finished_games = 0;
        let mut promotions = 0;

        for _ in 0..episodes_to_play {
            let mut state = ChessState::start();
            let mut round_id = 0;
            loop {
                let draw = state.moves(&mut available_moves);
                if round_id >= 1000 || draw || available_moves.is_empty() {
                    break;
                }

                let mv = available_moves[rng.gen_range(0..available_moves.len())];
                castling_moves_executed += i32::from(state.is_castling_move(&mv));
                promotions += i32::from(mv.final_rank != piece::SPACE);

                functor(&mut state, &mv);
                round_id += 1;
            }

            let draw = state.moves(&mut available_moves);
            finished_games += i32::from(draw || available_moves.is_empty());
            assert!(round_id >= 4, "no game can end in under four plies");
        }

        assert!(finished_games > 0, "no game reached a terminal state");
        assert!(promotions > 0, "no promotions were played");
        // Castling is rare in random play; the counter exists to keep the
        // branch observable when the episode count is raised.
        let _ = castling_moves_executed;
    }

    #[test]
    fn test_start_position_has_twenty_moves() {
        let state = ChessState::start();
        let mut moves = Vec::new();
        let draw = state.moves(&mut moves);
        assert!(!draw);
        assert_eq!(moves.len(), 20);
        assert_eq!(moves.iter().filter(|mv| mv.is_capturing()).count(), 0);
    }

    #[test]
    fn test_vector_after_matches_make_move() {
        run_standard_game_play_test(|state, mv| {
            let vector_with_move = state.vector_after(mv);
            let vector_with_move_inverted = state.vector_after_inverted(mv);

            state.make_move(mv);
            assert_eq!(vector_with_move, state.to_vector());
            state.invert();
            assert_eq!(vector_with_move_inverted, state.to_vector());
        });
    }

    #[test]
    fn test_incremental_attack_map_matches_rebuild() {
        run_standard_game_play_test(|state, mv| {
            state.make_move(mv);
            let check_state = ChessState::new(&state.to_vector(), state.is_inverted());
            assert_eq!(*state, check_state, "attack maps diverged from a rebuild");
            state.invert();
        });
    }

    #[test]
    fn test_inversion_is_involution() {
        let mut state = ChessState::start();
        let moves = state.moves_vec();
        state.make_move_and_invert(&moves[7]);

        let reference = state.clone();
        state.invert();
        state.invert();
        assert_eq!(state, reference);
    }

    #[test]
    fn test_fools_mate_is_a_checkmate() {
        // f3, e5, g4, Qh4# in the mirrored-file layout of this board:
        // every move is expressed from the side to move, with an
        // inversion after each.
        let mut state = ChessState::start();

        // In the mover's orientation the white king sits on file index 3
        // (e-file), so f = 2 and g = 1; after an inversion the black king
        // sits on file index 4, so black's d-file is 3 and h-file is 7.
        let mut play = |from: (i32, i32), to: (i32, i32)| {
            let moves = state.moves_vec();
            let mv = moves
                .iter()
                .find(|mv| {
                    mv.start() == PiecePosition::new(from.0, from.1)
                        && mv.finish() == PiecePosition::new(to.0, to.1)
                })
                .copied()
                .unwrap_or_else(|| panic!("move {from:?} -> {to:?} not found"));
            state.make_move_and_invert(&mv);
        };

        play((1, 2), (2, 2)); // f2-f3
        play((1, 4), (3, 4)); // e7-e5 (inverted orientation)
        play((1, 1), (3, 1)); // g2-g4
        play((0, 3), (4, 7)); // Qd8-h4 mate (inverted orientation)

        let mut moves = Vec::new();
        let draw = state.moves(&mut moves);
        assert!(moves.is_empty(), "the mated side must have no moves");
        assert!(!draw, "a checkmate is not a stalemate");
    }

    #[test]
    fn test_stalemate_is_a_draw() {
        // Ally king on (0, 0) boxed in by a rival queen on (2, 1), rival
        // king nearby: no moves, no check.
        let mut board = vec![piece::SPACE; FIELDS_COUNT as usize];
        board[0] = piece::KING;
        board[PiecePosition::new(2, 1).to_linear()] = piece::anti(piece::QUEEN);
        board[PiecePosition::new(2, 2).to_linear()] = piece::anti(piece::KING);
        let state = ChessState::new(&board, false);

        let mut moves = Vec::new();
        let draw = state.moves(&mut moves);
        assert!(moves.is_empty());
        assert!(draw, "a stalemate must report a draw");
    }

    #[test]
    fn test_insufficient_material_draws() {
        let mut board = vec![piece::SPACE; FIELDS_COUNT as usize];
        board[3] = piece::KING;
        board[59] = piece::anti(piece::KING);
        let kings_only = ChessState::new(&board, false);
        let mut moves = Vec::new();
        assert!(kings_only.moves(&mut moves), "bare kings must draw");
        assert!(!moves.is_empty());

        board[30] = piece::BISHOP;
        let with_bishop = ChessState::new(&board, false);
        assert!(with_bishop.moves(&mut moves), "a single minor piece draws");

        board[30] = piece::ROOK;
        let with_rook = ChessState::new(&board, false);
        assert!(!with_rook.moves(&mut moves), "a rook is mating material");
    }

    #[test]
    fn test_castling_both_sides() {
        // Back row cleared between the king and both rooks.
        let mut board = vec![piece::SPACE; FIELDS_COUNT as usize];
        board[0] = piece::INIT_ROOK;
        board[3] = piece::INIT_KING;
        board[7] = piece::INIT_ROOK;
        board[59] = piece::anti(piece::INIT_KING);
        let state = ChessState::new(&board, false);

        let moves = state.moves_vec();
        let castles: Vec<_> = moves.iter().filter(|mv| state.is_castling_move(mv)).collect();
        assert_eq!(castles.len(), 2);

        for castle in castles {
            let mut next = state.clone();
            next.make_move(castle);
            // The rook must have hopped over the king.
            let rook_field = if castle.finish_field_id < castle.start_field_id {
                castle.finish_field_id + 1
            } else {
                castle.finish_field_id - 1
            };
            assert_eq!(next.to_vector()[rook_field as usize], piece::ROOK);
            assert_eq!(
                next.to_vector()[castle.finish_field_id as usize],
                piece::KING
            );
        }
    }

    #[test]
    fn test_castling_blocked_by_attack() {
        // A rival rook sweeps the transit square of the left castle.
        let mut board = vec![piece::SPACE; FIELDS_COUNT as usize];
        board[0] = piece::INIT_ROOK;
        board[3] = piece::INIT_KING;
        board[PiecePosition::new(7, 2).to_linear()] = piece::anti(piece::ROOK);
        board[59] = piece::anti(piece::INIT_KING);
        let state = ChessState::new(&board, false);

        let moves = state.moves_vec();
        assert!(
            !moves.iter().any(|mv| state.is_castling_move(mv)),
            "castling through an attacked square must be rejected"
        );
    }

    #[test]
    fn test_pinned_piece_cannot_expose_the_king() {
        // Ally knight between the king and a rival rook on one file.
        let mut board = vec![piece::SPACE; FIELDS_COUNT as usize];
        board[PiecePosition::new(0, 3).to_linear()] = piece::KING;
        board[PiecePosition::new(3, 3).to_linear()] = piece::KNIGHT;
        board[PiecePosition::new(7, 3).to_linear()] = piece::anti(piece::ROOK);
        board[PiecePosition::new(7, 0).to_linear()] = piece::anti(piece::KING);
        let state = ChessState::new(&board, false);

        let moves = state.moves_vec();
        assert!(
            !moves
                .iter()
                .any(|mv| mv.start() == PiecePosition::new(3, 3)),
            "a pinned knight has no legal moves"
        );
    }

    #[test]
    fn test_promotion_fan_out() {
        let mut board = vec![piece::SPACE; FIELDS_COUNT as usize];
        board[PiecePosition::new(6, 5).to_linear()] = piece::PAWN;
        board[PiecePosition::new(0, 3).to_linear()] = piece::KING;
        board[PiecePosition::new(7, 0).to_linear()] = piece::anti(piece::KING);
        let state = ChessState::new(&board, false);

        let moves = state.moves_vec();
        let promotions: Vec<_> = moves
            .iter()
            .filter(|mv| mv.start() == PiecePosition::new(6, 5))
            .collect();
        assert_eq!(promotions.len(), 4);
        let mut ranks: Vec<i32> = promotions.iter().map(|mv| mv.final_rank).collect();
        ranks.sort_unstable();
        assert_eq!(
            ranks,
            vec![piece::BISHOP, piece::KNIGHT, piece::ROOK, piece::QUEEN]
        );
    }
}
