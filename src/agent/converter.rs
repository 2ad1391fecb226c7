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

use crate::board::chess::piece;
use crate::board::StateTypeId;

/// The supported int-vector-to-tensor conversions.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateConversionKind {
    /// An unusable placeholder (deserialization of ancient records).
    None,
    /// Identity copy of the 32 checkers tokens.
    #[default]
    CheckersStandard,
    /// Chess rank bits expanded into three ±1/0 channels, signed by the
    /// anti-piece flag.
    ChessStandard,
}

/// Stateless transform from an int-vector state to the network's input
/// tensor. Fully described — and serialized — by its kind tag.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateConverter {
    kind: StateConversionKind,
}

impl StateConverter {
    pub fn new(kind: StateConversionKind) -> Self {
        Self { kind }
    }

    /// The converter matching a state type.
    pub fn for_state_type(state_type_id: StateTypeId) -> Self {
        match state_type_id {
            StateTypeId::CHECKERS => Self::new(StateConversionKind::CheckersStandard),
            StateTypeId::CHESS => Self::new(StateConversionKind::ChessStandard),
            _ => panic!("no converter for {state_type_id:?}"),
        }
    }

    pub fn kind(&self) -> StateConversionKind {
        self.kind
    }

    /// Ratio between output and input dimensions.
    pub fn expansion_factor(&self) -> usize {
        match self.kind {
            StateConversionKind::None => panic!("uninitialized converter"),
            StateConversionKind::CheckersStandard => 1,
            StateConversionKind::ChessStandard => piece::RANK_BITS as usize,
        }
    }

    /// Converts `input` into `out`, replacing its previous content.
    pub fn convert(&self, input: &[i32], out: &mut Vec<f64>) {
        out.clear();
        match self.kind {
            StateConversionKind::None => panic!("uninitialized converter"),
            StateConversionKind::CheckersStandard => {
                out.extend(input.iter().map(|&token| f64::from(token)));
            }
            StateConversionKind::ChessStandard => {
                let channels = piece::RANK_BITS;
                out.reserve(input.len() * channels as usize);
                for &piece_token in input {
                    let positive = !piece::is_rival_piece(piece_token);
                    for channel_id in 0..channels {
                        let bit_present = f64::from((piece_token >> channel_id) & 1);
                        out.push(if positive { bit_present } else { -bit_present });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::checkers::CheckersState;
    use crate::board::chess::ChessState;

    #[test]
    fn test_checkers_conversion_is_identity() {
        let converter = StateConverter::for_state_type(StateTypeId::CHECKERS);
        assert_eq!(converter.expansion_factor(), 1);

        let state = CheckersState::start().to_vector();
        let mut out = Vec::new();
        converter.convert(&state, &mut out);
        assert_eq!(out.len(), state.len());
        for (tensor, token) in out.iter().zip(&state) {
            assert_eq!(*tensor, f64::from(*token));
        }
    }

    #[test]
    fn test_chess_conversion_expands_rank_bits() {
        let converter = StateConverter::for_state_type(StateTypeId::CHESS);
        assert_eq!(converter.expansion_factor(), 3);

        let state = ChessState::start().to_vector();
        let mut out = Vec::new();
        converter.convert(&state, &mut out);
        assert_eq!(out.len(), state.len() * 3);

        // An ally rook (rank 4 = 0b100) produces channels (0, 0, 1).
        let rook_field = 0;
        assert_eq!(out[rook_field * 3..rook_field * 3 + 3], [0.0, 0.0, 1.0]);
        // A rival pawn (rank 1) produces (-1, 0, 0).
        let rival_pawn_field = 48;
        assert_eq!(
            out[rival_pawn_field * 3..rival_pawn_field * 3 + 3],
            [-1.0, 0.0, 0.0]
        );
        // Spaces are all-zero.
        assert_eq!(out[24 * 3..24 * 3 + 3], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_converter_round_trips_by_kind() {
        let converter = StateConverter::new(StateConversionKind::ChessStandard);
        let encoded = bincode::serialize(&converter).unwrap();
        let decoded: StateConverter = bincode::deserialize(&encoded).unwrap();
        assert_eq!(converter, decoded);
    }
}
