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

//! The chess state machine.
//!
//! The distinguishing feature of this implementation is the per-field
//! attack map: every field stores the bit-OR of all attack-direction
//! tokens reaching it from rival and from ally pieces, maintained
//! incrementally as moves are applied. Move legality and check detection
//! are then bit tests instead of board scans.

pub mod attack;
pub mod moves;
pub mod piece;
mod state;

pub use moves::ChessMove;
pub(crate) use state::invert_state_vector;
pub use state::{ChessState, Field};
