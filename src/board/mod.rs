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

//! The game state machinery.
//!
//! Two 8x8 games live here behind one uniform interface:
//!
//! * `checkers` — a 32-field dark-square board with mandatory captures,
//!   flying kings and mid-chain promotion stops.
//! * `chess` — a 64-field board whose every field carries incrementally
//!   maintained rival/ally attack bitmaps, so move legality and check
//!   detection never rescan the board.
//!
//! Both games express their state as a vector of integers, apply a move
//! and then *invert* the board (mirror it and swap the piece colors), so
//! the side to move always sees itself as the positive pieces and a
//! single value function covers both colors.
//!
//! The `state` module is the seam the learning side sees: a [`State`]
//! trait object produced from a [`StateSeed`], with an optional trace
//! recorder for deterministic replays. The `editor` module mutates a
//! board into an arbitrary legal configuration for UI-driven scenarios.

pub mod checkers;
pub mod chess;
pub mod editor;
pub mod moves;
pub mod position;
pub mod state;

pub use editor::StateEditor;
pub use moves::{Move, SubMove};
pub use position::PiecePosition;
pub use state::{GameState, State, StateHandle, StateSeed, StateTypeId, TraceRecorder};

/// Number of rows on the board.
pub const ROWS: i32 = 8;

/// Number of columns on the board.
pub const COLUMNS: i32 = ROWS;

/// Total number of fields on the board.
pub const FIELDS_COUNT: i32 = ROWS * COLUMNS;
