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

//! Self-play TD(λ) training for checkers and chess agents.
//!
//! The crate trains board-game agents purely from game outcomes (plus a
//! small material-based shaping reward in checkers): a TD(λ) learner
//! with eligibility traces over an afterstate value function, coupled to
//! two 8x8 game state machines behind one uniform interface.
//!
//! The main pieces:
//!
//! * [`board`] — the checkers and chess state machines, the uniform
//!   [`board::State`] interface, trace recording and the position
//!   editor. The chess state maintains per-field attack bitmaps
//!   incrementally, so legality and check queries never rescan the
//!   board.
//! * [`agent`] — the players: [`agent::TdLambdaAgent`] (two per-color
//!   sub-agents around a feed-forward value network, optional TD-tree
//!   search, JSON scripting, versioned binary persistence),
//!   [`agent::EnsembleAgent`] (a voting committee of trained agents)
//!   and [`agent::RandomAgent`].
//! * [`game`] — the episode orchestrator with its callbacks,
//!   cancellation and the smart-training replay loop.
//! * [`train`] — round-based parallel training of a population,
//!   performance evaluation against a random player and outlier
//!   replacement.

pub mod agent;
pub mod board;
pub mod game;
pub mod train;

pub use agent::{
    Agent, AgentError, AgentIdentity, AgentTypeId, EnsembleAgent, GameResult, RandomAgent,
    TdLambdaAgent,
};
pub use board::{PiecePosition, State, StateEditor, StateSeed, StateTypeId};
pub use game::{Board, Callbacks, Outcome, Stats};
pub use train::{PerformanceRec, TrainingEngine};
