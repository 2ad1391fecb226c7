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

//! The agents.
//!
//! The open set of players — random, TD(λ), ensemble — sits behind the
//! [`Agent`] trait the board orchestrator drives. The TD(λ) learner is
//! split into an outer agent (network, hyperparameters, persistence,
//! optional tree search) and two per-color sub-agents carrying the
//! eligibility traces.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use uuid::Uuid;

pub mod adapter;
pub mod collector;
pub mod converter;
pub mod ensemble;
pub mod net;
pub mod random;
pub mod settings;
pub mod sub_agent;
pub mod td_agent;

pub use adapter::TdlTrainingAdapter;
pub use collector::{MoveCollector, MoveData};
pub use converter::{StateConversionKind, StateConverter};
pub use ensemble::EnsembleAgent;
pub use net::{Cost, LayerGradient, Mlp, NetContext, NetWithConverter, ValueNet};
pub use random::RandomAgent;
pub use settings::TdlSettings;
pub use sub_agent::{reset_explorer, TdLambdaSubAgent};
pub use td_agent::{SearchMethod, TdLambdaAgent, TrainingSubMode};

use crate::board::{State, StateTypeId};

/// Result of an episode from one agent's perspective.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Victory,
    Loss,
    Draw,
}

impl GameResult {
    /// The ±1/0 training signal.
    #[inline]
    pub const fn to_int(self) -> i32 {
        match self {
            Self::Victory => 1,
            Self::Loss => -1,
            Self::Draw => 0,
        }
    }
}

/// Type tag of an agent, used by the polymorphic pack format.
#[derive(Debug, Serialize, Deserialize, Display, Clone, Copy, PartialEq, Eq)]
pub enum AgentTypeId {
    #[strum(serialize = "UNKNOWN")]
    Unknown,
    #[strum(serialize = "RANDOM")]
    Random,
    #[strum(serialize = "TDL")]
    Tdl,
    #[strum(serialize = "INTERACTIVE")]
    Interactive,
    #[strum(serialize = "TDL_ENSEMBLE")]
    TdlEnsemble,
}

impl AgentTypeId {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "RANDOM" => Self::Random,
            "TDL" => Self::Tdl,
            "INTERACTIVE" => Self::Interactive,
            "TDL_ENSEMBLE" => Self::TdlEnsemble,
            _ => Self::Unknown,
        }
    }

    /// Stable tag written at the head of a serialized agent pack.
    pub const fn to_tag(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Random => 1,
            Self::Tdl => 2,
            Self::Interactive => 3,
            Self::TdlEnsemble => 4,
        }
    }

    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Unknown),
            1 => Some(Self::Random),
            2 => Some(Self::Tdl),
            3 => Some(Self::Interactive),
            4 => Some(Self::TdlEnsemble),
            _ => None,
        }
    }
}

/// Errors of the agent layer.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The value network produced NaN/Inf for every candidate move.
    #[error("network diverged; reduce the learning rate")]
    NetworkDiverged,

    /// A malformed argument at a public boundary.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The network's input layer does not fit the declared state type.
    #[error("neural net is incompatible with the chosen state type")]
    IncompatibleNet,

    /// A script or pack describes a different kind of agent.
    #[error("unexpected agent type: {0}")]
    UnexpectedAgentType(String),

    /// A hyperparameters-only script tried to alter the net or the state
    /// type.
    #[error("script rejected: {0}")]
    ScriptMismatch(String),

    /// A malformed script.
    #[error("invalid agent script: {0}")]
    InvalidScript(String),

    /// A pack with an unknown type tag or a broken payload.
    #[error("serialization mismatch: {0}")]
    SerializationMismatch(String),

    /// Agents of incompatible state types were asked to cooperate.
    #[error("incompatible agents: {0}")]
    IncompatibleAgents(String),
}

/// Name, generated UUID and the append-only record book every agent
/// carries. Records are free-form strings documenting training history.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    name: String,
    id: String,
    record_book: Vec<String>,
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self::new("")
    }
}

impl AgentIdentity {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: Uuid::new_v4().to_string(),
            record_book: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Appends a record; returns its index in the book.
    pub fn add_record(&mut self, record: &str) -> usize {
        self.record_book.push(record.to_string());
        self.record_book.len() - 1
    }

    pub fn records_count(&self) -> usize {
        self.record_book.len()
    }

    pub fn record(&self, record_id: usize) -> &str {
        &self.record_book[record_id]
    }

    pub fn record_book(&self) -> &[String] {
        &self.record_book
    }
}

/// The minimal contract between the board orchestrator and a player,
/// with the trainable-agent surface folded in (non-trainable agents keep
/// the defaults).
pub trait Agent {
    /// Picks a move id for the current state, `-1` when there is nothing
    /// to pick.
    fn make_move(&mut self, state: &dyn State, as_white: bool) -> anyhow::Result<i32>;

    /// Notification that the episode ended with the given per-color
    /// result.
    fn game_over(&mut self, final_state: &dyn State, result: GameResult, as_white: bool);

    /// Type tag of the states this agent can play.
    fn state_type_id(&self) -> StateTypeId;

    fn type_id(&self) -> AgentTypeId;

    fn can_train(&self) -> bool {
        false
    }

    fn set_training_mode(&mut self, _training_mode: bool) {}

    fn training_mode(&self) -> bool {
        false
    }
}
