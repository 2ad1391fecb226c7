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

use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Mutex;

use super::adapter::TdlTrainingAdapter;
use super::collector::MoveData;
use super::converter::StateConverter;
use super::net::{Mlp, NetWithConverter, ValueNet};
use super::settings::TdlSettings;
use super::sub_agent::TdLambdaSubAgent;
use super::{Agent, AgentError, AgentIdentity, AgentTypeId, GameResult};
use crate::board::{State, StateTypeId};
use crate::game::{Board, Callbacks};

/// Which colors train while the agent plays.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TrainingSubMode {
    None,
    WhiteOnly,
    BlackOnly,
    Full,
}

impl TrainingSubMode {
    pub const fn to_int(self) -> i32 {
        match self {
            Self::None => 0,
            Self::WhiteOnly => 1,
            Self::BlackOnly => 1 << 1,
            Self::Full => 1 | (1 << 1),
        }
    }

    pub const fn from_int(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::WhiteOnly),
            2 => Some(Self::BlackOnly),
            3 => Some(Self::Full),
            _ => None,
        }
    }

    const fn from_training_mode(training_mode: bool) -> Self {
        if training_mode {
            Self::Full
        } else {
            Self::None
        }
    }

    const fn includes(self, as_white: bool) -> bool {
        match self {
            Self::Full => true,
            Self::WhiteOnly => as_white,
            Self::BlackOnly => !as_white,
            Self::None => false,
        }
    }
}

/// Tree-search methods of the TD(λ) agent.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    None,
    TdSearch,
}

impl SearchMethod {
    pub const fn to_int(self) -> i32 {
        match self {
            Self::None => 0,
            Self::TdSearch => 1,
        }
    }

    pub const fn from_int(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::TdSearch),
            _ => None,
        }
    }
}

/// Version written at the head of a serialized TD(λ) agent pack.
const TDL_PACK_VERSION: u32 = 2;

/// Capture-less move cap of the TD-search rollout episodes.
const SEARCH_MOVES_WITHOUT_CAPTURE_CAP: i32 = 100;

fn default_sub_agents() -> [TdLambdaSubAgent; 2] {
    [TdLambdaSubAgent::new(false), TdLambdaSubAgent::new(true)]
}

/// The TD(λ) agent: a value network with its converter, two per-color
/// sub-agents, the hyperparameters, and an optional scratch search net.
///
/// In performance-evaluation mode the stored hyperparameters are left
/// untouched but exploration reads as zero and training as off, for fair
/// head-to-head evaluation.
#[derive(Debug, Serialize, Deserialize)]
pub struct TdLambdaAgent {
    identity: AgentIdentity,
    net: NetWithConverter,
    state_type_id: StateTypeId,
    exploration_epsilon: f64,
    lambda: f64,
    gamma: f64,
    alpha: f64,
    training_sub_mode: TrainingSubMode,
    reward_factor: f64,
    search_method: SearchMethod,
    td_search_iterations: i32,
    td_search_depth: i32,
    search_exploration_depth: i32,
    search_exploration_volume: i32,
    search_exploration_probability: f64,
    performance_evaluation_mode: bool,

    /// Per-color learners; their traces are transient and never
    /// persisted.
    #[serde(skip, default = "default_sub_agents")]
    sub_agents: [TdLambdaSubAgent; 2],

    /// Scratch net of the TD search. `make_move` is logically
    /// non-mutating of the learned weights outside training mode, but it
    /// does write this net, hence the cell.
    #[serde(skip)]
    search_net: Mutex<Option<NetWithConverter>>,
}

impl Clone for TdLambdaAgent {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            net: self.net.clone(),
            state_type_id: self.state_type_id,
            exploration_epsilon: self.exploration_epsilon,
            lambda: self.lambda,
            gamma: self.gamma,
            alpha: self.alpha,
            training_sub_mode: self.training_sub_mode,
            reward_factor: self.reward_factor,
            search_method: self.search_method,
            td_search_iterations: self.td_search_iterations,
            td_search_depth: self.td_search_depth,
            search_exploration_depth: self.search_exploration_depth,
            search_exploration_volume: self.search_exploration_volume,
            search_exploration_probability: self.search_exploration_probability,
            performance_evaluation_mode: self.performance_evaluation_mode,
            sub_agents: self.sub_agents.clone(),
            search_net: Mutex::new(None),
        }
    }
}

impl PartialEq for TdLambdaAgent {
    /// Equality covers the identity, the network parameters bit for bit
    /// and every stored hyperparameter; the transient sub-agent traces
    /// and the scratch search net are excluded.
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity && self.net == other.net && self.equal_hyperparams(other)
    }
}

impl TdLambdaAgent {
    /// Builds an agent for the given state type. The hidden layer
    /// dimensions are augmented with the converter-derived input layer
    /// and the single-output layer.
    pub fn new(
        hidden_layer_dimensions: &[usize],
        exploration_epsilon: f64,
        lambda: f64,
        gamma: f64,
        alpha: f64,
        state_type_id: StateTypeId,
        name: &str,
    ) -> Result<Self, AgentError> {
        if state_type_id != StateTypeId::CHECKERS && state_type_id != StateTypeId::CHESS {
            return Err(AgentError::InvalidInput(format!(
                "no agent can be built for {state_type_id:?}"
            )));
        }

        let converter = StateConverter::for_state_type(state_type_id);
        let mut layer_dimensions =
            vec![NetWithConverter::input_size_for(state_type_id.state_size(), &converter)];
        layer_dimensions.extend_from_slice(hidden_layer_dimensions);
        layer_dimensions.push(1);

        let agent = Self {
            identity: AgentIdentity::new(name),
            net: NetWithConverter::new(Mlp::new(&layer_dimensions), converter),
            state_type_id,
            exploration_epsilon,
            lambda,
            gamma,
            alpha,
            training_sub_mode: TrainingSubMode::Full,
            reward_factor: 1.0,
            search_method: SearchMethod::None,
            td_search_iterations: 1000,
            td_search_depth: 1000,
            search_exploration_depth: 10000,
            search_exploration_volume: 10000,
            search_exploration_probability: 0.05,
            performance_evaluation_mode: false,
            sub_agents: default_sub_agents(),
            search_net: Mutex::new(None),
        };

        agent.validate()?;
        Ok(agent)
    }

    /// Builds an agent from a JSON script. `NetDim` (the full layer
    /// dimension list) is mandatory here; every other recognized key
    /// overrides its default.
    pub fn from_script(script: &str) -> Result<Self, AgentError> {
        let json = parse_script(script)?;

        let state_type_id = match json.get(script_keys::STATE_TYPE) {
            Some(value) => parse_state_type(value)?,
            None => StateTypeId::CHECKERS,
        };

        let dimensions = json
            .get(script_keys::NET_DIM)
            .ok_or_else(|| AgentError::InvalidScript("NetDim is required".to_string()))
            .and_then(parse_dimensions)?;

        if dimensions.len() < 2 || *dimensions.last().unwrap() != 1 {
            return Err(AgentError::InvalidScript(
                "NetDim must end with an output layer of one".to_string(),
            ));
        }

        let hidden = &dimensions[1..dimensions.len() - 1];
        let mut agent = Self::new(hidden, 0.0, 0.0, 0.8, 0.01, state_type_id, "")?;

        // The constructor derived the input layer; a script may demand a
        // different (incompatible) one, which validation rejects.
        if dimensions[0] != agent.net.net().in_size() {
            agent.net.replace_net(Mlp::new(&dimensions));
        }

        agent.assign(script, false)?;
        Ok(agent)
    }

    /// Applies a hyperparameters-only script: `NetDim` and `StateType`
    /// may be present but must match the current values.
    pub fn assign_hyperparams(&mut self, script: &str) -> Result<(), AgentError> {
        self.assign(script, true)
    }

    fn assign(&mut self, script: &str, hyper_params_only: bool) -> Result<(), AgentError> {
        use script_keys::*;

        let json = parse_script(script)?;

        let agent_type = json
            .get(AGENT_TYPE)
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::InvalidScript("AgentType is required".to_string()))?;
        if AgentTypeId::parse(agent_type) != AgentTypeId::Tdl {
            return Err(AgentError::UnexpectedAgentType(agent_type.to_string()));
        }

        if let Some(name) = json.get(NAME).and_then(Value::as_str) {
            self.identity.set_name(name);
        }

        if let Some(value) = json.get(NET_DIM) {
            let dimensions = parse_dimensions(value)?;
            if hyper_params_only {
                if dimensions != self.net_dimensions() {
                    return Err(AgentError::ScriptMismatch(
                        "net dimensions in the script differ from those of the agent".to_string(),
                    ));
                }
            } else {
                if dimensions.len() < 2 || *dimensions.last().unwrap() != 1 {
                    return Err(AgentError::InvalidScript(
                        "NetDim must end with an output layer of one".to_string(),
                    ));
                }
                self.net.replace_net(Mlp::new(&dimensions));
            }
        }

        if let Some(value) = json.get(STATE_TYPE) {
            let suggested = parse_state_type(value)?;
            if hyper_params_only {
                if suggested != self.state_type_id {
                    return Err(AgentError::ScriptMismatch(
                        "state type in the script differs from that of the agent".to_string(),
                    ));
                }
            } else {
                self.set_state_type_id(suggested);
            }
        }

        if let Some(value) = json.get(LAMBDA).and_then(Value::as_f64) {
            self.lambda = value;
        }
        if let Some(value) = json.get(DISCOUNT).and_then(Value::as_f64) {
            self.gamma = value;
        }
        if let Some(value) = json.get(LEARN_RATE).and_then(Value::as_f64) {
            self.alpha = value;
        }
        if let Some(value) = json.get(EXPLORATION).and_then(Value::as_f64) {
            self.exploration_epsilon = value;
        }
        if let Some(value) = json.get(TRAINING_MODE).and_then(Value::as_i64) {
            self.training_sub_mode = TrainingSubMode::from_int(value as i32).ok_or_else(|| {
                AgentError::InvalidScript(format!("unknown training mode: {value}"))
            })?;
        }
        if let Some(value) = json.get(REWARD_FACTOR).and_then(Value::as_f64) {
            self.reward_factor = value;
        }
        if let Some(value) = json.get(SEARCH_METHOD).and_then(Value::as_i64) {
            self.search_method = SearchMethod::from_int(value as i32).ok_or_else(|| {
                AgentError::InvalidScript(format!("unknown search method: {value}"))
            })?;
        }
        if let Some(value) = json.get(TD_SEARCH_ITERATIONS).and_then(Value::as_i64) {
            self.td_search_iterations = value as i32;
        }
        if let Some(value) = json.get(TD_SEARCH_DEPTH).and_then(Value::as_i64) {
            self.td_search_depth = value as i32;
        }
        if let Some(value) = json.get(TD_SEARCH_EXPLORATION_PROB).and_then(Value::as_f64) {
            self.search_exploration_probability = value;
        }
        if let Some(value) = json.get(TD_SEARCH_EXPLORATION_DEPTH).and_then(Value::as_i64) {
            self.search_exploration_depth = value as i32;
        }
        if let Some(value) = json
            .get(TD_SEARCH_EXPLORATION_VOLUME)
            .and_then(Value::as_i64)
        {
            self.search_exploration_volume = value as i32;
        }
        if let Some(value) = json
            .get(PERFORMANCE_EVALUATION_MODE)
            .and_then(Value::as_bool)
        {
            self.performance_evaluation_mode = value;
        }

        self.validate()
    }

    /// Script rendition of every hyperparameter of the agent.
    pub fn to_script(&self) -> String {
        use script_keys::*;

        let dimensions: Vec<String> = self
            .net_dimensions()
            .iter()
            .map(|dim| dim.to_string())
            .collect();

        json!({
            AGENT_TYPE: self.type_id().to_string(),
            NAME: self.identity.name(),
            NET_DIM: dimensions.join(","),
            LAMBDA: self.lambda,
            DISCOUNT: self.gamma,
            LEARN_RATE: self.alpha,
            EXPLORATION: self.exploration_epsilon,
            TRAINING_MODE: self.training_sub_mode.to_int(),
            REWARD_FACTOR: self.reward_factor,
            SEARCH_METHOD: self.search_method.to_int(),
            TD_SEARCH_ITERATIONS: self.td_search_iterations,
            TD_SEARCH_DEPTH: self.td_search_depth,
            TD_SEARCH_EXPLORATION_PROB: self.search_exploration_probability,
            TD_SEARCH_EXPLORATION_DEPTH: self.search_exploration_depth,
            TD_SEARCH_EXPLORATION_VOLUME: self.search_exploration_volume,
            STATE_TYPE: state_type_name(self.state_type_id),
            PERFORMANCE_EVALUATION_MODE: self.performance_evaluation_mode,
        })
        .to_string()
    }

    fn validate(&self) -> Result<(), AgentError> {
        if !self.net.validate_input_size(self.state_type_id.state_size()) {
            return Err(AgentError::IncompatibleNet);
        }
        Ok(())
    }

    fn set_state_type_id(&mut self, state_type_id: StateTypeId) {
        self.state_type_id = state_type_id;
        self.net
            .set_converter(StateConverter::for_state_type(state_type_id));
    }

    /// The effective sub-mode, with the performance-evaluation overlay
    /// applied.
    fn effective_sub_mode(&self) -> TrainingSubMode {
        if self.performance_evaluation_mode {
            TrainingSubMode::None
        } else {
            self.training_sub_mode
        }
    }

    /// The effective exploration probability (zero in performance-
    /// evaluation mode).
    pub fn exploration_probability(&self) -> f64 {
        if self.performance_evaluation_mode {
            0.0
        } else {
            self.exploration_epsilon
        }
    }

    pub fn set_exploration_probability(&mut self, epsilon: f64) {
        self.exploration_epsilon = epsilon;
    }

    pub fn training_mode_for(&self, as_white: bool) -> bool {
        self.effective_sub_mode().includes(as_white)
    }

    /// The settings snapshot of normal play: no depth caps, the
    /// evaluation overlay applied.
    pub(crate) fn settings(&self) -> TdlSettings {
        TdlSettings {
            exploration_probability: self.exploration_probability(),
            discount: self.gamma,
            lambda: self.lambda,
            learning_rate: self.alpha,
            training_mode_white: self.training_mode_for(true),
            training_mode_black: self.training_mode_for(false),
            reward_factor: self.reward_factor,
            train_depth: i32::MAX,
            exploration_depth: i32::MAX,
            exploration_volume: i32::MAX,
        }
    }

    /// The settings of a TD-search rollout: training forced on for both
    /// colors, depths and exploration taken from the search parameters.
    fn search_settings(&self) -> TdlSettings {
        let mut result = self.settings();
        result.training_mode_white = true;
        result.training_mode_black = true;
        result.train_depth = self.td_search_depth;
        result.exploration_depth = self.search_exploration_depth;
        result.exploration_volume = self.search_exploration_volume;
        result.exploration_probability = self.search_exploration_probability;
        result
    }

    /// Runs the TD-search rollouts from the given position on the
    /// scratch net (cloning the live net into it first when absent) and
    /// returns the scratch net's best move.
    fn run_search(&self, state: &dyn State) -> anyhow::Result<MoveData> {
        let mut guard = self.search_net.lock().expect("search net lock poisoned");
        let search_net = guard.get_or_insert_with(|| self.net.clone());

        let settings = self.search_settings();
        let mut adapter = TdlTrainingAdapter::new(&mut *search_net, settings, self.state_type_id)?;

        let seed = state.current_seed();
        let stats = Board::play_self(
            &mut adapter,
            self.td_search_iterations,
            &seed,
            SEARCH_MOVES_WITHOUT_CAPTURE_CAP,
            &mut Callbacks::default(),
        )?;
        trace!(
            "td-search: {} rollouts, {}/{} white/black wins",
            stats.total_episodes_count(),
            stats.whites_win_count(),
            stats.blacks_win_count()
        );

        Ok(TdLambdaSubAgent::pick_best(state, &*search_net)?)
    }

    /// Best move id by the current net (search included when engaged):
    /// no training, no exploration.
    pub fn pick_move_id(&self, state: &dyn State, _as_white: bool) -> anyhow::Result<i32> {
        if state.moves_count() == 0 {
            return Ok(-1);
        }
        if self.search_method == SearchMethod::TdSearch {
            return Ok(self.run_search(state)?.move_id);
        }
        Ok(TdLambdaSubAgent::pick_best(state, &self.net)?.move_id)
    }

    /// Afterstate value of every available move.
    pub fn evaluate_options(&self, state: &dyn State) -> Vec<f64> {
        (0..state.moves_count())
            .map(|move_id| TdLambdaSubAgent::evaluate_move(state, move_id, &self.net).value)
            .collect()
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn set_name(&mut self, name: &str) {
        self.identity.set_name(name);
    }

    pub fn id(&self) -> &str {
        self.identity.id()
    }

    pub fn add_record(&mut self, record: &str) -> usize {
        self.identity.add_record(record)
    }

    pub fn record_book(&self) -> &[String] {
        self.identity.record_book()
    }

    pub fn net_dimensions(&self) -> Vec<usize> {
        self.net.net().dimensions()
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn set_lambda(&mut self, lambda: f64) {
        self.lambda = lambda;
    }

    pub fn discount(&self) -> f64 {
        self.gamma
    }

    pub fn set_discount(&mut self, gamma: f64) {
        self.gamma = gamma;
    }

    pub fn learning_rate(&self) -> f64 {
        self.alpha
    }

    pub fn set_learning_rate(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn reward_factor(&self) -> f64 {
        self.reward_factor
    }

    pub fn set_reward_factor(&mut self, reward_factor: f64) {
        self.reward_factor = reward_factor;
    }

    pub fn training_sub_mode(&self) -> TrainingSubMode {
        self.training_sub_mode
    }

    pub fn set_training_sub_mode(&mut self, sub_mode: TrainingSubMode) {
        self.training_sub_mode = sub_mode;
    }

    pub fn tree_search_method(&self) -> SearchMethod {
        self.search_method
    }

    pub fn set_tree_search_method(&mut self, search_method: SearchMethod) {
        self.search_method = search_method;
    }

    pub fn td_search_iterations(&self) -> i32 {
        self.td_search_iterations
    }

    pub fn set_td_search_iterations(&mut self, search_iterations: i32) {
        self.td_search_iterations = search_iterations;
    }

    pub fn search_depth(&self) -> i32 {
        self.td_search_depth
    }

    pub fn set_search_depth(&mut self, depth: i32) {
        self.td_search_depth = depth;
    }

    pub fn search_exploration_depth(&self) -> i32 {
        self.search_exploration_depth
    }

    pub fn set_search_exploration_depth(&mut self, depth: i32) {
        self.search_exploration_depth = depth;
    }

    pub fn search_exploration_volume(&self) -> i32 {
        self.search_exploration_volume
    }

    pub fn set_search_exploration_volume(&mut self, volume: i32) {
        self.search_exploration_volume = volume;
    }

    pub fn search_exploration_probability(&self) -> f64 {
        self.search_exploration_probability
    }

    pub fn set_search_exploration_probability(&mut self, probability: f64) {
        self.search_exploration_probability = probability;
    }

    pub fn performance_evaluation_mode(&self) -> bool {
        self.performance_evaluation_mode
    }

    pub fn set_performance_evaluation_mode(&mut self, value: bool) {
        self.performance_evaluation_mode = value;
    }

    /// Hyperparameter equality (identity and network weights excluded,
    /// network dimensions included).
    pub fn equal_hyperparams(&self, other: &Self) -> bool {
        self.net_dimensions() == other.net_dimensions()
            && self.net.converter() == other.net.converter()
            && self.state_type_id == other.state_type_id
            && self.exploration_epsilon == other.exploration_epsilon
            && self.training_sub_mode == other.training_sub_mode
            && self.lambda == other.lambda
            && self.gamma == other.gamma
            && self.alpha == other.alpha
            && self.reward_factor == other.reward_factor
            && self.search_method == other.search_method
            && self.td_search_iterations == other.td_search_iterations
            && self.td_search_depth == other.td_search_depth
            && self.search_exploration_probability == other.search_exploration_probability
            && self.search_exploration_volume == other.search_exploration_volume
            && self.search_exploration_depth == other.search_exploration_depth
            && self.performance_evaluation_mode == other.performance_evaluation_mode
    }

    /// Training-state equality of the per-color sub-agents (used by
    /// regression tests; not part of [`PartialEq`]).
    pub fn equal_sub_agents(&self, other: &Self) -> bool {
        self.sub_agents[0].equal(&other.sub_agents[0])
            && self.sub_agents[1].equal(&other.sub_agents[1])
    }

    /// Drops the eligibility traces and afterstate caches of both
    /// sub-agents.
    pub fn free_aux_mem(&mut self) {
        for sub_agent in &mut self.sub_agents {
            sub_agent.free_mem();
        }
    }

    /// Serializes the agent as a versioned, type-tagged pack.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bincode::serialize(&(
            self.type_id().to_tag(),
            TDL_PACK_VERSION,
            self,
        ))?)
    }

    /// Restores an agent from a pack, applying the known legacy
    /// migrations.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let (tag, version): (u32, u32) = bincode::deserialize(bytes)?;

        match AgentTypeId::from_tag(tag) {
            Some(AgentTypeId::Tdl) => {}
            Some(other) => {
                return Err(AgentError::SerializationMismatch(format!(
                    "expected a TDL pack, found {other}"
                ))
                .into())
            }
            None => {
                return Err(
                    AgentError::SerializationMismatch(format!("unknown type tag {tag}")).into(),
                )
            }
        }

        match version {
            0 | 1 => {
                let (_, _, legacy): (u32, u32, LegacyTdlAgentRecord) =
                    bincode::deserialize(bytes)?;
                Ok(legacy.into_agent())
            }
            TDL_PACK_VERSION => {
                let (_, _, agent): (u32, u32, TdLambdaAgent) = bincode::deserialize(bytes)?;
                agent.validate()?;
                Ok(agent)
            }
            _ => Err(AgentError::SerializationMismatch(format!(
                "unsupported TDL pack version {version}"
            ))
            .into()),
        }
    }

    pub fn save_to_file(&self, file_path: &Path) -> anyhow::Result<()> {
        Ok(std::fs::write(file_path, self.to_bytes()?)?)
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        Self::from_bytes(&std::fs::read(file_path)?)
    }
}

impl Agent for TdLambdaAgent {
    fn make_move(&mut self, state: &dyn State, as_white: bool) -> anyhow::Result<i32> {
        if state.moves_count() == 0 {
            return Ok(-1);
        }

        if self.search_method == SearchMethod::TdSearch {
            let move_data = self.run_search(state)?;

            if self.training_mode() {
                // In training mode the sub-agent adopts the searched
                // move and performs its normal trace update for it.
                let settings = self.settings();
                let Self {
                    sub_agents, net, ..
                } = self;
                return Ok(sub_agents[usize::from(as_white)]
                    .make_move_with(state, move_data, &settings, net)?);
            }

            return Ok(move_data.move_id);
        }

        let settings = self.settings();
        let Self {
            sub_agents, net, ..
        } = self;
        Ok(sub_agents[usize::from(as_white)].make_move(state, &settings, net)?)
    }

    fn game_over(&mut self, final_state: &dyn State, result: GameResult, as_white: bool) {
        if self.search_method != SearchMethod::None {
            // The scratch net is rebuilt fresh each episode.
            *self.search_net.lock().expect("search net lock poisoned") = None;
        }

        let settings = self.settings();
        let Self {
            sub_agents, net, ..
        } = self;
        sub_agents[usize::from(as_white)].game_over(final_state, result, &settings, net);
    }

    fn state_type_id(&self) -> StateTypeId {
        self.state_type_id
    }

    fn type_id(&self) -> AgentTypeId {
        AgentTypeId::Tdl
    }

    fn can_train(&self) -> bool {
        true
    }

    fn set_training_mode(&mut self, training_mode: bool) {
        self.training_sub_mode = TrainingSubMode::from_training_mode(training_mode);
    }

    fn training_mode(&self) -> bool {
        self.effective_sub_mode() != TrainingSubMode::None
    }
}

/// Recognized keys of the JSON agent scripts.
mod script_keys {
    pub const AGENT_TYPE: &str = "AgentType";
    pub const NAME: &str = "Name";
    pub const NET_DIM: &str = "NetDim";
    pub const LAMBDA: &str = "Lambda";
    pub const DISCOUNT: &str = "Discount";
    pub const LEARN_RATE: &str = "LearnRate";
    pub const EXPLORATION: &str = "Exploration";
    pub const TRAINING_MODE: &str = "TrainingMode";
    pub const REWARD_FACTOR: &str = "RewardFactor";
    pub const SEARCH_METHOD: &str = "SearchMethod";
    pub const TD_SEARCH_ITERATIONS: &str = "TdSearchIterations";
    pub const TD_SEARCH_DEPTH: &str = "TdSearchDepth";
    pub const TD_SEARCH_EXPLORATION_PROB: &str = "TdSearchExplorationProb";
    pub const TD_SEARCH_EXPLORATION_DEPTH: &str = "TdSearchExplorationDepth";
    pub const TD_SEARCH_EXPLORATION_VOLUME: &str = "TdSearchExplorationVolume";
    pub const STATE_TYPE: &str = "StateType";
    pub const PERFORMANCE_EVALUATION_MODE: &str = "PerformanceEvaluationMode";
}

fn parse_script(script: &str) -> Result<serde_json::Map<String, Value>, AgentError> {
    match serde_json::from_str(script) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AgentError::InvalidScript(
            "the script must be a JSON object".to_string(),
        )),
        Err(error) => Err(AgentError::InvalidScript(error.to_string())),
    }
}

/// Parses a comma-separated layer dimension string, e.g. `"64,32,1"`.
fn parse_dimensions(value: &Value) -> Result<Vec<usize>, AgentError> {
    let text = value
        .as_str()
        .ok_or_else(|| AgentError::InvalidScript("NetDim must be a string".to_string()))?;

    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| AgentError::InvalidScript(format!("bad net dimension: {part:?}")))
        })
        .collect()
}

fn parse_state_type(value: &Value) -> Result<StateTypeId, AgentError> {
    let text = value
        .as_str()
        .ok_or_else(|| AgentError::InvalidScript("StateType must be a string".to_string()))?;

    match text.trim().to_uppercase().as_str() {
        "CHECKERS" => Ok(StateTypeId::CHECKERS),
        "CHESS" => Ok(StateTypeId::CHESS),
        _ => Err(AgentError::InvalidScript(format!(
            "unknown state type: {text}"
        ))),
    }
}

fn state_type_name(state_type_id: StateTypeId) -> &'static str {
    match state_type_id {
        StateTypeId::CHECKERS => "CHECKERS",
        StateTypeId::CHESS => "CHESS",
        _ => "INVALID",
    }
}

/// Payload shape of the version 0/1 packs: no performance-evaluation
/// flag, no converter, no search parameters, a plain training-mode
/// boolean. Such agents are always checkers agents.
#[derive(Serialize, Deserialize)]
struct LegacyTdlAgentRecord {
    identity: AgentIdentity,
    net: Mlp,
    exploration_epsilon: f64,
    training_mode: bool,
    lambda: f64,
    gamma: f64,
    alpha: f64,
    reward_factor: f64,
}

impl LegacyTdlAgentRecord {
    fn into_agent(self) -> TdLambdaAgent {
        TdLambdaAgent {
            identity: self.identity,
            net: NetWithConverter::new(
                self.net,
                StateConverter::for_state_type(StateTypeId::CHECKERS),
            ),
            state_type_id: StateTypeId::CHECKERS,
            exploration_epsilon: self.exploration_epsilon,
            lambda: self.lambda,
            gamma: self.gamma,
            alpha: self.alpha,
            training_sub_mode: TrainingSubMode::from_training_mode(self.training_mode),
            reward_factor: self.reward_factor,
            search_method: SearchMethod::None,
            td_search_iterations: 1000,
            td_search_depth: 1000,
            search_exploration_depth: 10000,
            search_exploration_volume: 10000,
            search_exploration_probability: 0.05,
            // A legacy agent that was not training was an evaluation
            // agent.
            performance_evaluation_mode: !self.training_mode,
            sub_agents: default_sub_agents(),
            search_net: Mutex::new(None),
        }
    }
}
