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

use super::net::{NetWithConverter, ValueNet};
use super::settings::TdlSettings;
use super::sub_agent::TdLambdaSubAgent;
use super::{Agent, AgentError, AgentTypeId, GameResult};
use crate::board::{State, StateTypeId};

/// Minimal agent driving both colors of a board from a borrowed network
/// with fixed settings — the vehicle of TD-search rollout episodes,
/// which train the scratch net before a real move is committed.
pub struct TdlTrainingAdapter<'a> {
    sub_agents: [TdLambdaSubAgent; 2],
    net: &'a mut NetWithConverter,
    settings: TdlSettings,
    state_type_id: StateTypeId,
}

impl<'a> TdlTrainingAdapter<'a> {
    pub fn new(
        net: &'a mut NetWithConverter,
        settings: TdlSettings,
        state_type_id: StateTypeId,
    ) -> Result<Self, AgentError> {
        if !net.validate_input_size(state_type_id.state_size()) {
            return Err(AgentError::IncompatibleNet);
        }

        Ok(Self {
            sub_agents: [TdLambdaSubAgent::new(false), TdLambdaSubAgent::new(true)],
            net,
            settings,
            state_type_id,
        })
    }
}

impl Agent for TdlTrainingAdapter<'_> {
    fn make_move(&mut self, state: &dyn State, as_white: bool) -> anyhow::Result<i32> {
        let Self {
            sub_agents,
            net,
            settings,
            ..
        } = self;
        Ok(sub_agents[usize::from(as_white)].make_move(state, settings, &mut **net)?)
    }

    fn game_over(&mut self, final_state: &dyn State, result: GameResult, as_white: bool) {
        let Self {
            sub_agents,
            net,
            settings,
            ..
        } = self;
        sub_agents[usize::from(as_white)].game_over(final_state, result, settings, &mut **net);
    }

    fn state_type_id(&self) -> StateTypeId {
        self.state_type_id
    }

    fn type_id(&self) -> AgentTypeId {
        AgentTypeId::Unknown
    }

    fn can_train(&self) -> bool {
        true
    }

    fn training_mode(&self) -> bool {
        true
    }
}
