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

use rand::{thread_rng, Rng};

use super::{Agent, AgentIdentity, AgentTypeId, GameResult};
use crate::board::{State, StateTypeId};

/// Uniform random player, the baseline of performance evaluation. Plays
/// either game and never learns.
#[derive(Debug, Clone, Default)]
pub struct RandomAgent {
    identity: AgentIdentity,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }
}

impl Agent for RandomAgent {
    fn make_move(&mut self, state: &dyn State, _as_white: bool) -> anyhow::Result<i32> {
        let moves_count = state.moves_count();
        if moves_count == 0 {
            return Ok(-1);
        }
        Ok(thread_rng().gen_range(0..moves_count))
    }

    fn game_over(&mut self, _final_state: &dyn State, _result: GameResult, _as_white: bool) {
        // Nothing to learn from.
    }

    fn state_type_id(&self) -> StateTypeId {
        StateTypeId::ALL
    }

    fn type_id(&self) -> AgentTypeId {
        AgentTypeId::Random
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picks_valid_move_ids() {
        let mut agent = RandomAgent::new();
        let state = StateTypeId::CHECKERS.start_seed().new_state(false);
        for _ in 0..50 {
            let move_id = agent.make_move(state.as_ref(), true).unwrap();
            assert!((0..state.moves_count()).contains(&move_id));
        }
    }

    #[test]
    fn test_plays_both_games() {
        let agent = RandomAgent::new();
        assert!(agent
            .state_type_id()
            .is_compatible_with(StateTypeId::CHECKERS));
        assert!(agent.state_type_id().is_compatible_with(StateTypeId::CHESS));
        assert!(!agent.can_train());
    }
}
