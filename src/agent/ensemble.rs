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
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

use super::td_agent::{SearchMethod, TdLambdaAgent};
use super::{Agent, AgentError, AgentIdentity, AgentTypeId, GameResult};
use crate::board::{State, StateTypeId};

/// Version written at the head of a serialized ensemble pack.
const ENSEMBLE_PACK_VERSION: u32 = 2;

/// A committee of TD(λ) agents that votes on every move. The search
/// parameters are centralized: every setter propagates to each member,
/// members are switched to performance-evaluation mode on entry, and a
/// validation pass re-enforces the invariant on every load.
///
/// Ensembles cannot train.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EnsembleAgent {
    identity: AgentIdentity,
    ensemble: Vec<TdLambdaAgent>,

    /// Index of the member playing alone in single-agent mode, -1 when
    /// voting.
    chosen_agent_id: i64,

    search_method: SearchMethod,
    search_iterations: i32,
    search_depth: i32,
    run_multi_threaded: bool,
}

impl EnsembleAgent {
    pub fn new(members: Vec<TdLambdaAgent>, name: &str) -> Self {
        let mut result = Self {
            identity: AgentIdentity::new(name),
            ensemble: Vec::new(),
            chosen_agent_id: -1,
            search_method: SearchMethod::None,
            search_iterations: 1000,
            search_depth: 1000,
            run_multi_threaded: false,
        };

        for member in members {
            result.add(member);
        }

        result
    }

    /// Adds a member (the ensemble owns its copy), aligning it with the
    /// centralized parameters. Returns the member's index.
    pub fn add(&mut self, agent: TdLambdaAgent) -> usize {
        self.ensemble.push(agent);
        let member = self.ensemble.last_mut().expect("just pushed");
        Self::update_member_params(
            member,
            self.search_method,
            self.search_iterations,
            self.search_depth,
        );
        self.ensemble.len() - 1
    }

    pub fn remove_agent(&mut self, id: i64) -> bool {
        if id < 0 || id as usize >= self.ensemble.len() {
            return false;
        }
        self.ensemble.remove(id as usize);
        true
    }

    pub fn agent(&self, id: usize) -> &TdLambdaAgent {
        &self.ensemble[id]
    }

    pub fn size(&self) -> usize {
        self.ensemble.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ensemble.is_empty()
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn set_name(&mut self, name: &str) {
        self.identity.set_name(name);
    }

    /// Switches single-agent mode on (picking a random member to play
    /// alone) or off. Returns the chosen member index.
    pub fn set_single_agent_mode(&mut self, use_single_random_agent: bool) -> i64 {
        self.chosen_agent_id = if use_single_random_agent && !self.ensemble.is_empty() {
            thread_rng().gen_range(0..self.ensemble.len()) as i64
        } else {
            -1
        };
        self.chosen_agent_id
    }

    pub fn is_single_agent_mode(&self) -> bool {
        self.chosen_agent_id >= 0 && (self.chosen_agent_id as usize) < self.ensemble.len()
    }

    pub fn current_random_agent_id(&self) -> i64 {
        self.chosen_agent_id
    }

    fn update_member_params(
        member: &mut TdLambdaAgent,
        search_method: SearchMethod,
        search_iterations: i32,
        search_depth: i32,
    ) {
        member.set_tree_search_method(search_method);
        member.set_td_search_iterations(search_iterations);
        member.set_search_depth(search_depth);
        member.set_performance_evaluation_mode(true);
    }

    fn synchronize_parameters(&mut self) {
        for member in &mut self.ensemble {
            Self::update_member_params(
                member,
                self.search_method,
                self.search_iterations,
                self.search_depth,
            );
        }
    }

    fn validate_synchronization(&self) -> Result<(), AgentError> {
        for member in &self.ensemble {
            if member.tree_search_method() != self.search_method
                || member.td_search_iterations() != self.search_iterations
                || member.search_depth() != self.search_depth
                || !member.performance_evaluation_mode()
            {
                return Err(AgentError::SerializationMismatch(
                    "ensemble member parameters are out of sync".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn search_method(&self) -> SearchMethod {
        self.search_method
    }

    pub fn set_search_method(&mut self, search_method: SearchMethod) {
        self.search_method = search_method;
        self.synchronize_parameters();
    }

    pub fn search_iterations(&self) -> i32 {
        self.search_iterations
    }

    pub fn set_search_iterations(&mut self, search_iterations: i32) {
        self.search_iterations = search_iterations;
        self.synchronize_parameters();
    }

    pub fn search_depth(&self) -> i32 {
        self.search_depth
    }

    pub fn set_search_depth(&mut self, search_depth: i32) {
        self.search_depth = search_depth;
        self.synchronize_parameters();
    }

    pub fn run_multi_threaded(&self) -> bool {
        self.run_multi_threaded
    }

    pub fn set_run_multi_threaded(&mut self, run_multi_threaded: bool) {
        self.run_multi_threaded = run_multi_threaded;
    }

    /// Every member votes for its best move id; the move with the
    /// plurality wins, ties broken by the earlier move id.
    fn vote(&self, state: &dyn State, as_white: bool) -> anyhow::Result<i32> {
        let moves_count = state.moves_count() as usize;

        let votes = if self.run_multi_threaded {
            let votes = Mutex::new(vec![0u32; moves_count]);
            self.ensemble
                .par_iter()
                .try_for_each(|member| -> anyhow::Result<()> {
                    let move_id = member.pick_move_id(state, as_white)?;
                    let mut votes = votes.lock().expect("vote lock poisoned");
                    votes[move_id as usize] += 1;
                    Ok(())
                })?;
            votes.into_inner().expect("vote lock poisoned")
        } else {
            let mut votes = vec![0u32; moves_count];
            for member in &self.ensemble {
                let move_id = member.pick_move_id(state, as_white)?;
                votes[move_id as usize] += 1;
            }
            votes
        };

        let mut best_id = 0;
        for (move_id, &count) in votes.iter().enumerate() {
            if count > votes[best_id] {
                best_id = move_id;
            }
        }

        Ok(best_id as i32)
    }

    /// Serializes the ensemble as a versioned, type-tagged pack.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(bincode::serialize(&(
            self.type_id().to_tag(),
            ENSEMBLE_PACK_VERSION,
            self,
        ))?)
    }

    /// Restores an ensemble from a pack, applying the known legacy
    /// migrations and validating the synchronization invariant.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let (tag, version): (u32, u32) = bincode::deserialize(bytes)?;

        match AgentTypeId::from_tag(tag) {
            Some(AgentTypeId::TdlEnsemble) => {}
            Some(other) => {
                return Err(AgentError::SerializationMismatch(format!(
                    "expected an ensemble pack, found {other}"
                ))
                .into())
            }
            None => {
                return Err(
                    AgentError::SerializationMismatch(format!("unknown type tag {tag}")).into(),
                )
            }
        }

        let mut result = match version {
            0 | 1 => {
                // The legacy layout had no centralized search
                // parameters; adopt the defaults and push them down.
                let (_, _, legacy): (u32, u32, LegacyEnsembleRecord) =
                    bincode::deserialize(bytes)?;
                let mut restored = Self::new(Vec::new(), "");
                restored.identity = legacy.identity;
                restored.ensemble = legacy.ensemble;
                restored.chosen_agent_id = legacy.chosen_agent_id;
                restored.synchronize_parameters();
                restored
            }
            ENSEMBLE_PACK_VERSION => {
                let (_, _, ensemble): (u32, u32, EnsembleAgent) = bincode::deserialize(bytes)?;
                ensemble
            }
            _ => {
                return Err(AgentError::SerializationMismatch(format!(
                    "unsupported ensemble pack version {version}"
                ))
                .into())
            }
        };

        result.validate_synchronization()?;
        Ok(result)
    }

    pub fn save_to_file(&self, file_path: &Path) -> anyhow::Result<()> {
        Ok(std::fs::write(file_path, self.to_bytes()?)?)
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        Self::from_bytes(&std::fs::read(file_path)?)
    }
}

impl Agent for EnsembleAgent {
    fn make_move(&mut self, state: &dyn State, as_white: bool) -> anyhow::Result<i32> {
        if state.moves_count() <= 0 {
            return Ok(-1);
        }
        if state.moves_count() == 1 {
            return Ok(0); // the choice is obvious
        }

        if self.is_single_agent_mode() {
            return self.ensemble[self.chosen_agent_id as usize].pick_move_id(state, as_white);
        }

        self.vote(state, as_white)
    }

    fn game_over(&mut self, _final_state: &dyn State, _result: GameResult, _as_white: bool) {
        // Re-pick the soloist for the next episode.
        let single = self.is_single_agent_mode();
        self.set_single_agent_mode(single);
    }

    fn state_type_id(&self) -> StateTypeId {
        if self.ensemble.is_empty() {
            return StateTypeId::INVALID;
        }

        let mut result = self.ensemble[0].state_type_id();
        for member in &self.ensemble[1..] {
            let trial = member.state_type_id();
            assert!(
                result.is_compatible_with(trial),
                "incompatible agents in the ensemble"
            );
            result = result.common(trial);
        }
        result
    }

    fn type_id(&self) -> AgentTypeId {
        AgentTypeId::TdlEnsemble
    }
}

/// Payload shape of the version 0/1 ensemble packs.
#[derive(Serialize, Deserialize)]
struct LegacyEnsembleRecord {
    identity: AgentIdentity,
    ensemble: Vec<TdLambdaAgent>,
    chosen_agent_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> TdLambdaAgent {
        TdLambdaAgent::new(&[8], 0.1, 0.5, 0.9, 0.01, StateTypeId::CHECKERS, name).unwrap()
    }

    fn small_ensemble() -> EnsembleAgent {
        EnsembleAgent::new(vec![member("a"), member("b"), member("c")], "trio")
    }

    #[test]
    fn test_members_adopt_central_parameters_on_add() {
        let ensemble = small_ensemble();
        for id in 0..ensemble.size() {
            let agent = ensemble.agent(id);
            assert!(agent.performance_evaluation_mode());
            assert_eq!(agent.tree_search_method(), ensemble.search_method());
            assert_eq!(agent.td_search_iterations(), ensemble.search_iterations());
            assert_eq!(agent.search_depth(), ensemble.search_depth());
        }
    }

    #[test]
    fn test_setters_propagate_to_every_member() {
        let mut ensemble = small_ensemble();
        ensemble.set_search_depth(42);
        ensemble.set_search_iterations(17);

        for id in 0..ensemble.size() {
            assert_eq!(ensemble.agent(id).search_depth(), 42);
            assert_eq!(ensemble.agent(id).td_search_iterations(), 17);
        }
    }

    #[test]
    fn test_add_copies_the_agent() {
        let mut ensemble = EnsembleAgent::new(Vec::new(), "copy");
        let mut outside = member("outside");
        ensemble.add(outside.clone());

        outside.set_lambda(0.99);
        assert_ne!(
            ensemble.agent(0).lambda(),
            0.99,
            "mutating the caller's agent must not reach the ensemble"
        );
    }

    #[test]
    fn test_voting_picks_the_plurality() {
        let mut ensemble = small_ensemble();
        let state = StateTypeId::CHECKERS.start_seed().new_state(false);

        let mut expected = vec![0u32; state.moves_count() as usize];
        for id in 0..ensemble.size() {
            let vote = ensemble
                .agent(id)
                .pick_move_id(state.as_ref(), true)
                .unwrap();
            expected[vote as usize] += 1;
        }
        let mut winner = 0;
        for (move_id, &count) in expected.iter().enumerate() {
            if count > expected[winner] {
                winner = move_id;
            }
        }

        let picked = ensemble.make_move(state.as_ref(), true).unwrap();
        assert_eq!(picked, winner as i32);

        // The parallel path must agree with the sequential one.
        ensemble.set_run_multi_threaded(true);
        let picked_parallel = ensemble.make_move(state.as_ref(), true).unwrap();
        assert_eq!(picked_parallel, picked);
    }

    #[test]
    fn test_single_agent_mode_reselects_on_game_over() {
        let mut ensemble = small_ensemble();
        assert!(!ensemble.is_single_agent_mode());

        let chosen = ensemble.set_single_agent_mode(true);
        assert!(ensemble.is_single_agent_mode());
        assert!((0..ensemble.size() as i64).contains(&chosen));

        let state = StateTypeId::CHECKERS.start_seed().new_state(false);
        ensemble.game_over(state.as_ref(), GameResult::Draw, true);
        assert!(ensemble.is_single_agent_mode(), "mode survives re-picks");

        ensemble.set_single_agent_mode(false);
        assert_eq!(ensemble.current_random_agent_id(), -1);
    }

    #[test]
    fn test_ensembles_cannot_train() {
        let mut ensemble = small_ensemble();
        assert!(!ensemble.can_train());
        ensemble.set_training_mode(true);
        assert!(!ensemble.training_mode());
    }

    #[test]
    fn test_pack_round_trip_validates_synchronization() {
        let mut ensemble = small_ensemble();
        ensemble.set_search_depth(9);

        let bytes = ensemble.to_bytes().unwrap();
        let restored = EnsembleAgent::from_bytes(&bytes).unwrap();
        assert_eq!(ensemble, restored);
    }

    #[test]
    fn test_legacy_pack_synchronizes_members() {
        let source = small_ensemble();
        let legacy = LegacyEnsembleRecord {
            identity: AgentIdentity::new("legacy"),
            ensemble: (0..source.size()).map(|id| source.agent(id).clone()).collect(),
            chosen_agent_id: -1,
        };
        let bytes =
            bincode::serialize(&(AgentTypeId::TdlEnsemble.to_tag(), 1u32, &legacy)).unwrap();

        let restored = EnsembleAgent::from_bytes(&bytes).unwrap();
        assert_eq!(restored.size(), source.size());
        for id in 0..restored.size() {
            assert!(restored.agent(id).performance_evaluation_mode());
        }
    }

    #[test]
    fn test_state_type_of_members() {
        let ensemble = small_ensemble();
        assert_eq!(ensemble.state_type_id(), StateTypeId::CHECKERS);
        assert_eq!(
            EnsembleAgent::new(Vec::new(), "empty").state_type_id(),
            StateTypeId::INVALID
        );
    }
}
