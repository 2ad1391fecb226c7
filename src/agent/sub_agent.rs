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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

use super::collector::{MoveCollector, MoveData};
use super::net::{Cost, LayerGradient, NetContext, ValueNet};
use super::settings::TdlSettings;
use super::{AgentError, GameResult};
use crate::board::State;

thread_local! {
    // Exploration randomness is thread-local so parallel self-play does
    // not contend on one generator.
    static EXPLORER: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());

    // Forward-pass scratch shared by every sub-agent on the thread.
    static SCRATCH: RefCell<(NetContext, Vec<f64>)> = RefCell::new(Default::default());
}

/// Reseeds the exploration generator of the current thread, for
/// reproducibility.
pub fn reset_explorer(seed: u64) {
    EXPLORER.with(|explorer| *explorer.borrow_mut() = StdRng::seed_from_u64(seed));
}

fn should_explore(exploration_probability: f64) -> bool {
    exploration_probability > 0.0
        && (exploration_probability >= 1.0
            || EXPLORER.with(|explorer| explorer.borrow_mut().gen::<f64>())
                < exploration_probability)
}

fn pick(options_count: usize) -> usize {
    EXPLORER.with(|explorer| explorer.borrow_mut().gen_range(0..options_count))
}

/// Per-color TD(λ) learner. Owns the eligibility trace and the caches
/// of the previous afterstate; the network and the hyperparameters come
/// from the outer agent on every call.
#[derive(Debug, Clone)]
pub struct TdLambdaSubAgent {
    is_white: bool,

    /// Set while no training step has been recorded in the current
    /// episode.
    new_game: bool,

    /// Eligibility trace, empty until the first training step.
    z: Vec<LayerGradient>,

    /// Int-vector state observed just before this agent's last move.
    prev_state: Vec<i32>,

    /// Afterstate tensor produced by this agent's last move.
    prev_after_state: Vec<f64>,

    /// Moves taken in the current episode.
    move_counter: i32,
}

impl TdLambdaSubAgent {
    pub fn new(is_white: bool) -> Self {
        Self {
            is_white,
            new_game: true,
            z: Vec::new(),
            prev_state: Vec::new(),
            prev_after_state: Vec::new(),
            move_counter: 0,
        }
    }

    pub fn is_white(&self) -> bool {
        self.is_white
    }

    /// Picks a move and, when training applies, performs the trace and
    /// weight updates. Returns the picked move id, `-1` on a state with
    /// no moves.
    pub fn make_move(
        &mut self,
        state: &dyn State,
        settings: &TdlSettings,
        net: &mut dyn ValueNet,
    ) -> Result<i32, AgentError> {
        if state.moves_count() == 0 {
            return Ok(-1);
        }
        let move_data = self.pick_move(state, settings, net)?;
        self.make_move_with(state, move_data, settings, net)
    }

    /// Adopts the given (externally chosen) move and performs the normal
    /// training actions for it.
    pub fn make_move_with(
        &mut self,
        state: &dyn State,
        move_data: MoveData,
        settings: &TdlSettings,
        net: &mut dyn ValueNet,
    ) -> Result<i32, AgentError> {
        self.move_counter += 1;

        if !settings.training_mode(self.is_white) || settings.train_depth < self.move_counter {
            return Ok(move_data.move_id);
        }

        if self.new_game {
            self.prev_after_state = move_data.after_state;
            self.prev_state = state.evaluate();
            self.new_game = false;
            net.allocate(&mut self.z, true);
            return Ok(move_data.move_id);
        }

        let current_state = state.evaluate();
        let reward = if settings.reward_factor <= 0.0 {
            0.0
        } else {
            settings.reward_factor * state.calc_reward(&self.prev_state, &current_state)
        };

        let prev_afterstate_value = self.update_z_and_evaluate_prev_after_state(settings, net);
        let delta = reward + settings.discount * move_data.value - prev_afterstate_value;

        net.update(&self.z, -settings.learning_rate * delta, 0.0);

        self.prev_after_state = move_data.after_state;
        self.prev_state = current_state;

        Ok(move_data.move_id)
    }

    /// Terminal update: discount-corrected final reward against the last
    /// cached afterstate, then a reset for the next episode.
    pub fn game_over(
        &mut self,
        _final_state: &dyn State,
        result: GameResult,
        settings: &TdlSettings,
        net: &mut dyn ValueNet,
    ) {
        if settings.training_mode(self.is_white) && !self.new_game {
            let moves_to_discount = self.move_counter - settings.train_depth;
            let discount_factor = if moves_to_discount <= 0 {
                1.0
            } else {
                settings.discount.powi(moves_to_discount)
            };

            let reward = 2.0 * f64::from(result.to_int()) * discount_factor;
            let delta = reward - self.update_z_and_evaluate_prev_after_state(settings, net);
            net.update(&self.z, -settings.learning_rate * delta, 0.0);
        }

        self.reset();
    }

    /// Picks a move id without any training side effects.
    pub fn pick_move_id(
        &self,
        state: &dyn State,
        settings: &TdlSettings,
        net: &dyn ValueNet,
    ) -> Result<i32, AgentError> {
        Ok(self.pick_move(state, settings, net)?.move_id)
    }

    fn pick_move(
        &self,
        state: &dyn State,
        settings: &TdlSettings,
        net: &dyn ValueNet,
    ) -> Result<MoveData, AgentError> {
        if state.moves_count() == 1 {
            return Ok(Self::evaluate_move(state, 0, net));
        }

        if self.should_do_exploration(settings) {
            return Ok(Self::explore(state, net, settings.exploration_volume));
        }

        Self::pick_best(state, net)
    }

    fn should_do_exploration(&self, settings: &TdlSettings) -> bool {
        self.move_counter < settings.exploration_depth
            && settings.exploration_volume > 1
            && should_explore(settings.exploration_probability)
    }

    /// Top-k exploration: keep the k highest-valued moves and pick one
    /// of them uniformly at random. With k covering every move this
    /// degenerates to a uniform pick, which skips the evaluation sweep.
    fn explore(state: &dyn State, net: &dyn ValueNet, exploration_volume: i32) -> MoveData {
        let moves_count = state.moves_count();
        let actual_exploration_volume = exploration_volume.min(moves_count) as usize;
        let picked_move_id = pick(actual_exploration_volume);

        if actual_exploration_volume == moves_count as usize {
            return Self::evaluate_move(state, picked_move_id as i32, net);
        }

        let mut collector = MoveCollector::new(actual_exploration_volume);
        SCRATCH.with(|scratch| {
            let (context, tensor) = &mut *scratch.borrow_mut();
            for move_id in 0..moves_count {
                let after_state = state.evaluate_after(move_id);
                let value = net.evaluate(&after_state, tensor, context);
                collector.add(move_id, value, tensor);
            }
        });

        collector.take(picked_move_id)
    }

    /// Argmax of the afterstate value over every move. All-NaN network
    /// output leaves the argmax unset, which is surfaced as divergence.
    pub fn pick_best(state: &dyn State, net: &dyn ValueNet) -> Result<MoveData, AgentError> {
        let mut best_move_data = MoveData::new(-1, f64::MIN, Vec::new());

        SCRATCH.with(|scratch| {
            let (context, tensor) = &mut *scratch.borrow_mut();
            for move_id in 0..state.moves_count() {
                let after_state = state.evaluate_after(move_id);
                let value = net.evaluate(&after_state, tensor, context);

                if value > best_move_data.value {
                    best_move_data.move_id = move_id;
                    best_move_data.value = value;
                    best_move_data.after_state.clear();
                    best_move_data.after_state.extend_from_slice(tensor);
                }
            }
        });

        if best_move_data.move_id < 0 {
            return Err(AgentError::NetworkDiverged);
        }

        Ok(best_move_data)
    }

    /// Evaluates a single move, returning its id, value and afterstate
    /// tensor.
    pub fn evaluate_move(state: &dyn State, move_id: i32, net: &dyn ValueNet) -> MoveData {
        SCRATCH.with(|scratch| {
            let (context, tensor) = &mut *scratch.borrow_mut();
            let after_state = state.evaluate_after(move_id);
            let value = net.evaluate(&after_state, tensor, context);
            MoveData::new(move_id, value, tensor.clone())
        })
    }

    /// One call updating z ← ∇V(prev afterstate) + λγ·z and returning
    /// V(prev afterstate).
    fn update_z_and_evaluate_prev_after_state(
        &mut self,
        settings: &TdlSettings,
        net: &mut dyn ValueNet,
    ) -> f64 {
        let lambda_times_gamma = settings.lambda * settings.discount;

        SCRATCH.with(|scratch| {
            let (context, tensor) = &mut *scratch.borrow_mut();
            net.calc_gradient_and_value(
                &self.prev_after_state,
                &[0.0],
                Cost::Linear,
                &mut self.z,
                tensor,
                lambda_times_gamma,
                context,
            );
            tensor[0]
        })
    }

    fn reset(&mut self) {
        self.new_game = true;
        self.move_counter = 0;
    }

    /// Drops the trace and the afterstate cache (about two thirds of a
    /// trained agent's memory footprint).
    pub fn free_mem(&mut self) {
        self.z.clear();
        self.prev_after_state = Vec::new();
        self.reset();
    }

    /// Training-state equality: trace and caches.
    pub fn equal(&self, other: &TdLambdaSubAgent) -> bool {
        self.z == other.z
            && self.prev_state == other.prev_state
            && self.prev_after_state == other.prev_after_state
    }

    #[cfg(test)]
    pub(crate) fn trace(&self) -> &[LayerGradient] {
        &self.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::converter::StateConverter;
    use crate::agent::net::{Mlp, NetWithConverter};
    use crate::board::StateTypeId;

    fn checkers_net() -> NetWithConverter {
        NetWithConverter::new(
            Mlp::new(&[32, 16, 1]),
            StateConverter::for_state_type(StateTypeId::CHECKERS),
        )
    }

    fn greedy_settings() -> TdlSettings {
        TdlSettings {
            exploration_probability: 0.0,
            discount: 0.9,
            lambda: 0.5,
            learning_rate: 0.01,
            training_mode_white: true,
            training_mode_black: true,
            reward_factor: 1.0,
            train_depth: i32::MAX,
            exploration_depth: i32::MAX,
            exploration_volume: i32::MAX,
        }
    }

    #[test]
    fn test_trace_is_allocated_on_the_first_training_step() {
        let mut net = checkers_net();
        let mut sub_agent = TdLambdaSubAgent::new(true);
        let state = StateTypeId::CHECKERS.start_seed().new_state(false);
        let settings = greedy_settings();

        assert!(sub_agent.trace().is_empty());
        let move_id = sub_agent
            .make_move(state.as_ref(), &settings, &mut net)
            .unwrap();
        assert!((0..state.moves_count()).contains(&move_id));
        assert!(!sub_agent.trace().is_empty());
        assert!(sub_agent
            .trace()
            .iter()
            .all(|g| g.weights.iter().all(|&w| w == 0.0)));
    }

    #[test]
    fn test_trace_recurrence() {
        let mut net = checkers_net();
        let mut sub_agent = TdLambdaSubAgent::new(true);
        let mut state = StateTypeId::CHECKERS.start_seed().new_state(false);
        let settings = greedy_settings();

        // First move caches the afterstate and zeroes z.
        let first = sub_agent
            .make_move(state.as_ref(), &settings, &mut net)
            .unwrap();
        state.move_invert_reset(first);
        state.move_invert_reset(0); // opponent reply, any move

        // The second training step must produce z = ∇V(prev afterstate)
        // (the previous z was zero).
        let prev_after_state = sub_agent.prev_after_state.clone();
        let mut expected = Vec::new();
        let mut out_value = Vec::new();
        let mut context = NetContext::default();
        net.calc_gradient_and_value(
            &prev_after_state,
            &[0.0],
            Cost::Linear,
            &mut expected,
            &mut out_value,
            0.0,
            &mut context,
        );

        sub_agent
            .make_move(state.as_ref(), &settings, &mut net)
            .unwrap();
        assert_eq!(sub_agent.trace(), &expected[..]);
    }

    #[test]
    fn test_no_training_no_trace() {
        let mut net = checkers_net();
        let reference = net.clone();
        let mut sub_agent = TdLambdaSubAgent::new(true);
        let state = StateTypeId::CHECKERS.start_seed().new_state(false);

        let mut settings = greedy_settings();
        settings.training_mode_white = false;

        sub_agent
            .make_move(state.as_ref(), &settings, &mut net)
            .unwrap();
        assert!(sub_agent.trace().is_empty());
        assert_eq!(net, reference, "weights must not change without training");

        // The terminal update is skipped too: no move was recorded.
        sub_agent.game_over(state.as_ref(), GameResult::Victory, &settings, &mut net);
        assert_eq!(net, reference);
    }

    #[test]
    fn test_terminal_update_changes_weights_and_resets() {
        let mut net = checkers_net();
        let reference = net.clone();
        let mut sub_agent = TdLambdaSubAgent::new(true);
        let state = StateTypeId::CHECKERS.start_seed().new_state(false);
        let settings = greedy_settings();

        sub_agent
            .make_move(state.as_ref(), &settings, &mut net)
            .unwrap();
        sub_agent.game_over(state.as_ref(), GameResult::Victory, &settings, &mut net);

        assert_ne!(net, reference, "the terminal update must adjust weights");
        assert_eq!(sub_agent.move_counter, 0);
        assert!(sub_agent.new_game);
    }

    #[test]
    fn test_uniform_exploration_with_full_volume() {
        let mut net = checkers_net();
        let state = StateTypeId::CHECKERS.start_seed().new_state(false);

        let mut settings = greedy_settings();
        settings.exploration_probability = 1.0;
        settings.exploration_volume = i32::MAX;

        // With the volume covering every move and probability one, the
        // pick is uniform; a seeded explorer makes it reproducible.
        reset_explorer(1234);
        let mut first_run = Vec::new();
        let mut sub_agent = TdLambdaSubAgent::new(true);
        for _ in 0..20 {
            first_run.push(
                sub_agent
                    .make_move(state.as_ref(), &settings, &mut net)
                    .unwrap(),
            );
        }

        reset_explorer(1234);
        let mut second_run = Vec::new();
        let mut sub_agent = TdLambdaSubAgent::new(true);
        for _ in 0..20 {
            second_run.push(
                sub_agent
                    .make_move(state.as_ref(), &settings, &mut net)
                    .unwrap(),
            );
        }

        assert_eq!(first_run, second_run);
        let distinct: std::collections::HashSet<i32> = first_run.iter().copied().collect();
        assert!(distinct.len() > 1, "a uniform pick must spread over moves");
    }

    #[test]
    fn test_top_k_exploration_picks_among_the_best() {
        let mut net = checkers_net();
        let state = StateTypeId::CHECKERS.start_seed().new_state(false);

        let mut settings = greedy_settings();
        settings.exploration_probability = 1.0;
        settings.exploration_volume = 2;
        settings.training_mode_white = false;

        // The two best moves by the current net.
        let mut values: Vec<(i32, f64)> = (0..state.moves_count())
            .map(|id| {
                (
                    id,
                    TdLambdaSubAgent::evaluate_move(state.as_ref(), id, &net).value,
                )
            })
            .collect();
        values.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        let top: Vec<i32> = values.iter().take(2).map(|(id, _)| *id).collect();

        let mut sub_agent = TdLambdaSubAgent::new(true);
        for _ in 0..20 {
            let picked = sub_agent
                .make_move(state.as_ref(), &settings, &mut net)
                .unwrap();
            assert!(top.contains(&picked), "{picked} is not a top-2 move");
        }
    }

    #[test]
    fn test_single_move_fast_path() {
        let mut net = checkers_net();
        let mut settings = greedy_settings();
        settings.exploration_probability = 1.0;

        // A state offering exactly one move: a trace-recorder replay.
        let mut one_move = StateTypeId::CHECKERS.start_seed().new_state(true);
        one_move.move_invert_reset(3);
        let replay = one_move.recorded_state().unwrap();
        assert_eq!(replay.moves_count(), 1);

        let mut sub_agent = TdLambdaSubAgent::new(true);
        let picked = sub_agent
            .make_move(replay.as_ref(), &settings, &mut net)
            .unwrap();
        assert_eq!(picked, 0, "the only offered move must be taken");
    }
}
