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

/// Flat snapshot of the learning parameters a sub-agent reads on every
/// move. An agent materializes one of these from its stored
/// hyperparameters (with the performance-evaluation overlay already
/// applied) and the TD search substitutes its own overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TdlSettings {
    /// Bernoulli probability of taking an exploratory move.
    pub exploration_probability: f64,

    /// Reward discount γ.
    pub discount: f64,

    /// Trace decay λ.
    pub lambda: f64,

    /// Learning rate α.
    pub learning_rate: f64,

    pub training_mode_white: bool,
    pub training_mode_black: bool,

    /// Multiplier of the shaping reward; any value ≤ 0 disables shaping
    /// so only the final result trains.
    pub reward_factor: f64,

    /// Number of first moves of an episode that receive weight updates.
    pub train_depth: i32,

    /// Number of first moves of an episode within which exploration may
    /// trigger.
    pub exploration_depth: i32,

    /// How many of the best-valued moves take part in an exploration
    /// pick.
    pub exploration_volume: i32,
}

impl TdlSettings {
    #[inline]
    pub fn training_mode(&self, as_white: bool) -> bool {
        if as_white {
            self.training_mode_white
        } else {
            self.training_mode_black
        }
    }
}
