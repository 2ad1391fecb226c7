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

//! The episode orchestrator.
//!
//! A [`Board`] plays one or many episodes between two agents (or one
//! agent against itself): it yields a fresh state from a seed, asks the
//! agent to move, applies the move (which inverts the state), swaps the
//! active agent and counts capture-less plies. On termination both
//! agents are notified with their per-color result.
//!
//! The smart-training variant plays exploratory episodes with training
//! off and a trace recorder attached, replays the decisive ones with
//! training on, and keeps going until the requested number of decisive
//! episodes has accumulated.

use anyhow::{bail, Context, Result};
use log::debug;

use crate::agent::{Agent, GameResult};
use crate::board::{Move, State, StateSeed};

/// Result of a single episode. `StrongDraw` is a stalemate-like
/// termination (no moves, no check); `Draw` covers the capture-less cap
/// and draws reported by the state with moves remaining. Agents see both
/// as [`GameResult::Draw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Draw,
    StrongDraw,
    WhiteVictory,
    BlackVictory,
    /// Cooperative cancellation; nobody is notified and nothing is
    /// counted.
    Cancelled,
}

impl Outcome {
    pub fn is_decisive(&self) -> bool {
        matches!(self, Self::WhiteVictory | Self::BlackVictory)
    }
}

/// Win counters of a batch of episodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    blacks_win_count: i32,
    whites_win_count: i32,
    total_episodes_count: i32,
}

impl Stats {
    pub fn new(blacks_win_count: i32, whites_win_count: i32, total_episodes_count: i32) -> Self {
        Self {
            blacks_win_count,
            whites_win_count,
            total_episodes_count,
        }
    }

    pub fn blacks_win_count(&self) -> i32 {
        self.blacks_win_count
    }

    pub fn whites_win_count(&self) -> i32 {
        self.whites_win_count
    }

    pub fn total_episodes_count(&self) -> i32 {
        self.total_episodes_count
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::WhiteVictory => self.whites_win_count += 1,
            Outcome::BlackVictory => self.blacks_win_count += 1,
            _ => {}
        }
        self.total_episodes_count += 1;
    }
}

/// Optional orchestration callbacks; every one may be absent.
#[derive(Default)]
pub struct Callbacks<'a> {
    /// Called after every applied move with the UI projection of the
    /// resulting state, the applied move and the mover's color.
    pub publish_state: Option<Box<dyn FnMut(&[i32], &Move, bool) + 'a>>,

    /// Called after every finished episode with the white-won and
    /// black-won flags plus the running episode total.
    pub publish_episode_stats: Option<Box<dyn FnMut(bool, bool, i32) + 'a>>,

    /// Polled once per ply; returning `true` cancels the episode.
    pub cancel: Option<Box<dyn Fn() -> bool + 'a>>,

    /// Receives error messages before they propagate.
    pub error: Option<Box<dyn FnMut(&str) + 'a>>,
}

impl Callbacks<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|cancel| cancel())
    }

    fn report_error(&mut self, message: &str) {
        if let Some(error) = &mut self.error {
            error(message);
        }
    }
}

/// One or two agents alternating on a board. Self-play drives a single
/// agent from both sides, which is why the pair is an enum and not two
/// references.
enum AgentPair<'a, 'b> {
    Two {
        white: &'a mut (dyn Agent + 'b),
        black: &'a mut (dyn Agent + 'b),
    },
    Solo(&'a mut (dyn Agent + 'b)),
}

impl AgentPair<'_, '_> {
    fn agent(&mut self, as_white: bool) -> &mut dyn Agent {
        match self {
            Self::Two { white, black } => {
                if as_white {
                    &mut **white
                } else {
                    &mut **black
                }
            }
            Self::Solo(agent) => &mut **agent,
        }
    }

    fn validate_against(&mut self, seed: &StateSeed) -> Result<()> {
        let seed_type = seed.state_type();
        let compatible = match self {
            Self::Two { white, black } => white
                .state_type_id()
                .common(black.state_type_id())
                .is_compatible_with(seed_type),
            Self::Solo(agent) => agent.state_type_id().is_compatible_with(seed_type),
        };
        if !compatible {
            bail!("agents are incompatible with the state type {seed_type:?}");
        }
        Ok(())
    }

    fn notify(&mut self, final_state: &dyn State, outcome: Outcome) {
        let (white_result, black_result) = match outcome {
            Outcome::WhiteVictory => (GameResult::Victory, GameResult::Loss),
            Outcome::BlackVictory => (GameResult::Loss, GameResult::Victory),
            _ => (GameResult::Draw, GameResult::Draw),
        };
        self.agent(true).game_over(final_state, white_result, true);
        self.agent(false).game_over(final_state, black_result, false);
    }

    fn set_training_modes(&mut self, white_mode: bool, black_mode: bool) {
        match self {
            Self::Two { white, black } => {
                white.set_training_mode(white_mode);
                black.set_training_mode(black_mode);
            }
            Self::Solo(agent) => agent.set_training_mode(white_mode || black_mode),
        }
    }

    fn training_modes(&mut self) -> (bool, bool) {
        match self {
            Self::Two { white, black } => (white.training_mode(), black.training_mode()),
            Self::Solo(agent) => {
                let mode = agent.training_mode();
                (mode, mode)
            }
        }
    }
}

/// The episode environment.
pub struct Board;

impl Board {
    /// Plays `episodes` games of `white` against `black` from the given
    /// seed. `max_moves_without_capture` is the orchestration-level draw
    /// threshold.
    pub fn play(
        white: &mut dyn Agent,
        black: &mut dyn Agent,
        episodes: i32,
        start_state: &StateSeed,
        max_moves_without_capture: i32,
        callbacks: &mut Callbacks<'_>,
    ) -> Result<Stats> {
        Self::play_pair(
            AgentPair::Two { white, black },
            episodes,
            start_state,
            max_moves_without_capture,
            callbacks,
        )
    }

    /// Plays `episodes` games of `agent` against itself.
    pub fn play_self(
        agent: &mut dyn Agent,
        episodes: i32,
        start_state: &StateSeed,
        max_moves_without_capture: i32,
        callbacks: &mut Callbacks<'_>,
    ) -> Result<Stats> {
        Self::play_pair(
            AgentPair::Solo(agent),
            episodes,
            start_state,
            max_moves_without_capture,
            callbacks,
        )
    }

    /// Smart training: repeats episodes until `episodes` games with a
    /// decisive outcome have accumulated. Each attempt is played with
    /// training off and a trace recorder attached; decisive episodes are
    /// replayed from the trace with training on, draws are discarded.
    pub fn train(
        white: &mut dyn Agent,
        black: &mut dyn Agent,
        episodes: i32,
        start_state: &StateSeed,
        max_moves_without_capture: i32,
        callbacks: &mut Callbacks<'_>,
    ) -> Result<Stats> {
        Self::train_pair(
            AgentPair::Two { white, black },
            episodes,
            start_state,
            max_moves_without_capture,
            callbacks,
        )
    }

    /// Smart training of an agent against itself.
    pub fn train_self(
        agent: &mut dyn Agent,
        episodes: i32,
        start_state: &StateSeed,
        max_moves_without_capture: i32,
        callbacks: &mut Callbacks<'_>,
    ) -> Result<Stats> {
        Self::train_pair(
            AgentPair::Solo(agent),
            episodes,
            start_state,
            max_moves_without_capture,
            callbacks,
        )
    }

    fn play_pair(
        mut agents: AgentPair<'_, '_>,
        episodes: i32,
        start_state: &StateSeed,
        max_moves_without_capture: i32,
        callbacks: &mut Callbacks<'_>,
    ) -> Result<Stats> {
        agents.validate_against(start_state)?;

        let mut stats = Stats::default();
        for _ in 0..episodes {
            let mut state = start_state.new_state(false);
            let outcome = Self::play_episode(
                state.as_mut(),
                &mut agents,
                max_moves_without_capture,
                callbacks,
            )
            .map_err(|error| {
                callbacks.report_error(&error.to_string());
                error
            })?;

            if outcome == Outcome::Cancelled {
                break;
            }

            agents.notify(state.as_ref(), outcome);
            stats.record(outcome);
            debug!("episode finished: {outcome:?}");

            if let Some(publish) = &mut callbacks.publish_episode_stats {
                publish(
                    outcome == Outcome::WhiteVictory,
                    outcome == Outcome::BlackVictory,
                    stats.total_episodes_count(),
                );
            }
        }

        Ok(stats)
    }

    fn train_pair(
        mut agents: AgentPair<'_, '_>,
        episodes: i32,
        start_state: &StateSeed,
        max_moves_without_capture: i32,
        callbacks: &mut Callbacks<'_>,
    ) -> Result<Stats> {
        agents.validate_against(start_state)?;

        let (white_mode, black_mode) = agents.training_modes();
        let mut stats = Stats::default();

        while stats.whites_win_count() + stats.blacks_win_count() < episodes {
            // Exploration pass: training off, trace recorder on.
            agents.set_training_modes(false, false);
            let mut state = start_state.new_state(true);
            let outcome = Self::play_episode(
                state.as_mut(),
                &mut agents,
                max_moves_without_capture,
                callbacks,
            );
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(error) => {
                    agents.set_training_modes(white_mode, black_mode);
                    callbacks.report_error(&error.to_string());
                    return Err(error);
                }
            };

            if outcome == Outcome::Cancelled {
                break;
            }

            // Resets the episode counters; no weights move here.
            agents.notify(state.as_ref(), outcome);
            agents.set_training_modes(white_mode, black_mode);

            if !outcome.is_decisive() {
                continue;
            }

            // Replay the decisive trace with training on: each position
            // offers exactly the recorded move.
            let mut replay = state
                .recorded_state()
                .context("the training pass requires a recorded trace")?;
            let replay_outcome = Self::play_episode(
                replay.as_mut(),
                &mut agents,
                max_moves_without_capture,
                callbacks,
            )?;
            debug_assert_eq!(replay_outcome, outcome, "a replay cannot diverge");

            agents.notify(replay.as_ref(), outcome);
            stats.record(outcome);

            if let Some(publish) = &mut callbacks.publish_episode_stats {
                publish(
                    outcome == Outcome::WhiteVictory,
                    outcome == Outcome::BlackVictory,
                    stats.total_episodes_count(),
                );
            }
        }

        agents.set_training_modes(white_mode, black_mode);
        Ok(stats)
    }

    /// Plays out one episode on the given state.
    fn play_episode(
        state: &mut dyn State,
        agents: &mut AgentPair<'_, '_>,
        max_moves_without_capture: i32,
        callbacks: &mut Callbacks<'_>,
    ) -> Result<Outcome> {
        let mut moves_without_capture = 0;
        let mut white_to_move = true;

        loop {
            if callbacks.cancelled() {
                return Ok(Outcome::Cancelled);
            }

            if state.moves_count() == 0 {
                // No moves in check is a loss of the side to move; no
                // moves out of check is the stalemate-like draw.
                return Ok(if state.is_draw() {
                    Outcome::StrongDraw
                } else if white_to_move {
                    Outcome::BlackVictory
                } else {
                    Outcome::WhiteVictory
                });
            }

            if state.is_draw() {
                return Ok(Outcome::Draw);
            }

            if moves_without_capture >= max_moves_without_capture {
                return Ok(Outcome::Draw);
            }

            let move_id = agents.agent(white_to_move).make_move(state, white_to_move)?;
            if move_id < 0 || move_id >= state.moves_count() {
                bail!("agent returned an invalid move id {move_id}");
            }

            let is_capture = state.is_capture_action(move_id);
            let played = callbacks
                .publish_state
                .is_some()
                .then(|| state.all_moves()[move_id as usize].clone());

            state.move_invert_reset(move_id);

            if let Some(publish) = &mut callbacks.publish_state {
                let ui_state = state.evaluate_ui();
                publish(&ui_state, &played.expect("captured above"), white_to_move);
            }

            moves_without_capture = if is_capture {
                0
            } else {
                moves_without_capture + 1
            };
            white_to_move = !white_to_move;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{RandomAgent, TdLambdaAgent};
    use crate::board::StateTypeId;

    #[test]
    fn test_random_checkers_episodes_complete() {
        let mut white = RandomAgent::new();
        let mut black = RandomAgent::new();
        let seed = StateTypeId::CHECKERS.start_seed();

        let stats = Board::play(&mut white, &mut black, 5, &seed, 50, &mut Callbacks::default())
            .unwrap();
        assert_eq!(stats.total_episodes_count(), 5);
        assert!(stats.whites_win_count() + stats.blacks_win_count() <= 5);
    }

    #[test]
    fn test_random_chess_episodes_complete() {
        let mut white = RandomAgent::new();
        let mut black = RandomAgent::new();
        let seed = StateTypeId::CHESS.start_seed();

        let stats = Board::play(&mut white, &mut black, 2, &seed, 30, &mut Callbacks::default())
            .unwrap();
        assert_eq!(stats.total_episodes_count(), 2);
    }

    #[test]
    fn test_cancellation_is_not_counted() {
        let mut white = RandomAgent::new();
        let mut black = RandomAgent::new();
        let seed = StateTypeId::CHECKERS.start_seed();

        let mut callbacks = Callbacks {
            cancel: Some(Box::new(|| true)),
            ..Default::default()
        };
        let stats = Board::play(&mut white, &mut black, 3, &seed, 50, &mut callbacks).unwrap();
        assert_eq!(stats.total_episodes_count(), 0);
    }

    #[test]
    fn test_callbacks_observe_moves_and_episodes() {
        let mut white = RandomAgent::new();
        let mut black = RandomAgent::new();
        let seed = StateTypeId::CHECKERS.start_seed();

        let moves_counter = std::cell::Cell::new(0);
        let episodes_counter = std::cell::Cell::new(0);
        let mut callbacks = Callbacks {
            publish_state: Some(Box::new(|state, played, _as_white| {
                assert_eq!(state.len(), 64);
                assert!(!played.sub_moves.is_empty());
                moves_counter.set(moves_counter.get() + 1);
            })),
            publish_episode_stats: Some(Box::new(|_, _, total| {
                assert!(total > 0);
                episodes_counter.set(episodes_counter.get() + 1);
            })),
            ..Default::default()
        };

        Board::play(&mut white, &mut black, 2, &seed, 40, &mut callbacks).unwrap();
        drop(callbacks);
        assert!(moves_counter.get() > 0);
        assert_eq!(episodes_counter.get(), 2);
    }

    #[test]
    fn test_stalemate_terminates_as_a_strong_draw() {
        use crate::board::chess::{piece, ChessState};

        // Ally king boxed in by an unreachable rival queen: no moves,
        // no check.
        let mut board = vec![piece::SPACE; 64];
        board[0] = piece::KING;
        board[2 * 8 + 1] = piece::anti(piece::QUEEN);
        board[2 * 8 + 2] = piece::anti(piece::KING);
        let seed = StateSeed::Chess(ChessState::new(&board, false));

        let mut white = RandomAgent::new();
        let mut black = RandomAgent::new();
        let mut pair = AgentPair::Two {
            white: &mut white,
            black: &mut black,
        };
        let mut state = seed.new_state(false);
        let outcome =
            Board::play_episode(state.as_mut(), &mut pair, 50, &mut Callbacks::default()).unwrap();
        assert_eq!(outcome, Outcome::StrongDraw);
    }

    #[test]
    fn test_checkmate_terminates_as_a_victory() {
        use crate::board::chess::{piece, ChessState};

        // Ally king mated in the corner by a protected rival queen.
        let mut board = vec![piece::SPACE; 64];
        board[0] = piece::KING;
        board[8 + 1] = piece::anti(piece::QUEEN);
        board[2 * 8 + 2] = piece::anti(piece::KING);
        let seed = StateSeed::Chess(ChessState::new(&board, false));

        let mut white = RandomAgent::new();
        let mut black = RandomAgent::new();
        let mut pair = AgentPair::Two {
            white: &mut white,
            black: &mut black,
        };
        let mut state = seed.new_state(false);
        let outcome =
            Board::play_episode(state.as_mut(), &mut pair, 50, &mut Callbacks::default()).unwrap();
        assert_eq!(outcome, Outcome::BlackVictory);
    }

    #[test]
    fn test_incompatible_pairing_is_rejected() {
        let mut checkers_agent =
            TdLambdaAgent::new(&[8], 0.0, 0.0, 0.9, 0.01, StateTypeId::CHECKERS, "c").unwrap();
        let mut random = RandomAgent::new();
        let chess_seed = StateTypeId::CHESS.start_seed();

        let result = Board::play(
            &mut checkers_agent,
            &mut random,
            1,
            &chess_seed,
            50,
            &mut Callbacks::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_self_play_trains_one_agent() {
        let mut agent =
            TdLambdaAgent::new(&[8], 0.2, 0.5, 0.9, 0.01, StateTypeId::CHECKERS, "solo").unwrap();
        let seed = StateTypeId::CHECKERS.start_seed();

        let stats =
            Board::play_self(&mut agent, 3, &seed, 50, &mut Callbacks::default()).unwrap();
        assert_eq!(stats.total_episodes_count(), 3);
    }

    #[test]
    fn test_smart_training_counts_only_decisive_episodes() {
        let mut white =
            TdLambdaAgent::new(&[8], 0.3, 0.5, 0.9, 0.01, StateTypeId::CHECKERS, "w").unwrap();
        let mut black =
            TdLambdaAgent::new(&[8], 0.3, 0.5, 0.9, 0.01, StateTypeId::CHECKERS, "b").unwrap();
        let seed = StateTypeId::CHECKERS.start_seed();

        let stats =
            Board::train(&mut white, &mut black, 2, &seed, 50, &mut Callbacks::default()).unwrap();
        assert_eq!(stats.whites_win_count() + stats.blacks_win_count(), 2);
        assert!(white.training_mode(), "training mode must be restored");
        assert!(black.training_mode(), "training mode must be restored");
    }
}
