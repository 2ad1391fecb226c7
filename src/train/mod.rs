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

//! Round-based training of a population of TD(λ) agents.
//!
//! One round pairs the agents (randomly or in fixed pairs), plays the
//! training episodes of every pair in parallel, evaluates each agent
//! against a random player as both colors and optionally overwrites
//! low-score outliers with a copy of the best scorer. The pairs own
//! their two agents fully during a round, so workers share no mutable
//! state.

use anyhow::{bail, Result};
use log::info;
use rand::{thread_rng, Rng};
use rayon::prelude::*;
use std::time::{Duration, Instant};

use crate::agent::{Agent, RandomAgent, TdLambdaAgent};
use crate::board::StateSeed;
use crate::game::{Board, Callbacks, Stats};

/// Capture-less move cap of the training episodes.
const TRAINING_MOVES_WITHOUT_CAPTURE_CAP: i32 = 50;

/// Outliers score below this fraction of the population mean.
const OUTLIER_SCORE_FRACTION: f64 = 0.8;

/// Per-agent performance record of one round.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceRec {
    /// Round the record belongs to.
    pub round: i32,

    /// Win share of the agent playing white against a random player.
    pub perf_white: f64,

    /// Loss share of the agent playing white.
    pub losses_white: f64,

    /// Win share of the agent playing black against a random player.
    pub perf_black: f64,

    /// Loss share of the agent playing black.
    pub losses_black: f64,

    /// Share of drawn training episodes of the agent's pair.
    pub draws: f64,

    /// Training episodes played in the round.
    pub training_episodes: i32,

    /// Evaluation episodes played per color.
    pub test_episodes: i32,
}

impl PerformanceRec {
    /// Aggregate score: the mean of the two per-color performances.
    pub fn score(&self) -> f64 {
        0.5 * (self.perf_white + self.perf_black)
    }

    /// Compact (or, with `extended`, annotated) textual rendition.
    pub fn to_string(&self, extended: bool) -> String {
        let mut result = String::new();
        if extended {
            result += &format!(
                "Round: {}; Training episodes: {}; Test episodes: {}; Performance ",
                self.round, self.training_episodes, self.test_episodes
            );
        }
        result += &format!(
            "w.w./w.l.-b.w/b.l.-d: {}/{}-{}/{}-{}",
            self.perf_white, self.losses_white, self.perf_black, self.losses_black, self.draws
        );
        result
    }
}

/// Drives rounds of pairing, training and evaluation over a borrowed
/// population of agents.
pub struct TrainingEngine<'a> {
    agents: Vec<&'a mut TdLambdaAgent>,
}

impl<'a> TrainingEngine<'a> {
    pub fn new(agents: Vec<&'a mut TdLambdaAgent>) -> Self {
        Self { agents }
    }

    /// Adds an agent; returns its index in the population.
    pub fn add_agent(&mut self, agent: &'a mut TdLambdaAgent) -> usize {
        self.agents.push(agent);
        self.agents.len() - 1
    }

    pub fn agents_count(&self) -> usize {
        self.agents.len()
    }

    /// Runs rounds `round_id_start..max_round_id` of pair-wise training.
    /// The callback receives the elapsed wall-clock time and the
    /// per-agent performance records after every round.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        round_id_start: i32,
        max_round_id: i32,
        training_episodes_cnt: i32,
        mut round_callback: impl FnMut(Duration, &[PerformanceRec]),
        fixed_pairs: bool,
        test_episodes_cnt: i32,
        smart_training: bool,
        remove_outliers: bool,
    ) -> Result<()> {
        if self.agents.is_empty() || self.agents.len() % 2 == 1 {
            bail!("the agent collection must be nonempty and of even size");
        }

        let mut pairs = split_for_pairs(self.agents.len(), fixed_pairs);

        for round_id in round_id_start..max_round_id {
            let round_start = Instant::now();

            let mut performance_scores = vec![PerformanceRec::default(); self.agents.len()];
            let mut slots: Vec<Option<&mut TdLambdaAgent>> =
                self.agents.iter_mut().map(|agent| Some(&mut **agent)).collect();

            let work: Vec<(usize, usize, &mut TdLambdaAgent, &mut TdLambdaAgent)> = pairs
                .iter()
                .map(|&[white_id, black_id]| {
                    let white = slots[white_id].take().expect("pairing repeats an agent");
                    let black = slots[black_id].take().expect("pairing repeats an agent");
                    (white_id, black_id, white, black)
                })
                .collect();

            let records: Vec<(usize, PerformanceRec, usize, PerformanceRec)> = work
                .into_par_iter()
                .map(|(white_id, black_id, white, black)| {
                    let seed = white.state_type_id().start_seed();
                    let stats = run_training_episodes(
                        white,
                        black,
                        training_episodes_cnt,
                        &seed,
                        smart_training,
                    )?;
                    let draw_percentage = draw_share(&stats, training_episodes_cnt);

                    let white_rec = evaluate_performance(
                        white,
                        training_episodes_cnt,
                        test_episodes_cnt,
                        round_id,
                        draw_percentage,
                    )?;
                    let black_rec = evaluate_performance(
                        black,
                        training_episodes_cnt,
                        test_episodes_cnt,
                        round_id,
                        draw_percentage,
                    )?;
                    Ok((white_id, white_rec, black_id, black_rec))
                })
                .collect::<Result<_>>()?;

            for (white_id, white_rec, black_id, black_rec) in records {
                performance_scores[white_id] = white_rec;
                performance_scores[black_id] = black_rec;
            }

            info!(
                "round {round_id}: {}",
                performance_scores
                    .iter()
                    .map(|rec| format!("{:.2}", rec.score()))
                    .collect::<Vec<_>>()
                    .join(" ")
            );
            round_callback(round_start.elapsed(), &performance_scores);

            if remove_outliers {
                self.remove_low_score_outliers(&performance_scores);
            }

            if round_id != max_round_id - 1 && !fixed_pairs {
                pairs = split_for_pairs(self.agents.len(), fixed_pairs);
            }
        }

        Ok(())
    }

    /// Runs rounds of self-play training: every agent plays against
    /// itself instead of a partner.
    pub fn run_auto(
        &mut self,
        round_id_start: i32,
        max_round_id: i32,
        training_episodes_cnt: i32,
        mut round_callback: impl FnMut(Duration, &[PerformanceRec]),
        test_episodes_cnt: i32,
        smart_training: bool,
        remove_outliers: bool,
    ) -> Result<()> {
        if self.agents.is_empty() {
            bail!("the agent collection must be nonempty");
        }

        for round_id in round_id_start..max_round_id {
            let round_start = Instant::now();

            let performance_scores: Vec<PerformanceRec> = self
                .agents
                .par_iter_mut()
                .map(|agent| {
                    let seed = agent.state_type_id().start_seed();
                    let stats = run_self_training_episodes(
                        agent,
                        training_episodes_cnt,
                        &seed,
                        smart_training,
                    )?;
                    let draw_percentage = draw_share(&stats, training_episodes_cnt);
                    evaluate_performance(
                        agent,
                        training_episodes_cnt,
                        test_episodes_cnt,
                        round_id,
                        draw_percentage,
                    )
                })
                .collect::<Result<_>>()?;

            info!(
                "auto round {round_id}: {}",
                performance_scores
                    .iter()
                    .map(|rec| format!("{:.2}", rec.score()))
                    .collect::<Vec<_>>()
                    .join(" ")
            );
            round_callback(round_start.elapsed(), &performance_scores);

            if remove_outliers {
                self.remove_low_score_outliers(&performance_scores);
            }
        }

        Ok(())
    }

    /// Overwrites every agent scoring below the outlier threshold with a
    /// copy of the best scorer.
    fn remove_low_score_outliers(&mut self, performance_scores: &[PerformanceRec]) {
        let (best_agent_id, outlier_ids) = find_best_and_outliers(performance_scores);
        if outlier_ids.is_empty() {
            return;
        }

        let best_copy = self.agents[best_agent_id].clone();
        for outlier_agent_id in outlier_ids {
            info!(
                "agent {outlier_agent_id} is an outlier; replaced by a copy of agent {best_agent_id}"
            );
            *self.agents[outlier_agent_id] = best_copy.clone();
        }
    }
}

/// Splits `0..agents_count` into pairs: shuffled when `fixed_pairs` is
/// unset, consecutive otherwise. The count must be even and non-zero.
fn split_for_pairs(agents_count: usize, fixed_pairs: bool) -> Vec<[usize; 2]> {
    assert!(
        agents_count > 0 && agents_count % 2 == 0,
        "cannot build pairs from {agents_count} agents"
    );

    let mut ids: Vec<usize> = (0..agents_count).collect();

    let mut result = Vec::with_capacity(agents_count / 2);
    while !ids.is_empty() {
        let mut pair = [0usize; 2];
        for slot in &mut pair {
            let index_id = if fixed_pairs {
                0
            } else {
                thread_rng().gen_range(0..ids.len())
            };
            *slot = ids.remove(index_id);
        }
        result.push(pair);
    }

    result
}

/// Index of the best scorer plus the indices scoring below the outlier
/// threshold.
fn find_best_and_outliers(performance_scores: &[PerformanceRec]) -> (usize, Vec<usize>) {
    let mut best_item_id = 0;
    for (item_id, rec) in performance_scores.iter().enumerate() {
        if rec.score() > performance_scores[best_item_id].score() {
            best_item_id = item_id;
        }
    }

    let average_score = performance_scores
        .iter()
        .map(PerformanceRec::score)
        .sum::<f64>()
        / performance_scores.len() as f64;

    let outlier_ids = performance_scores
        .iter()
        .enumerate()
        .filter(|(_, rec)| rec.score() < OUTLIER_SCORE_FRACTION * average_score)
        .map(|(item_id, _)| item_id)
        .collect();

    (best_item_id, outlier_ids)
}

fn run_training_episodes(
    white: &mut TdLambdaAgent,
    black: &mut TdLambdaAgent,
    episodes: i32,
    seed: &StateSeed,
    smart_training: bool,
) -> Result<Stats> {
    let mut callbacks = Callbacks::default();
    if smart_training {
        Board::train(
            white,
            black,
            episodes,
            seed,
            TRAINING_MOVES_WITHOUT_CAPTURE_CAP,
            &mut callbacks,
        )
    } else {
        Board::play(
            white,
            black,
            episodes,
            seed,
            TRAINING_MOVES_WITHOUT_CAPTURE_CAP,
            &mut callbacks,
        )
    }
}

fn run_self_training_episodes(
    agent: &mut TdLambdaAgent,
    episodes: i32,
    seed: &StateSeed,
    smart_training: bool,
) -> Result<Stats> {
    let mut callbacks = Callbacks::default();
    if smart_training {
        Board::train_self(
            agent,
            episodes,
            seed,
            TRAINING_MOVES_WITHOUT_CAPTURE_CAP,
            &mut callbacks,
        )
    } else {
        Board::play_self(
            agent,
            episodes,
            seed,
            TRAINING_MOVES_WITHOUT_CAPTURE_CAP,
            &mut callbacks,
        )
    }
}

fn draw_share(stats: &Stats, training_episodes_cnt: i32) -> f64 {
    f64::from(training_episodes_cnt - stats.blacks_win_count() - stats.whites_win_count())
        / f64::from(training_episodes_cnt)
}

/// Plays the agent against a random player as each color and records
/// the win/loss shares. The agent is evaluated fairly: exploration and
/// training are overlaid off for the duration.
fn evaluate_performance(
    agent: &mut TdLambdaAgent,
    training_episodes: i32,
    episodes_to_play: i32,
    round_id: i32,
    draw_percentage: f64,
) -> Result<PerformanceRec> {
    agent.set_performance_evaluation_mode(true);

    let factor = 1.0 / f64::from(episodes_to_play);
    let mut random_agent = RandomAgent::new();
    let seed = agent.state_type_id().start_seed();
    let cap = TRAINING_MOVES_WITHOUT_CAPTURE_CAP;

    let result = (|| -> Result<PerformanceRec> {
        let stats0 = Board::play(
            agent,
            &mut random_agent,
            episodes_to_play,
            &seed,
            cap,
            &mut Callbacks::default(),
        )?;
        let white_wins = f64::from(stats0.whites_win_count()) * factor;
        let white_losses = f64::from(stats0.blacks_win_count()) * factor;

        let stats1 = Board::play(
            &mut random_agent,
            agent,
            episodes_to_play,
            &seed,
            cap,
            &mut Callbacks::default(),
        )?;
        let black_wins = f64::from(stats1.blacks_win_count()) * factor;
        let black_losses = f64::from(stats1.whites_win_count()) * factor;

        Ok(PerformanceRec {
            round: round_id,
            perf_white: white_wins,
            losses_white: white_losses,
            perf_black: black_wins,
            losses_black: black_losses,
            draws: draw_percentage,
            training_episodes,
            test_episodes: episodes_to_play,
        })
    })();

    agent.set_performance_evaluation_mode(false);
    result
}
