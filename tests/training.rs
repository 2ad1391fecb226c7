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

//! End-to-end training scenarios.

use riff_train::agent::reset_explorer;
use riff_train::{
    Board, Callbacks, EnsembleAgent, RandomAgent, StateTypeId, TdLambdaAgent, TrainingEngine,
};

fn checkers_agent(name: &str) -> TdLambdaAgent {
    TdLambdaAgent::new(&[16], 0.1, 0.4, 0.9, 0.02, StateTypeId::CHECKERS, name).unwrap()
}

/// Two identical agents trained through identical episodes with an
/// identically seeded explorer must end up identical — the determinism
/// the regression suite leans on.
#[test]
fn deterministic_self_play_reproduces_the_agent() {
    let _ = env_logger::builder().is_test(true).try_init();

    let template = checkers_agent("agent0");
    let seed = StateTypeId::CHECKERS.start_seed();

    let mut first = template.clone();
    reset_explorer(42);
    let first_stats =
        Board::play_self(&mut first, 20, &seed, 50, &mut Callbacks::default()).unwrap();

    let mut second = template.clone();
    reset_explorer(42);
    let second_stats =
        Board::play_self(&mut second, 20, &seed, 50, &mut Callbacks::default()).unwrap();

    assert_eq!(first_stats, second_stats);
    assert_eq!(first, second, "training must be bit-for-bit reproducible");
    assert!(first.equal_sub_agents(&second));
    assert_ne!(
        first, template,
        "twenty episodes must have moved the weights"
    );
}

/// Training should make an agent at least hold its own against a random
/// player. The bar is deliberately low: the test guards the plumbing,
/// not the playing strength.
#[test]
fn trained_agent_plays_a_random_opponent() {
    let mut agent = checkers_agent("learner");
    let seed = StateTypeId::CHECKERS.start_seed();

    Board::play_self(&mut agent, 30, &seed, 50, &mut Callbacks::default()).unwrap();

    agent.set_performance_evaluation_mode(true);
    let mut random = RandomAgent::new();
    let stats = Board::play(&mut agent, &mut random, 10, &seed, 50, &mut Callbacks::default())
        .unwrap();
    assert_eq!(stats.total_episodes_count(), 10);
}

#[test]
fn engine_round_with_outlier_replacement() {
    let mut a0 = checkers_agent("e0");
    let mut a1 = checkers_agent("e1");
    let mut a2 = checkers_agent("e2");
    let mut a3 = checkers_agent("e3");

    let mut engine = TrainingEngine::new(vec![&mut a0, &mut a1, &mut a2, &mut a3]);
    engine
        .run(
            0,
            1,
            2,
            |elapsed, records| {
                assert!(elapsed.as_nanos() > 0);
                assert_eq!(records.len(), 4);
            },
            false,
            1,
            false,
            true,
        )
        .unwrap();
}

#[test]
fn ensemble_of_trained_agents_plays() {
    let mut members = Vec::new();
    for name in ["m0", "m1", "m2"] {
        let mut member = checkers_agent(name);
        let seed = StateTypeId::CHECKERS.start_seed();
        Board::play_self(&mut member, 5, &seed, 50, &mut Callbacks::default()).unwrap();
        members.push(member);
    }

    let mut ensemble = EnsembleAgent::new(members, "committee");
    let mut random = RandomAgent::new();
    let seed = StateTypeId::CHECKERS.start_seed();

    let stats = Board::play(
        &mut ensemble,
        &mut random,
        5,
        &seed,
        50,
        &mut Callbacks::default(),
    )
    .unwrap();
    assert_eq!(stats.total_episodes_count(), 5);
}

/// A serialized trained agent must come back equal and keep playing.
#[test]
fn persistence_survives_training() {
    let mut agent = checkers_agent("saved");
    let seed = StateTypeId::CHECKERS.start_seed();
    Board::play_self(&mut agent, 10, &seed, 50, &mut Callbacks::default()).unwrap();

    let bytes = agent.to_bytes().unwrap();
    let mut restored = TdLambdaAgent::from_bytes(&bytes).unwrap();
    assert_eq!(agent, restored);

    let stats =
        Board::play_self(&mut restored, 2, &seed, 50, &mut Callbacks::default()).unwrap();
    assert_eq!(stats.total_episodes_count(), 2);
}

/// The TD-search path: a scratch net is trained per move and dropped on
/// episode end; the game must still complete.
#[test]
fn td_search_episode_completes() {
    let mut agent = checkers_agent("searcher");
    agent.set_tree_search_method(riff_train::agent::SearchMethod::TdSearch);
    agent.set_td_search_iterations(2);
    agent.set_search_depth(5);

    let mut random = RandomAgent::new();
    let seed = StateTypeId::CHECKERS.start_seed();
    let stats = Board::play(
        &mut agent,
        &mut random,
        1,
        &seed,
        30,
        &mut Callbacks::default(),
    )
    .unwrap();
    assert_eq!(stats.total_episodes_count(), 1);
}
