//! Long-run win rates land where the probability says they should.

use monty_sim::{
    DeterministicRng, HostModel, PlayerStrategy, Seed, SimulationConfig, compute_statistics,
    run_batch, run_strategy_comparison,
};
use std::ops::ControlFlow;

const SAMPLE_SIZE: u64 = 50_000;
const TOLERANCE: f64 = 0.02;

fn win_rate(config: &SimulationConfig, seed: &str) -> f64 {
    let mut rng = DeterministicRng::new(Seed::from(seed));
    let results = run_batch(config, &mut rng, SAMPLE_SIZE).expect("valid config");
    compute_statistics(&results).win_rate
}

fn classic(strategy: PlayerStrategy) -> SimulationConfig {
    SimulationConfig {
        host_model: HostModel::Classic,
        player_strategy: strategy,
        ..SimulationConfig::default()
    }
}

#[test]
fn always_switch_wins_two_thirds() {
    let observed = win_rate(&classic(PlayerStrategy::AlwaysSwitch), "12345");
    assert!(
        (observed - 2.0 / 3.0).abs() < TOLERANCE,
        "always-switch win rate {observed:.4} not near 2/3"
    );
}

#[test]
fn never_switch_wins_one_third() {
    let observed = win_rate(&classic(PlayerStrategy::NeverSwitch), "12345");
    assert!(
        (observed - 1.0 / 3.0).abs() < TOLERANCE,
        "never-switch win rate {observed:.4} not near 1/3"
    );
}

#[test]
fn coin_flip_player_wins_half() {
    let observed = win_rate(&classic(PlayerStrategy::RandomSwitch), "coin");
    assert!(
        (observed - 0.5).abs() < TOLERANCE,
        "random-switch win rate {observed:.4} not near 1/2"
    );
}

#[test]
fn ignorant_host_makes_switching_a_coin_flip() {
    // Spoiled rounds are losses; among the rest, switching wins half the time.
    let config = SimulationConfig {
        host_model: HostModel::Ignorant,
        ..classic(PlayerStrategy::AlwaysSwitch)
    };
    let observed = win_rate(&config, "ignorant");
    assert!(
        (observed - 1.0 / 3.0).abs() < TOLERANCE,
        "ignorant-host switch win rate {observed:.4} not near 1/3"
    );
}

#[test]
fn switching_on_many_doors_tracks_closed_form() {
    // n doors, host opens one goat: P(win | switch) = (n - 1) / (n * (n - 2)).
    let config = SimulationConfig {
        door_count: 5,
        ..classic(PlayerStrategy::AlwaysSwitch)
    };
    let expected = 4.0 / 15.0;
    let observed = win_rate(&config, "five");
    assert!(
        (observed - expected).abs() < TOLERANCE,
        "5-door switch win rate {observed:.4} not near {expected:.4}"
    );
}

#[test]
fn comparison_orders_strategies() {
    let mut rng = DeterministicRng::new(Seed::from("compare"));
    let report = run_strategy_comparison(
        &SimulationConfig::default(),
        &mut rng,
        SAMPLE_SIZE * 3,
        5_000,
        false,
        |_| ControlFlow::Continue(()),
    )
    .expect("valid config");

    let cmp = report.comparison;
    assert!(cmp.always_switch.win_rate > cmp.random_switch.win_rate);
    assert!(cmp.random_switch.win_rate > cmp.never_switch.win_rate);
    assert!((cmp.always_switch.win_rate - 2.0 / 3.0).abs() < TOLERANCE);
    assert!((cmp.never_switch.win_rate - 1.0 / 3.0).abs() < TOLERANCE);
}
