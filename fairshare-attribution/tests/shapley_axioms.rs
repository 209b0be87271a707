use fairshare_attribution::{
    contributors, solo_contributions, AxiomVerifier, Coalition, Contributor, GameSum, ShapleyConfig,
    ShapleyError, ShapleyEstimator, ShapleyRun,
};
use pretty_assertions::assert_eq;

fn seeded(seed: u64) -> ShapleyEstimator {
    ShapleyEstimator::new(ShapleyConfig {
        seed: Some(seed),
        ..ShapleyConfig::default()
    })
}

fn uniform_share(s: &Coalition) -> f64 {
    s.len() as f64 / 3.0
}

fn squared_size(s: &Coalition) -> f64 {
    (s.len() as f64).powi(2)
}

#[test]
fn uniform_game_splits_evenly() {
    let players = contributors(["A", "B", "C"]);
    let exact = seeded(1).exact(&players, &uniform_share).unwrap();
    for player in &players {
        assert!((exact.weight(player.as_str()) - 1.0 / 3.0).abs() < 1e-12);
    }

    let sampled = seeded(2).monte_carlo(&players, &uniform_share, 5_000).unwrap();
    assert_eq!(sampled.samples, 5_000);
    for player in &players {
        assert!((sampled.values.weight(player.as_str()) - 1.0 / 3.0).abs() < 0.02);
    }
}

#[test]
fn efficiency_holds_for_exact_and_sampled() -> anyhow::Result<()> {
    let players = contributors(["A", "B", "C", "D"]);
    let glove = |s: &Coalition| {
        let left = ["A", "B"].iter().filter(|id| s.contains(id)).count();
        let right = ["C", "D"].iter().filter(|id| s.contains(id)).count();
        left.min(right) as f64
    };
    let exact = seeded(3).exact(&players, &glove)?;
    assert!((exact.total() - 2.0).abs() < 1e-9);

    let sampled = seeded(4).monte_carlo(&players, &glove, 2_000)?;
    assert!((sampled.values.total() - 2.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn symmetric_players_receive_equal_credit() {
    let players = contributors(["A", "B", "C"]);
    // A and B are interchangeable; C only matters alongside one of them.
    let v = |s: &Coalition| {
        let pair = usize::from(s.contains("A")) + usize::from(s.contains("B"));
        let bonus = if s.contains("C") && pair > 0 { 1.0 } else { 0.0 };
        pair as f64 + bonus
    };
    let values = seeded(5).exact(&players, &v).unwrap();
    assert!((values.weight("A") - values.weight("B")).abs() < 1e-12);

    let verifier = AxiomVerifier::default();
    let solo = solo_contributions(&players, &v);
    assert!(verifier.symmetry(&values, &solo).satisfied);
}

#[test]
fn null_player_gets_nothing() {
    let players = contributors(["A", "B", "Z"]);
    let v = |s: &Coalition| {
        let present = usize::from(s.contains("A")) + usize::from(s.contains("B"));
        (present as f64).powi(2)
    };
    let values = seeded(6).exact(&players, &v).unwrap();
    assert!(values.weight("Z").abs() < 1e-12);

    let solo = solo_contributions(&players, &v);
    let check = AxiomVerifier::default().null_player(&values, &solo);
    assert!(check.satisfied, "{:?}", check.violators);
}

#[test]
fn additivity_over_summed_games() {
    let players = contributors(["A", "B", "C"]);
    let v1 = |s: &Coalition| if s.contains("A") && s.contains("C") { 2.0 } else { 0.0 };
    let v2 = squared_size;
    let estimator = seeded(7);
    let a = estimator.exact(&players, &v1).unwrap();
    let b = estimator.exact(&players, &v2).unwrap();
    let combined = estimator.exact(&players, &GameSum(v1, v2)).unwrap();

    let check = AxiomVerifier::default().additivity(&a, &b, &combined);
    assert!(check.satisfied, "max_error={}", check.max_error);
}

#[test]
fn more_samples_shrink_standard_error() {
    let players = contributors(["A", "B", "C"]);
    let small = seeded(8).monte_carlo(&players, &squared_size, 100).unwrap();
    let large = seeded(9).monte_carlo(&players, &squared_size, 10_000).unwrap();
    let small_se = small.standard_errors();
    let large_se = large.standard_errors();
    for player in &players {
        assert!(large_se[player] < small_se[player]);
    }
    for player in &players {
        assert!((large.values.weight(player.as_str()) - 3.0).abs() < 0.1);
    }
}

#[test]
fn large_games_require_sampling() {
    let players: Vec<Contributor> = (0..15).map(|i| Contributor::new(format!("p{i}"))).collect();
    let err = seeded(10).exact(&players, &squared_size).unwrap_err();
    assert_eq!(err.to_string(), "exact Shapley requires n <= 10, got n=15");
    assert_eq!(err, ShapleyError::ExactLimit { limit: 10, got: 15 });

    let run = seeded(10).estimate(&players, &squared_size).unwrap();
    let ShapleyRun::MonteCarlo(estimate) = run else {
        panic!("expected monte carlo for 15 contributors");
    };
    assert!((estimate.values.total() - 225.0).abs() < 1e-6);
}

#[test]
fn certified_shapley_scales_to_outcome() {
    let players = contributors(["A", "B", "C"]);
    let certified = AxiomVerifier::default()
        .certified_shapley(&players, &uniform_share, 30.0)
        .unwrap();
    assert!((certified.attribution.total() - 30.0).abs() < 1e-9);
    assert!(certified.report.all_satisfied());
}
