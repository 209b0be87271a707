use std::io::Write;

use fairshare_attribution::{
    compute_complete_attribution, contributors, load_config, AttributionEngine, AttributionInput,
    Coalition, ConfigFormat, Contributor, EngineConfig, EngineError, SequenceCorpus, ShapleyMethod,
};
use pretty_assertions::assert_eq;

fn journeys() -> SequenceCorpus {
    SequenceCorpus::from_pairs([
        (vec!["A", "B", "C"], 1),
        (vec!["A", "C"], 1),
        (vec!["B", "C"], 0),
        (vec!["A", "B"], 1),
    ])
}

#[test]
fn corpus_run_produces_all_four_vectors() -> anyhow::Result<()> {
    let corpus = journeys();
    let players = corpus.contributors();
    let (attribution, elapsed) =
        compute_complete_attribution(AttributionInput::Corpus(&corpus), &players, 1.0)?;
    assert!(elapsed >= 0.0);

    let results = &attribution.results;
    let markov = results.markov.as_ref().expect("corpus input yields markov");
    for vector in [&results.shapley, markov, &results.hybrid, &results.private] {
        assert_eq!(vector.len(), 3);
        assert!((vector.total() - 1.0).abs() < 1e-9);
        assert!(vector.iter().all(|(_, w)| *w >= 0.0));
    }
    assert!(attribution.diagnostics.markov_uniform_fallback);
    assert_eq!(attribution.diagnostics.privacy.queries, 1);
    Ok(())
}

#[test]
fn results_serialize_as_contributor_maps() -> anyhow::Result<()> {
    let players = contributors(["A", "B"]);
    let v = |s: &Coalition| s.len() as f64;
    let mut engine = AttributionEngine::new(EngineConfig::sample())?;
    let (attribution, _) = engine.run(AttributionInput::ValueFunction(&v), &players)?;

    let json = serde_json::to_value(&attribution.results)?;
    assert_eq!(json["shapley"], serde_json::json!({"A": 0.5, "B": 0.5}));
    assert!(json.get("markov").is_none());
    assert!(json["private"]["A"].is_f64());
    Ok(())
}

#[test]
fn both_inputs_blend_value_function_and_journeys() -> anyhow::Result<()> {
    let corpus = journeys();
    let players = corpus.contributors();
    // All credit to A on the Shapley side; Markov is uniform for these journeys.
    let v = |s: &Coalition| if s.contains("A") { 1.0 } else { 0.0 };
    let mut config = EngineConfig::sample();
    config.hybrid.alpha = 0.5;
    let mut engine = AttributionEngine::new(config)?;
    let (attribution, _) = engine.run(
        AttributionInput::Both {
            value_fn: &v,
            corpus: &corpus,
        },
        &players,
    )?;
    let hybrid = &attribution.results.hybrid;
    assert!((hybrid.weight("A") - (0.5 + 0.5 / 3.0)).abs() < 1e-12);
    assert!((hybrid.weight("B") - 0.5 / 3.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn large_contributor_sets_switch_to_sampling() -> anyhow::Result<()> {
    let players: Vec<Contributor> = (0..12).map(|i| Contributor::new(format!("c{i:02}"))).collect();
    let v = |s: &Coalition| s.len() as f64;
    let mut engine = AttributionEngine::new(EngineConfig::sample())?;
    let (attribution, _) = engine.run(AttributionInput::ValueFunction(&v), &players)?;

    let diagnostics = &attribution.diagnostics;
    assert_eq!(diagnostics.shapley_method, ShapleyMethod::MonteCarlo);
    assert_eq!(diagnostics.samples, 1_000);
    assert_eq!(diagnostics.standard_errors.as_ref().map(|se| se.len()), Some(12));
    for player in &players {
        assert!((attribution.results.shapley.weight(player.as_str()) - 1.0 / 12.0).abs() < 1e-9);
    }
    Ok(())
}

#[test]
fn duplicate_contributors_are_rejected() {
    let players = contributors(["A", "A"]);
    let v = |s: &Coalition| s.len() as f64;
    let err = compute_complete_attribution(AttributionInput::ValueFunction(&v), &players, 1.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::Shapley(_)));
}

#[test]
fn engine_from_config_file() -> anyhow::Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        "[hybrid]\nalpha = 1.0\n\n[privacy]\nepsilon = 2.0\nseed = 3\n\n[axioms]\nenabled = false"
    )?;
    let config = load_config(file.path(), ConfigFormat::Auto)?;
    let mut engine = AttributionEngine::new(config)?;

    let corpus = journeys();
    let players = corpus.contributors();
    let (attribution, _) = engine.run(AttributionInput::Corpus(&corpus), &players)?;
    let results = &attribution.results;
    for (player, weight) in &results.shapley {
        assert!((results.hybrid.weight(player.as_str()) - weight).abs() < 1e-12);
    }
    assert!(attribution.diagnostics.axioms.is_none());
    assert_eq!(engine.privacy().privacy_spent(), 2.0);
    Ok(())
}
