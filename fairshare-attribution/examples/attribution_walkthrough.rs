use fairshare_attribution::{
    contributors, convergence_rate, AttributionEngine, AttributionInput, AxiomVerifier, Coalition,
    EngineConfig, SequenceCorpus, ShapleyConfig, ShapleyEstimator,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let corpus = SequenceCorpus::from_pairs([
        (vec!["search", "email", "social"], 1),
        (vec!["search", "social"], 1),
        (vec!["email", "social"], 0),
        (vec!["search", "email"], 1),
        (vec!["display"], 0),
        (vec!["display", "search"], 1),
    ]);
    let channels = corpus.contributors();

    let mut engine = AttributionEngine::new(EngineConfig::sample())?;
    let (attribution, elapsed) = engine.run(AttributionInput::Corpus(&corpus), &channels)?;
    println!("{}", serde_json::to_string_pretty(&attribution.results)?);
    println!(
        "ran in {elapsed:.3}s, epsilon spent {:.2}",
        attribution.diagnostics.privacy.epsilon_spent
    );
    if let Some(report) = &attribution.diagnostics.axioms {
        for violation in &report.violations {
            println!("axiom note: {violation}");
        }
    }

    let players = contributors(["A", "B", "C"]);
    let weighted = |s: &Coalition| {
        let mut score = 0.0;
        for (id, weight) in [("A", 3.0), ("B", 2.0), ("C", 1.0)] {
            if s.contains(id) {
                score += weight;
            }
        }
        score
    };
    let certified = AxiomVerifier::default().certified_shapley(&players, &weighted, 100.0)?;
    println!(
        "certified split of 100: {} (all axioms hold: {})",
        serde_json::to_string(&certified.attribution)?,
        certified.report.all_satisfied()
    );

    let synergy = |s: &Coalition| (s.len() as f64).powi(2);
    let counts = [100, 400, 1_600, 25_600];
    let mut estimates = Vec::with_capacity(counts.len());
    for &n in &counts {
        let estimator = ShapleyEstimator::new(ShapleyConfig {
            seed: Some(n as u64),
            ..ShapleyConfig::default()
        });
        estimates.push(estimator.monte_carlo(&players, &synergy, n)?.values);
    }
    if let Some(rate) = convergence_rate(&estimates, &counts) {
        println!("monte carlo convergence rate: {rate:.2}");
    }
    Ok(())
}
