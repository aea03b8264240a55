//! End-to-end search on synthetic data.
//!
//! Run with `cargo run -p bf-fitter --example search_demo [config.json]`.
//! Set `RUST_LOG=bf_fitter=debug,bf_optimizer=debug` to see every trial.

use bf_data::make_classification;
use bf_fitter::{FitterConfig, XgbFitter, XgbSearchSpace};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bf_fitter=info,bf_optimizer=info".into()),
        )
        .init();

    println!("BoostFit search demo");

    let config = match std::env::args().nth(1) {
        Some(path) => FitterConfig::from_json_file(path)?,
        None => FitterConfig::default().with_max_eval(10).with_seed(42),
    };
    println!(
        "Metric: {}, budget: {} trials",
        config.metric, config.max_eval
    );

    let data = make_classification(1_000, 8, 7)?;
    let (train, eval) = data.train_eval_split(0.25, 7)?;
    println!(
        "Generated {} train / {} eval rows with {} features",
        train.num_rows(),
        eval.num_rows(),
        train.feature_names().len()
    );

    let space = XgbSearchSpace::default().with_num_round(200, 20);
    let mut fitter = XgbFitter::with_space(config, space);
    fitter.search(&train, &eval)?;

    if let Some(loss) = fitter.best_loss() {
        println!("Best loss: {:.4}", loss);
    }
    let mut best: Vec<_> = fitter.opt_params().iter().collect();
    best.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in best {
        println!("  {name} = {value}");
    }

    // The model left on the fitter is from the last trial; refit with the best point.
    let best_params = fitter.opt_params().clone();
    fitter.train(&train, &eval, &best_params)?;
    let model = fitter
        .model()
        .ok_or_else(|| anyhow::anyhow!("refit produced no model"))?;
    let unlabeled = eval.without_label()?;
    let predictions = if fitter.config().metric.uses_scores() {
        model.predict(&unlabeled)?
    } else {
        model.predict_labels(&unlabeled, fitter.config().threshold)?
    };
    let truth = eval.labels()?;
    println!("Refit eval loss: {:.4}", fitter.loss(&truth, &predictions)?);

    Ok(())
}
