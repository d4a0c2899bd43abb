//! Offline model training.
//!
//! Fits the price model over the stored history, prints hold-out metrics and
//! publishes the result to the artifact slot the monitor loads at startup.
//! A running monitor keeps its in-memory model until it restarts or retrains.

use anyhow::{Context, Result};
use clap::Parser;
use goldwatch::application::ml::{ModelTrainer, SmartcoreLinearFitter, TrainerSettings};
use goldwatch::config::Config;
use goldwatch::domain::market::Observation;
use goldwatch::domain::ml::Model;
use goldwatch::domain::ml::feature_registry::signal_name;
use goldwatch::domain::repositories::{ModelArtifactStore, ObservationRepository};
use goldwatch::infrastructure::model_artifacts::JsonModelArtifactStore;
use goldwatch::infrastructure::persistence::{Database, SqliteObservationRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of most recent observations to train on (default: TRAINING_WINDOW)
    #[arg(long)]
    window: Option<usize>,

    /// Share of the window held out for validation (default: VALIDATION_FRACTION)
    #[arg(long)]
    validation_fraction: Option<f64>,

    /// Override MODEL_PATH
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Write the training rows and the fitted predictions to this CSV file
    #[arg(long)]
    export_csv: Option<PathBuf>,

    /// Fit and report, but do not publish the artifact
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = Config::from_env()?;
    if let Some(path) = args.model_path {
        config.model.model_path = path;
    }
    if let Some(window) = args.window {
        config.model.training_window = window;
    }
    if let Some(fraction) = args.validation_fraction {
        config.model.validation_fraction = fraction;
    }
    config.validate()?;

    let db = Database::new(&config.storage.database_url)
        .await
        .context("Failed to open observation store")?;
    let repository = SqliteObservationRepository::new(db.pool.clone(), config.storage.auxiliary_arity);
    let artifacts = JsonModelArtifactStore::new(&config.model.model_path);

    let history = repository.recent(config.model.training_window).await?;
    println!(
        "Loaded {} observations (of {} stored)",
        history.len(),
        repository.count().await?
    );

    let current = artifacts.load().await?;
    let trainer = ModelTrainer::new(
        Arc::new(SmartcoreLinearFitter),
        TrainerSettings::from(&config.model),
    );
    let model = trainer
        .train(&history, current.as_ref(), chrono::Utc::now())
        .context("Training failed")?;

    print_report(&model, current.as_ref());

    if let Some(path) = &args.export_csv {
        export_csv(path, &history, &model)?;
        println!("Exported {} rows to {:?}", history.len(), path);
    }

    if args.dry_run {
        println!("Dry run: model not published.");
        return Ok(());
    }

    artifacts.save(&model).await?;
    info!("Published model v{} to {:?}", model.version, artifacts.path());
    println!("Done. Model v{} saved to {:?}.", model.version, artifacts.path());
    Ok(())
}

fn print_report(model: &Model, previous: Option<&Model>) {
    println!("\n══════════════════ MODEL v{} ══════════════════", model.version);
    println!("  Intercept:  {:.6}", model.parameters.intercept);
    for (idx, coefficient) in model.feature_spec.iter().zip(&model.parameters.coefficients) {
        println!("  {:<14} {:+.6}", signal_name(*idx), coefficient);
    }

    let v = &model.validation;
    println!(
        "\n  Samples: {} train / {} validation",
        v.train_samples, v.validation_samples
    );
    match (v.rmse, v.mae) {
        (Some(rmse), Some(mae)) => println!("  Hold-out: RMSE={:.4}, MAE={:.4}", rmse, mae),
        _ => println!("  Hold-out: (empty partition)"),
    }

    if let Some(prev) = previous {
        match (prev.validation.rmse, v.rmse) {
            (Some(old), Some(new)) => println!(
                "  Previous v{} RMSE={:.4} ({:+.4})",
                prev.version,
                old,
                new - old
            ),
            _ => println!("  Previous v{} (no comparable metrics)", prev.version),
        }
    }
    println!("══════════════════════════════════════════════════\n");
}

fn export_csv(path: &Path, history: &[Observation], model: &Model) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    let arity = history.first().map(|o| o.arity()).unwrap_or(0);
    let mut header = vec!["timestamp".to_string(), "price".to_string()];
    header.extend((0..arity).map(signal_name));
    header.push("predicted".to_string());
    wtr.write_record(&header)?;

    for observation in history {
        let mut record = vec![
            observation.timestamp().to_rfc3339(),
            observation.primary_value().to_string(),
        ];
        record.extend(observation.auxiliary_values().iter().map(|v| v.to_string()));
        record.push(
            model
                .predict(observation.auxiliary_values())
                .map(|p| p.to_string())
                .unwrap_or_default(),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}
