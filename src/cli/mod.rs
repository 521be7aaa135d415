//! Command-line interface
//!
//! Runs the pipeline stages individually or end to end, makes one-off
//! predictions and starts the web server.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::feature_store::{DataTransformation, FeatureStore};
use crate::inference::{CongestionPredictor, CustomData, InferenceConfig, PredictionOutput};
use crate::ingestion::DataIngestion;
use crate::server::{run_server, ServerConfig};
use crate::training::{ModelTrainer, TrainerConfig, TrainingOutcome};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{key:<14}")), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "congestion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Traffic congestion forecasting pipeline")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON pipeline configuration; defaults plus CONGESTION_* overrides when absent
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download or read the raw data and write the train/test split
    Ingest {
        /// Raw data location (local parquet/CSV path or http(s) URL)
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Engineer features, fit the preprocessor and fill the feature store
    Transform,

    /// Grid-search the regressor on the feature store
    Train {
        /// Number of cross-validation folds
        #[arg(long, default_value = "3")]
        cv_folds: usize,

        /// Skip scoring the test split
        #[arg(long)]
        no_evaluate: bool,

        /// Do not register the model or write run params
        #[arg(long)]
        no_save: bool,
    },

    /// Ingest, transform and train in one go
    Run,

    /// Predict congestion for one reading at the current time
    Predict {
        #[arg(long, allow_hyphen_values = true)]
        x: i64,

        #[arg(long, allow_hyphen_values = true)]
        y: i64,

        /// Direction of travel, e.g. EB or NB
        #[arg(short, long)]
        direction: String,

        /// Print the preprocessed features instead of the prediction
        #[arg(long)]
        transformed: bool,
    },

    /// Start the web server
    Serve {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
}

/// Pipeline configuration from `--config` or the environment
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_ingest(config: &PipelineConfig) -> anyhow::Result<(PathBuf, PathBuf)> {
    section("Ingest");
    step_run(&format!("Reading {}", accent(&config.source)));
    let start = Instant::now();
    let (train, test) = DataIngestion::new(config.clone()).initiate().await?;
    step_done(&format!("{:?}", start.elapsed()));
    step_ok(&kv("train", &train.display().to_string()));
    step_ok(&kv("test", &test.display().to_string()));
    Ok((train, test))
}

pub fn cmd_transform(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Transform");
    let paths = &config.paths;

    step_run("Engineering features and fitting preprocessor");
    let start = Instant::now();
    let (mut train, mut test) =
        DataTransformation::new(config.clone()).initiate(&paths.train_data, &paths.test_data, true)?;
    step_done(&format!("{} features in {:?}", train.width().saturating_sub(1), start.elapsed()));

    step_run("Writing feature store");
    let (train_path, test_path) = FeatureStore::new(paths).store(&mut train, &mut test)?;
    step_done("");
    step_ok(&kv("preprocessor", &paths.preprocessor.display().to_string()));
    step_ok(&kv("train", &train_path.display().to_string()));
    step_ok(&kv("test", &test_path.display().to_string()));
    Ok(())
}

pub fn cmd_train(config: &PipelineConfig, cv_folds: usize, evaluate: bool, save: bool) -> anyhow::Result<()> {
    section("Train");
    let trainer_config = TrainerConfig::default()
        .with_cv_folds(cv_folds)
        .with_evaluate(evaluate)
        .with_persist(save);
    let candidates = trainer_config.grid.n_candidates();

    step_run(&format!("Searching {} candidates × {} folds", candidates, cv_folds));
    let start = Instant::now();
    let mut trainer = ModelTrainer::new(config.clone(), trainer_config);
    let outcome = trainer.initiate()?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    for (name, value) in outcome.params() {
        println!("  {}", kv(name, &value.to_string()));
    }
    if let TrainingOutcome::Evaluated { rmse, .. } = &outcome {
        println!("  {}", kv("test RMSE", &format!("{rmse:.4}")).bold());
    }
    if let Some(entry) = trainer.registered() {
        println!("  {}", kv("model", &entry.uri));
    }
    println!();
    Ok(())
}

pub async fn cmd_run(config: &PipelineConfig) -> anyhow::Result<()> {
    print_banner(config);
    cmd_ingest(config).await?;
    cmd_transform(config)?;
    cmd_train(config, TrainerConfig::default().search.cv_folds, true, true)
}

pub fn cmd_predict(
    config: &PipelineConfig,
    x: i64,
    y: i64,
    direction: &str,
    transformed: bool,
) -> anyhow::Result<()> {
    section("Predict");
    step_run("Loading preprocessor and model");
    let inference = InferenceConfig::new().with_return_transformed(transformed);
    let predictor = CongestionPredictor::load(config, inference)?;
    step_done(predictor.model_uri().unwrap_or_default());

    let data = CustomData::new(x, y, direction);
    match predictor.predict_one(&data)? {
        PredictionOutput::Prediction(values) => {
            for value in values.iter() {
                println!("  {}", kv("congestion", &format!("{value:.2}")).bold());
            }
        }
        PredictionOutput::Transformed(df) => println!("{df}"),
    }
    println!();
    Ok(())
}

pub async fn cmd_serve(config: PipelineConfig, host: &str, port: u16) -> anyhow::Result<()> {
    section("Server");
    step_ok(&kv("address", &format!("http://{host}:{port}")));
    println!();
    let server = ServerConfig::default()
        .with_host(host)
        .with_port(port)
        .with_pipeline(config);
    run_server(server).await
}

fn print_banner(config: &PipelineConfig) {
    println!();
    line_box_top();
    line_box(&format!("{}", "Congestion Forecast".white().bold()));
    line_box(&kv("target", &config.target));
    line_box(&kv("model", &config.model_name));
    line_box(&kv("split", &format!("{:.0}% test, seed {}", config.test_size * 100.0, config.random_state)));
    line_box_bottom();
}
