//! cardiorisk CLI Module
//!
//! One subcommand per pipeline stage, plus a local one-off prediction.

use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{env_lookup, optional_or};
use crate::inference::{FeatureVector, ModelCache, ModelLocation, Predictor};
use crate::pipeline::{run_preprocess, run_training, PreprocessConfig};
use crate::storage::{LocalObjectStore, ObjectStore};
use crate::training::{TrainingConfig, TrainingReport};

/// Default root of the local object store
pub const DEFAULT_STORAGE_ROOT: &str = "./storage";

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("  {} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv_line(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cardiorisk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart disease risk pipeline: encode, balance, train, serve")]
#[command(long_about = None)]
pub struct Cli {
    /// Root directory of the object store (overrides STORAGE_ROOT)
    #[arg(long, global = true)]
    pub storage_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a raw survey table and write the encoded and balanced tables
    Preprocess {
        /// Container holding the raw table
        #[arg(short, long)]
        container: String,

        /// Key of the raw table
        #[arg(short, long)]
        key: String,
    },

    /// Train the forest on the balanced table and store the artifact
    Train {
        /// Container of the balanced table (defaults to DESTINATION_BUCKET)
        #[arg(short, long)]
        container: Option<String>,

        /// Key of the balanced table (defaults to UPSAMPLED_FILE)
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Serve predictions over HTTP
    Serve {
        /// Listen host (overrides API_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Predict one record with the model at MODEL_BUCKET/MODEL_KEY
    Predict {
        #[arg(long)]
        bmi: f64,
        /// Physical health score
        #[arg(long)]
        score: f64,
        #[arg(long)]
        smoke: i64,
        #[arg(long)]
        stroke: i64,
        /// 1 for female, 0 otherwise
        #[arg(long)]
        sex: i64,
        /// Lower bound of the age bucket
        #[arg(long)]
        age: f64,
        #[arg(long)]
        diabetic: i64,
        #[arg(long)]
        kidney: i64,
    },
}

/// Resolve the store root from the flag, then STORAGE_ROOT, then the default
pub fn storage_from(root: Option<PathBuf>) -> Arc<dyn ObjectStore> {
    let root = root.unwrap_or_else(|| {
        PathBuf::from(optional_or(&env_lookup, "STORAGE_ROOT", DEFAULT_STORAGE_ROOT))
    });
    Arc::new(LocalObjectStore::new(root))
}

pub async fn cmd_preprocess(store: Arc<dyn ObjectStore>, container: &str, key: &str) -> anyhow::Result<()> {
    section("Preprocess");
    let config = PreprocessConfig::from_env()?;

    step_run(&format!("Encoding and balancing {}/{}", container, key));
    let start = Instant::now();
    let summary = run_preprocess(store.as_ref(), &config, container, key).await?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    kv_line("Encoded rows", &summary.encoded_rows.to_string());
    kv_line("Balanced rows", &summary.balanced_rows.to_string());
    kv_line("EDA file", &format!("{}/{}", config.destination_bucket, config.eda_file));
    kv_line("Balanced file", &format!("{}/{}", config.destination_bucket, config.upsampled_file));
    println!();
    Ok(())
}

pub async fn cmd_train(
    store: Arc<dyn ObjectStore>,
    container: Option<String>,
    key: Option<String>,
) -> anyhow::Result<()> {
    section("Train");
    // Hyperparameters are validated before any data is read
    let config = TrainingConfig::from_env()?;
    let defaults = PreprocessConfig::from_env()?;
    let container = container.unwrap_or(defaults.destination_bucket);
    let key = key.unwrap_or(defaults.upsampled_file);

    step_run(&format!("Training {} trees on {}/{}", config.tree_count, container, key));
    let report = run_training(store.as_ref(), &config, &container, &key, &defaults.target_column).await?;
    step_done(&format!("{:.3}s", report.training_time_secs));

    print_report(&report);
    kv_line("Artifact", &format!("{}/{}", config.export_bucket, config.export_filename));
    println!();
    Ok(())
}

fn print_report(report: &TrainingReport) {
    println!();
    kv_line("Train rows", &report.n_train.to_string());
    kv_line("Test rows", &report.n_test.to_string());
    println!("  {:<18} {}", muted("Accuracy"), format!("{:.4}", report.metrics.accuracy).white().bold());
    kv_line("Precision", &format!("{:.4}", report.metrics.precision));
    kv_line("Recall", &format!("{:.4}", report.metrics.recall));
    kv_line("F1", &format!("{:.4}", report.metrics.f1_score));
    for (name, importance) in &report.feature_importances {
        kv_line(&format!("  {}", name), &format!("{:.4}", importance));
    }
}

pub async fn cmd_serve(store: Arc<dyn ObjectStore>, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    section("Serve");
    kv_line("Predict", &format!("http://{}:{}/predict", config.host, config.port));
    kv_line("Health", &format!("http://{}:{}/health", config.host, config.port));
    kv_line("Model", &config.model.to_string());
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    run_server(config, store).await
}

pub async fn cmd_predict(store: Arc<dyn ObjectStore>, fields: &[(&str, String)]) -> anyhow::Result<()> {
    section("Predict");
    let params: HashMap<String, String> = fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    let features = FeatureVector::from_query(&params)?;

    let cache = Arc::new(ModelCache::new(store, ModelLocation::from_env()?));
    let predictor = Predictor::new(cache);
    let prediction = predictor.predict(&features).await?;

    let verdict = if prediction.predicted_class == 1 {
        "heart disease".red().bold()
    } else {
        "no heart disease".green().bold()
    };
    println!("  {:<18} {}", muted("Prediction"), verdict);
    kv_line("Probability", &format!("{:.4}", prediction.probability));
    println!();
    Ok(())
}
