//! Housing Pipeline CLI
//!
//! Each stage can be run on its own with explicit paths, the same way an
//! external orchestrator would call it:
//! ```bash
//! housing-pipeline extract --data-url california_housing --output-csv data/raw.csv
//! housing-pipeline preprocess --input-csv data/raw.csv --train-csv data/train.csv --test-csv data/test.csv
//! housing-pipeline train --train-csv data/train.csv --model data/model.bin
//! housing-pipeline evaluate --test-csv data/test.csv --model data/model.bin --metrics-json data/metrics.json
//! ```
//!
//! Or compile the pipeline, or run it end to end locally:
//! ```bash
//! housing-pipeline compile --output pipeline.yaml --components-dir components
//! housing-pipeline run --workdir runs/latest
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use housing_pipeline::config::PipelineConfig;
use housing_pipeline::metrics::MetricsRecord;
use housing_pipeline::pipeline::{LocalRunner, PipelineSpec, Workflow};
use housing_pipeline::source::DatasetClient;
use housing_pipeline::stages::{self, Component};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "housing-pipeline")]
#[command(author, version, about = "Housing price pipeline: extract, preprocess, train, evaluate")]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the dataset named by a locator and write it as CSV
    Extract {
        /// Data source locator (california_housing, URL or path)
        #[arg(long, default_value = "california_housing")]
        data_url: String,

        #[arg(long)]
        output_csv: PathBuf,
    },

    /// Drop incomplete records and split into train/test sets
    Preprocess {
        #[arg(long)]
        input_csv: PathBuf,

        #[arg(long)]
        train_csv: PathBuf,

        #[arg(long)]
        test_csv: PathBuf,
    },

    /// Train the Random Forest and save the model
    Train {
        #[arg(long)]
        train_csv: PathBuf,

        #[arg(long)]
        model: PathBuf,
    },

    /// Evaluate the model on the test set and save metrics
    Evaluate {
        #[arg(long)]
        test_csv: PathBuf,

        #[arg(long)]
        model: PathBuf,

        #[arg(long)]
        metrics_json: PathBuf,
    },

    /// Compile the pipeline and component interfaces to YAML
    Compile {
        /// Output workflow file
        #[arg(short, long, default_value = "pipeline.yaml")]
        output: PathBuf,

        /// Directory for per-component YAML files
        #[arg(long, default_value = "components")]
        components_dir: PathBuf,
    },

    /// Run the whole pipeline locally
    Run {
        /// Data source locator; defaults to the pipeline's declared default
        #[arg(long)]
        data_url: Option<String>,

        /// Output directory (overrides run.workdir from the config)
        #[arg(short, long)]
        workdir: Option<PathBuf>,

        /// Run a compiled workflow file instead of the built-in pipeline
        #[arg(long)]
        workflow: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("housing_pipeline=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Extract {
            data_url,
            output_csv,
        } => {
            let client = DatasetClient::new(&config.source)?;
            let n = stages::data_extraction(&client, &data_url, &output_csv)
                .context("Data extraction failed")?;
            println!("Data saved to {} ({} records)", output_csv.display(), n);
        }

        Commands::Preprocess {
            input_csv,
            train_csv,
            test_csv,
        } => {
            let report = stages::data_preprocessing(&input_csv, &train_csv, &test_csv, &config.split)
                .context("Data preprocessing failed")?;
            println!(
                "Data split and saved: {} train, {} test ({} dropped)",
                report.n_train, report.n_test, report.n_dropped
            );
        }

        Commands::Train { train_csv, model } => {
            stages::model_training(&train_csv, &model, &config.forest)
                .context("Model training failed")?;
            println!("Model saved to {}", model.display());
        }

        Commands::Evaluate {
            test_csv,
            model,
            metrics_json,
        } => {
            let metrics = stages::model_evaluation(&test_csv, &model, &metrics_json)
                .context("Model evaluation failed")?;
            print_metrics(&metrics);
            println!("Metrics saved to {}", metrics_json.display());
        }

        Commands::Compile {
            output,
            components_dir,
        } => {
            let workflow = Workflow::compile(&PipelineSpec::housing())?;
            workflow
                .save(&output)
                .with_context(|| format!("Failed to write {:?}", output))?;

            std::fs::create_dir_all(&components_dir)?;
            for component in Component::ALL {
                let path = components_dir.join(format!("{}.yaml", component.name().replace('-', "_")));
                std::fs::write(&path, component.spec().to_yaml()?)?;
                info!("Wrote {:?}", path);
            }

            println!("Pipeline compiled to {}", output.display());
            println!("Components compiled to YAML files in {}", components_dir.display());
        }

        Commands::Run {
            data_url,
            workdir,
            workflow,
        } => {
            let pipeline = match workflow {
                Some(path) => Workflow::load(&path)
                    .with_context(|| format!("Failed to load workflow {:?}", path))?
                    .pipeline,
                None => PipelineSpec::housing(),
            };

            let mut arguments = BTreeMap::new();
            if let Some(url) = data_url {
                arguments.insert("data_url".to_string(), url);
            }

            let mut runner = LocalRunner::new(config);
            if let Some(dir) = workdir {
                runner = runner.with_workdir(dir);
            }

            let summary = runner.run(&pipeline, &arguments)?;

            println!("\n=== Artifacts ===\n");
            for (task, output, path) in summary.iter() {
                println!("{:<20} {:<14} {}", task, output, path.display());
            }

            if let Some(path) = summary.output("model-evaluation", "metrics_json") {
                let metrics = MetricsRecord::load(path)?;
                println!();
                print_metrics(&metrics);
            }
        }
    }

    Ok(())
}

fn print_metrics(metrics: &MetricsRecord) {
    println!("=== Model Evaluation ===\n");
    println!("Test MSE: {:.6}", metrics.mse);
    println!("Test R²:  {:.4}", metrics.r2);
}
