//! Fetch the California housing dataset into a local CSV
//!
//! Usage: cargo run --bin fetch_data -- --output data/raw_data.csv

use clap::Parser;
use housing_pipeline::config::PipelineConfig;
use housing_pipeline::source::DatasetClient;
use std::path::PathBuf;
use std::process;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch the California housing dataset")]
struct Args {
    /// Output file path
    #[arg(short, long, default_value = "data/raw_data.csv")]
    output: PathBuf,

    /// Download cache directory
    #[arg(long)]
    data_home: Option<PathBuf>,
}

fn fetch(args: &Args) -> housing_pipeline::Result<usize> {
    let mut config = PipelineConfig::default();
    config.source.data_home = args.data_home.clone();

    let client = DatasetClient::new(&config.source)?;
    let dataset = client.fetch_california_housing()?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    dataset.save_csv(&args.output)?;
    Ok(dataset.n_samples())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("housing_pipeline=info".parse().unwrap_or_default()),
        )
        .init();

    let args = Args::parse();

    println!("Fetching California housing dataset...");
    match fetch(&args) {
        Ok(n) => {
            info!("Wrote {} records", n);
            println!("California housing dataset saved to {}", args.output.display());
        }
        Err(e) => {
            eprintln!("Failed to fetch dataset: {}", e);
            process::exit(1);
        }
    }
}
