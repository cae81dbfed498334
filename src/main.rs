use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use event_clusters::{run_pipeline, ClusteringMethod, Corpus, Granularity, PipelineConfig};

/// Event Clusters - event extraction and clustering over annotated documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Corpus JSON: documents with their mentions, optional reference annotations
    #[arg(short, long)]
    input: PathBuf,

    /// Path to config file (overrides EVENT_CLUSTERS_CONFIG environment variable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for generated files (default: "out")
    #[arg(short, long, default_value = "out")]
    output_dir: PathBuf,

    /// In-cluster frequency threshold for mention filtering
    #[arg(long)]
    threshold: Option<f64>,

    /// Extract one event per document instead of per sentence
    #[arg(long)]
    by_document: bool,

    /// Use k-medoids with this many clusters instead of the silhouette search
    #[arg(long)]
    medoids: Option<usize>,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    // CLI arg > EVENT_CLUSTERS_CONFIG > built-in defaults
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var("EVENT_CLUSTERS_CONFIG").ok().map(PathBuf::from));

    let mut cfg = match path {
        Some(p) => {
            if !p.exists() {
                return Err(anyhow::anyhow!(
                    "config not found at {}\n\
                     Use --config to specify a config file, or set EVENT_CLUSTERS_CONFIG.\n\
                     Example config.json:\n\
                     {{\"granularity\": \"sentence\", \"cluster_threshold\": 0.3, \"clustering\": \"hierarchical\"}}\n",
                    p.display()
                ));
            }
            debug!("Using config file: {}", p.display());
            PipelineConfig::from_file(&p).with_context(|| format!("loading config {}", p.display()))?
        }
        None => {
            debug!("No config file given, using defaults");
            PipelineConfig::default()
        }
    };

    if let Some(t) = args.threshold {
        cfg.cluster_threshold = t;
    }
    if args.by_document {
        cfg.granularity = Granularity::Document;
    }
    if let Some(k) = args.medoids {
        cfg.clustering = ClusteringMethod::Medoids { k };
    }
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting event_clusters");
    let args = Args::parse();
    let cfg = load_config(&args)?;

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading corpus {}", args.input.display()))?;
    let corpus: Corpus = serde_json::from_str(&raw)
        .with_context(|| format!("parsing corpus {}", args.input.display()))?;
    info!(
        "Corpus loaded - documents={}, reference={}, output_dir={}",
        corpus.documents.len(),
        corpus.reference.is_some(),
        args.output_dir.display()
    );

    let output = run_pipeline(corpus, &cfg)?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output directory {}", args.output_dir.display()))?;
    write_json(&args.output_dir.join("documents.json"), &output.document_records())?;
    write_json(&args.output_dir.join("clusters.json"), &output.cluster_records())?;
    write_json(&args.output_dir.join("events.json"), &output.event_records())?;
    if let Some(eval) = &output.evaluation {
        write_json(&args.output_dir.join("evaluation.json"), eval)?;
    }

    info!("Output written - dir={}", args.output_dir.display());
    Ok(())
}
