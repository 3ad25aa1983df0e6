//! Token Transfer Graph Builder CLI
//!
//! Reads a transfer list and writes the edge list and node map of the
//! resulting graph. On success prints `nodes\tedges\telapsed_ns` to stdout.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use token_graph_builder::build_nodes::build_degree_file;
use token_graph_builder::config::BuildConfig;
use token_graph_builder::pipeline;
use token_graph_builder::read_transfers::TransferReader;
use token_graph_builder::schemas::RunMetadata;
use token_graph_builder::write_graph::{write_outputs, StagedOutputs};
use token_graph_builder::{EdgeMode, GraphError};

#[derive(Parser)]
#[command(name = "token-graph-builder")]
#[command(version)]
#[command(about = "Build a directed transfer graph from an ERC-20 transfer list", long_about = None)]
struct Cli {
    /// Transfer list (CSV: block,contract,from,to,amount)
    input_file: PathBuf,

    /// Output edge list (TSV)
    edge_list_file: PathBuf,

    /// Output address to node id map (TSV)
    node_map_file: PathBuf,

    /// Path to configuration file (optional, uses env vars if not provided)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Edge list form
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Drop transfers whose sender is also the recipient
    #[arg(long, value_name = "BOOL")]
    exclude_self_transfers: Option<bool>,

    /// Keep only transfers emitted by this contract
    #[arg(long, value_name = "ID")]
    contract: Option<u64>,

    /// Also write a per-node degree and strength summary
    #[arg(long, value_name = "FILE")]
    degrees: Option<PathBuf>,

    /// Also write run metadata as JSON
    #[arg(long, value_name = "FILE")]
    metadata: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Aggregated,
    Raw,
}

impl From<ModeArg> for EdgeMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Aggregated => EdgeMode::Aggregated,
            ModeArg::Raw => EdgeMode::Raw,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", diagnostic(&e));
            ExitCode::FAILURE
        }
    }
}

/// `<kind>: <cause>`, where the kind comes from the innermost [`GraphError`]
/// in the chain.
fn diagnostic(err: &anyhow::Error) -> String {
    let kind = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<GraphError>())
        .last()
        .map_or("internal", GraphError::kind);
    format!("{}: {:#}", kind, err)
}

fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => return Err(GraphError::Usage(e.render().to_string().trim_end().to_string()).into()),
    };

    // Logs go to stderr; stdout carries only the summary line
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = load_config(&cli)?;
    let started = Instant::now();

    info!(
        "Building {} graph from {:?} (exclude self-transfers: {}, contract: {:?})",
        config.mode,
        cli.input_file,
        config.policy.exclude_self_transfers,
        config.policy.contract_id
    );

    let reader = TransferReader::from_path(&cli.input_file)?;
    let graph = pipeline::run(reader, config.policy, config.mode)
        .with_context(|| format!("Failed to build graph from {:?}", cli.input_file))?;

    // Every output is staged before any of them is renamed into place
    let precision = config.output.value_precision;
    let mut staged = StagedOutputs::new();
    write_outputs(
        &mut staged,
        &graph.edges,
        &graph.node_map,
        &cli.edge_list_file,
        &cli.node_map_file,
        precision,
    )
    .context("Failed to write graph")?;

    if let Some(path) = &cli.degrees {
        build_degree_file(&mut staged, graph.node_map.len(), &graph.edges, path, precision)
            .context("Failed to write degree summary")?;
    }

    let elapsed = started.elapsed();

    if let Some(path) = &cli.metadata {
        let mut metadata =
            RunMetadata::new(&cli.input_file, config.mode, config.policy, graph.stats.clone());
        metadata.total_elapsed_nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        staged
            .stage(path, |w| metadata.write_json(w))
            .with_context(|| format!("Failed to write metadata to {:?}", path))?;
    }

    staged.commit().context("Failed to commit outputs")?;

    println!(
        "{}\t{}\t{}",
        graph.stats.node_count,
        graph.stats.edge_count,
        elapsed.as_nanos()
    );

    Ok(())
}

/// Defaults, then config file or environment, then command-line switches.
fn load_config(cli: &Cli) -> Result<BuildConfig> {
    let mut config = match &cli.config {
        Some(path) => BuildConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => BuildConfig::load().context("Failed to load config from environment")?,
    };

    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    if let Some(exclude) = cli.exclude_self_transfers {
        config.policy.exclude_self_transfers = exclude;
    }
    if let Some(contract) = cli.contract {
        config.policy.contract_id = Some(contract);
    }

    Ok(config)
}
