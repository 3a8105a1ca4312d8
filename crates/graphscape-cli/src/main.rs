use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use graphscape_core::{DagMode, GraphInput, LayoutConfig, LayoutMode, NodeId};
use graphscape_graph::{GraphModel, compute_layout, node_depths, recommend_layout, shortest_path};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Graph layout and topology analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out a graph and write positions, sizes, clusters and visibility as JSON
    Layout(LayoutArgs),
    /// Suggest a layout for the graph's shape
    Recommend {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print the depth of every node
    Depths {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print the fewest-hop path between two nodes
    Path {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Walk edges in both directions
        #[arg(long)]
        undirected: bool,
    },
}

#[derive(Args, Debug)]
struct LayoutArgs {
    /// Graph JSON: { "nodes": [...], "edges": [...] }
    #[arg(short, long)]
    input: PathBuf,

    /// Layout configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated ids of collapsed nodes
    #[arg(long, value_delimiter = ',')]
    collapsed: Vec<String>,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_parser = parse_enum::<LayoutMode>)]
    mode: Option<LayoutMode>,

    #[arg(long, value_parser = parse_enum::<DagMode>)]
    dag_mode: Option<DagMode>,

    #[arg(long)]
    dimensions: Option<u8>,

    #[arg(long)]
    iterations: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,
}

/// Accept the same lowercase names the JSON configuration uses.
fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|err| err.to_string())
}

fn read_graph(path: &Path) -> Result<GraphInput> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(GraphInput::from_json_str(&content)?)
}

fn build_model(path: &Path) -> Result<GraphModel> {
    let input = read_graph(path)?;
    let (model, report) = GraphModel::build(input.nodes, input.edges);
    if !report.is_clean() {
        tracing::info!(
            "Dropped {} edges and {} duplicate nodes",
            report.dropped_edges.len(),
            report.duplicate_nodes.len()
        );
    }
    Ok(model)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_layout(args: LayoutArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => LayoutConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LayoutConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if args.dag_mode.is_some() {
        config.dag_mode = args.dag_mode;
    }
    if let Some(dimensions) = args.dimensions {
        config.dimensions = dimensions;
    }
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let input = read_graph(&args.input)?;
    tracing::info!(
        "Laying out {} nodes and {} edges ({:?})",
        input.nodes.len(),
        input.edges.len(),
        config.mode
    );
    let collapsed: Vec<NodeId> = args.collapsed.into_iter().map(NodeId::from).collect();
    let output = compute_layout(input, &config, &collapsed)?;
    tracing::info!(
        "Finished after {} iterations in {}ms (converged: {})",
        output.stats.iterations,
        output.stats.elapsed_ms,
        output.stats.converged
    );

    match args.output {
        Some(path) => {
            fs::write(&path, serde_json::to_string_pretty(&output)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote layout to {}", path.display());
        }
        None => print_json(&output)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Layout(args) => run_layout(args)?,
        Command::Recommend { input } => {
            let model = build_model(&input)?;
            print_json(&recommend_layout(&model))?;
        }
        Command::Depths { input } => {
            let model = build_model(&input)?;
            print_json(&node_depths(&model))?;
        }
        Command::Path {
            input,
            from,
            to,
            undirected,
        } => {
            let model = build_model(&input)?;
            match shortest_path(&model, &from.into(), &to.into(), !undirected) {
                Some(path) => print_json(&path)?,
                None => println!("No path found"),
            }
        }
    }
    Ok(())
}
