//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Query graph and relational backends through one provider registry
#[derive(Parser, Debug)]
#[command(name = "graphgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of plugin manifests (built-in plugins when omitted)
    #[arg(short, long, global = true)]
    pub plugins_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered data source types per capability
    Providers,

    /// Test the connection to a data source
    Check {
        /// Data source descriptor (YAML or JSON)
        #[arg(short, long)]
        datasource: PathBuf,
    },

    /// Show classes, properties and cardinalities
    Metadata {
        /// Data source descriptor (YAML or JSON)
        #[arg(short, long)]
        datasource: PathBuf,
    },

    /// Run a tabular query
    Query {
        /// Data source descriptor (YAML or JSON)
        #[arg(short, long)]
        datasource: PathBuf,

        /// Query text
        #[arg(short, long)]
        query: String,

        /// Positional query parameter; JSON scalars are typed, anything else is text
        #[arg(long = "param")]
        params: Vec<String>,

        /// Maximum rows (0 = no limit)
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Run a graph query
    Graph {
        /// Data source descriptor (YAML or JSON)
        #[arg(short, long)]
        datasource: PathBuf,

        /// Query text
        #[arg(short, long)]
        query: String,

        /// Maximum nodes and edges (0 = no limit)
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Expand the neighbourhood of graph elements
    Expand {
        /// Data source descriptor (YAML or JSON)
        #[arg(short, long)]
        datasource: PathBuf,

        /// Element id to start from (repeatable)
        #[arg(long = "id", required = true)]
        ids: Vec<String>,

        /// in, out or both
        #[arg(long, default_value = "both")]
        direction: String,

        /// Only follow edges with this label
        #[arg(long)]
        label: Option<String>,

        /// Maximum hops
        #[arg(long, default_value = "1")]
        hops: usize,
    },

    /// Load graph elements by id
    Load {
        /// Data source descriptor (YAML or JSON)
        #[arg(short, long)]
        datasource: PathBuf,

        /// Element id (repeatable)
        #[arg(long = "id", required = true)]
        ids: Vec<String>,
    },

    /// Stream every record as JSON lines
    Index {
        /// Data source descriptor (YAML or JSON)
        #[arg(short, long)]
        datasource: PathBuf,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
