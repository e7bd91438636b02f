//! CLI command definitions using clap

use crate::debug::health::{Layer, Section};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dscdiag",
    version,
    about = "Cluster diagnostics for DataScienceCluster e2e runs",
    long_about = None,
)]
pub struct Cli {
    /// Kubernetes context to use
    #[arg(long, global = true, env = "DSCDIAG_CONTEXT")]
    pub context: Option<String>,

    /// Diagnostics config file (defaults to ~/.dscdiag/config.toml)
    #[arg(long, global = true, env = "DSCDIAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full diagnostic dump once
    Dump(DumpArgs),

    /// Print a structured health report; exits 1 when unhealthy
    Health(HealthArgs),

    /// Deep-dive a single pod
    Pod(PodArgs),

    /// Redact credentials from a file or stdin
    Redact(RedactArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Clone)]
pub struct DumpArgs {
    /// Label recorded as the trigger key (manual:<label>)
    #[arg(long, default_value = "cli")]
    pub label: String,
}

#[derive(Args, Clone)]
pub struct HealthArgs {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Only run sections in these layers
    #[arg(long, value_enum, value_delimiter = ',')]
    pub layer: Vec<Layer>,

    /// Only run these sections (overrides --layer)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub sections: Vec<Section>,
}

#[derive(Args, Clone)]
pub struct PodArgs {
    /// Pod namespace
    pub namespace: String,

    /// Pod name
    pub name: String,
}

#[derive(Args, Clone)]
pub struct RedactArgs {
    /// File to redact; reads stdin when omitted
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
