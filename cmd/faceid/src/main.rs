//! faceid CLI - enroll, verify and manage a face gallery.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    ConfigCommand, DeleteCommand, EnrollCommand, ListCommand, SearchCommand, VerifyCommand,
};

/// faceid CLI - a command line interface for a face identity gallery.
///
/// Faces are turned into embeddings by an external embedding service and
/// compared by cosine distance against the enrolled gallery.
///
/// Configuration is stored in ~/.faceid/faceid/ and supports multiple contexts,
/// similar to kubectl's context management.
#[derive(Parser)]
#[command(name = "faceid")]
#[command(about = "Face identity gallery CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.faceid/faceid/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Context name to use
    #[arg(short = 'c', long, global = true)]
    pub context: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Enroll face images under one identity
    Enroll(EnrollCommand),
    /// Check whether a face matches the gallery
    Verify(VerifyCommand),
    /// Rank gallery identities by similarity to a face
    Search(SearchCommand),
    /// List enrolled identities
    List(ListCommand),
    /// Delete an identity and all its records
    Delete(DeleteCommand),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli),
        Commands::Enroll(cmd) => cmd.run(&cli),
        Commands::Verify(cmd) => cmd.run(&cli),
        Commands::Search(cmd) => cmd.run(&cli),
        Commands::List(cmd) => cmd.run(&cli),
        Commands::Delete(cmd) => cmd.run(&cli),
    }
}
