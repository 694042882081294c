//! Configuration management commands.

use clap::{Args, Subcommand};

use faceid_cli::{Context as CliContext, StoreKind};

use super::{get_config, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Contexts allow you to manage multiple galleries and embedding services,
/// similar to kubectl's context management.
///
/// Configuration is stored in ~/.faceid/faceid/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add a new context
    #[command(name = "add-context")]
    AddContext {
        /// Context name
        name: String,
        /// Storage engine: memory, redb or dir
        #[arg(long, default_value = "redb")]
        store: StoreKind,
        /// Database file or directory (default: under ~/.faceid/faceid/data)
        #[arg(long)]
        store_path: Option<String>,
        /// Embedding service URL
        #[arg(long)]
        extractor_url: Option<String>,
        /// Extractor timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Embedding dimension
        #[arg(long)]
        dimension: Option<usize>,
        /// Match threshold (cosine distance)
        #[arg(long)]
        threshold: Option<f32>,
        /// Enroll underivable paths as "unknown"
        #[arg(long)]
        unknown_fallback: bool,
    },
    /// Delete a context
    #[command(name = "delete-context")]
    DeleteContext {
        /// Context name
        name: String,
    },
    /// Set the current context
    #[command(name = "use-context")]
    UseContext {
        /// Context name
        name: String,
    },
    /// Display the current context
    #[command(name = "get-context")]
    GetContext,
    /// List all contexts
    #[command(name = "list-contexts", alias = "get-contexts")]
    ListContexts,
    /// View the current configuration
    View,
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddContext {
                name,
                store,
                store_path,
                extractor_url,
                timeout,
                dimension,
                threshold,
                unknown_fallback,
            } => {
                let mut cfg = get_config(cli)?;

                let ctx = CliContext {
                    store: *store,
                    store_path: store_path.clone().unwrap_or_default(),
                    extractor_url: extractor_url.clone().unwrap_or_default(),
                    timeout: timeout.unwrap_or(0),
                    dimension: dimension.unwrap_or(0),
                    threshold: threshold.unwrap_or(0.0),
                    unknown_fallback: *unknown_fallback,
                    ..Default::default()
                };

                cfg.add_context(name, ctx)?;
                print_success(&format!("Context \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_context(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetContext => {
                let cfg = get_config(cli)?;
                if cfg.current_context.is_empty() {
                    println!("No current context set");
                } else {
                    println!("{}", cfg.current_context);
                }
                Ok(())
            }

            ConfigSubcommand::ListContexts => {
                let cfg = get_config(cli)?;

                if cfg.contexts.is_empty() {
                    println!("No contexts configured");
                    return Ok(());
                }

                println!("{:<8} {:<20} {:<8} {}", "CURRENT", "NAME", "STORE", "EXTRACTOR_URL");
                for (name, ctx) in &cfg.contexts {
                    let current = if name == &cfg.current_context { "*" } else { "" };
                    let url = if ctx.extractor_url.is_empty() {
                        "(default)"
                    } else {
                        &ctx.extractor_url
                    };
                    println!("{:<8} {:<20} {:<8} {}", current, name, ctx.store, url);
                }

                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;

                println!("Config file: {}", cfg.path().display());
                println!("Current context: {}", cfg.current_context);
                println!("Contexts: {}", cfg.contexts.len());

                if !cfg.contexts.is_empty() {
                    println!("\nContext details:");

                    for (name, ctx) in &cfg.contexts {
                        println!("\n  {}:", name);
                        println!("    Store: {}", ctx.store);
                        if !ctx.store_path.is_empty() {
                            println!("    Store Path: {}", ctx.store_path);
                        }
                        if !ctx.extractor_url.is_empty() {
                            println!("    Extractor URL: {}", ctx.extractor_url);
                        }
                        if ctx.timeout > 0 {
                            println!("    Timeout: {}s", ctx.timeout);
                        }
                        if ctx.dimension > 0 {
                            println!("    Dimension: {}", ctx.dimension);
                        }
                        if ctx.threshold > 0.0 {
                            println!("    Threshold: {}", ctx.threshold);
                        }
                        if ctx.unknown_fallback {
                            println!("    Unknown Fallback: on");
                        }
                    }
                }

                Ok(())
            }
        }
    }
}
