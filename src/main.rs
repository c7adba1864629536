//! # modfetch CLI
//!
//! The `modfetch` binary is the operator interface for installing tagged
//! module snapshots from remote Git repositories.
//!
//! ## Usage
//!
//! ```bash
//! modfetch --config ./config/modfetch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `modfetch init` | Create the SQLite ledger and run schema migrations |
//! | `modfetch source add <name> <url>` | Register a repository source |
//! | `modfetch source list` | List registered sources and their state |
//! | `modfetch source remove <name>` | Delete a registered source |
//! | `modfetch validate <name-or-url>` | Validate a source/URL and list its tags |
//! | `modfetch tags <url>` | List a repository's tags without registering it |
//! | `modfetch install <url> <tag>` | Install one tagged snapshot |
//! | `modfetch snapshots` | List installed snapshots |
//! | `modfetch remove <id>` | Delete a snapshot's directory and mark it removed |

mod config;
mod db;
mod error;
mod install;
mod ledger;
mod migrate;
mod models;
mod notify;
mod ownership;
mod runner;
mod service;
mod tags;
mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::service::{InstallRequest, Service};
use crate::validate::RepoUrl;

/// modfetch — install tagged module snapshots from remote Git repositories.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file holding the ledger path, destination base, timeout, ownership
/// identity, and notify hooks.
#[derive(Parser)]
#[command(
    name = "modfetch",
    about = "Install tagged module snapshots from remote Git repositories",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/modfetch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the ledger database.
    ///
    /// Creates the SQLite file and the sources/snapshots tables.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Manage registered repository sources.
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Validate a repository and list its tags.
    ///
    /// Accepts either a registered source name (updating its cached tags
    /// and state) or a raw repository URL.
    Validate {
        /// Registered source name or repository URL.
        target: String,
    },

    /// List the tags a repository publishes, in remote discovery order.
    Tags {
        /// Repository URL (https, ssh, or git@host:path).
        url: String,
    },

    /// Install one tagged snapshot under the destination base.
    Install {
        /// Repository URL.
        url: String,

        /// Tag to install (as reported by `tags`).
        tag: String,

        /// Directory name prefix; defaults to the repository's name.
        #[arg(long)]
        name: Option<String>,

        /// Override the configured destination base.
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Run the configured module-list refresh hook afterwards.
        #[arg(long)]
        update_list: bool,

        /// Run the configured restart hook afterwards.
        #[arg(long)]
        restart: bool,
    },

    /// List installed snapshots, newest first.
    Snapshots,

    /// Remove an installed snapshot: delete its directory, flip its status.
    Remove {
        /// Snapshot id (as shown by `snapshots`).
        id: String,
    },
}

/// Source management subcommands.
#[derive(Subcommand)]
enum SourceAction {
    /// Register a repository source (state starts as draft).
    Add {
        /// Short name for the source (unique).
        name: String,
        /// Repository URL.
        url: String,
        /// Per-source destination base; defaults to the configured one.
        #[arg(long)]
        clone_path: Option<PathBuf>,
    },
    /// List registered sources and their validation state.
    List,
    /// Delete a registered source.
    Remove {
        /// Source name.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modfetch=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Ledger initialized successfully.");
        return Ok(());
    }

    let service = Service::connect(cfg).await?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Source { action } => match action {
            SourceAction::Add {
                name,
                url,
                clone_path,
            } => {
                let source = service.register_source(&name, &url, clone_path).await?;
                println!("Registered source '{}' ({})", source.name, source.url);
            }
            SourceAction::List => {
                let sources = service.sources().await?;
                println!("{:<20} {:<10} {:<8} URL", "NAME", "STATE", "TAGS");
                for source in sources {
                    println!(
                        "{:<20} {:<10} {:<8} {}",
                        source.name,
                        source.state.as_str(),
                        source.tags.len(),
                        source.url
                    );
                }
            }
            SourceAction::Remove { name } => {
                service.remove_source(&name).await?;
                println!("Removed source '{name}'");
            }
        },
        Commands::Validate { target } => {
            let discovered = if target.contains("://") || target.contains('@') {
                service.validate_and_discover(&target).await?
            } else {
                service.validate_source(&target).await?
            };
            println!("Repository valid. Found {} tags:", discovered.len());
            for tag in discovered {
                println!("  {}", tag.name);
            }
        }
        Commands::Tags { url } => {
            let discovered = service.validate_and_discover(&url).await?;
            for tag in discovered {
                match tag.commit {
                    Some(commit) => println!("{:<32} {}", tag.name, commit),
                    None => println!("{}", tag.name),
                }
            }
        }
        Commands::Install {
            url,
            tag,
            name,
            dest,
            update_list,
            restart,
        } => {
            let request = InstallRequest {
                url: RepoUrl::parse(&url)?,
                tag,
                desired_name: name,
                destination_base: dest,
                update_module_list: update_list,
                restart,
            };
            let report = service.install(request).await?;
            println!(
                "Installed {} {} -> {}",
                report.snapshot.module_name,
                report.snapshot.tag,
                report.snapshot.path.display()
            );
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
        }
        Commands::Snapshots => {
            let snapshots = service.snapshots().await?;
            println!("{:<36} {:<16} {:<14} {:<8} PATH", "ID", "MODULE", "TAG", "STATUS");
            for snap in snapshots {
                println!(
                    "{:<36} {:<16} {:<14} {:<8} {}",
                    snap.id,
                    snap.module_name,
                    snap.tag,
                    snap.status.as_str(),
                    snap.path.display()
                );
            }
        }
        Commands::Remove { id } => {
            let removed = service.remove(&id).await?;
            println!(
                "Removed {} {} ({})",
                removed.module_name,
                removed.tag,
                removed.path.display()
            );
        }
    }

    Ok(())
}
