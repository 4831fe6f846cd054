//! Command line interface: create a configuration, run the HTTP API, and
//! read or write community posts directly against the configured relays.

use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use stoa::community::{DeleteRequest, FeedQuery, NewQuestion, NewReply};
use stoa::config::{self, Settings};
use stoa::identity::generate_keypair;
use stoa::{api, Community};

/// Command line interface entry point.
#[derive(Parser)]
#[command(
    name = "stoa",
    author,
    version,
    about = "Community questions and answers over Nostr relays"
)]
struct Cli {
    /// Path to the `.env` configuration file.
    #[arg(long, default_value = ".env")]
    env: String,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Write a default `.env` file if none exists.
    Init,
    /// Launch the HTTP API.
    Serve,
    /// Print a freshly generated keypair.
    Keygen,
    /// Print the newest questions.
    Feed {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the replies to a question.
    Replies {
        /// Question event id.
        parent_id: String,
    },
    /// Publish a question.
    Ask {
        /// Hex secret key.
        #[arg(long, env = "STOA_NSEC", hide_env_values = true)]
        nsec: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        role: Option<String>,
        content: String,
    },
    /// Publish a reply to a question.
    Reply {
        #[arg(long, env = "STOA_NSEC", hide_env_values = true)]
        nsec: String,
        /// Question event id.
        #[arg(long)]
        parent: String,
        #[arg(long)]
        role: Option<String>,
        content: String,
    },
    /// Publish a tombstone for one of your events.
    Delete {
        #[arg(long, env = "STOA_NSEC", hide_env_values = true)]
        nsec: String,
        event_id: String,
    },
}

/// Execute the selected CLI subcommand.
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Keygen => return print_json(&generate_keypair()),
        Commands::Init => {
            if ensure_env_file(&cli.env)? {
                tracing::info!(path = %cli.env, "wrote default configuration");
            }
            return Ok(());
        }
        _ => {}
    }
    ensure_env_file(&cli.env)?;
    let cfg = Settings::from_env(&cli.env)?;
    let community = Arc::new(Community::new(cfg.community_config()));
    match cli.command {
        Commands::Serve => {
            tracing::info!(relays = ?cfg.relays, scope = %cfg.scope, "starting");
            api::serve_http(cfg.bind_http, community, shutdown_signal()).await?;
        }
        Commands::Feed {
            subject,
            role,
            limit,
        } => {
            let questions = community
                .feed(FeedQuery {
                    subject,
                    role,
                    limit: Some(limit),
                })
                .await?;
            print_json(&questions)?;
        }
        Commands::Replies { parent_id } => {
            print_json(&community.list_replies(&parent_id).await?)?;
        }
        Commands::Ask {
            nsec,
            title,
            subject,
            role,
            content,
        } => {
            let outcome = community
                .create_question(NewQuestion {
                    nsec,
                    title,
                    subject,
                    content,
                    role,
                    pubkey: None,
                })
                .await?;
            print_json(&outcome)?;
        }
        Commands::Reply {
            nsec,
            parent,
            role,
            content,
        } => {
            let outcome = community
                .create_reply(NewReply {
                    nsec,
                    content,
                    parent_id: parent,
                    role,
                    ..NewReply::default()
                })
                .await?;
            print_json(&outcome)?;
        }
        Commands::Delete { nsec, event_id } => {
            let outcome = community.delete(DeleteRequest { nsec, event_id }).await?;
            print_json(&outcome)?;
        }
        Commands::Init | Commands::Keygen => {}
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Create a default `.env` file if one is not already present at `path`.
///
/// Returns true when a file was written.
fn ensure_env_file(path: &str) -> anyhow::Result<bool> {
    let env_path = Path::new(path);
    if env_path.exists() {
        return Ok(false);
    }
    if let Some(parent) = env_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(env_path, config::default_env_file())
        .with_context(|| format!("writing {path}"))?;
    Ok(true)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    run(cli).await
}
