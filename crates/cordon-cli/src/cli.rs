use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cordon_api::{Cordon, LiteralSource, Resolver};
use cordon_core::{BlockRequest, Blocklist, MemoryBlocklist, MemoryBlocklistConfig};

use crate::config::CordonConfig;
use crate::render::{render_audit, render_search};

#[derive(Parser)]
#[command(name = "cordon")]
#[command(about = "Content blocklist administration for a content-addressed storage node", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "/etc/cordon/cordon.toml")]
    pub config: PathBuf,

    /// Emit raw JSON records instead of tables.
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add content to the blocklist. Resolution runs first, so any gateway
    /// URL, subdomain host, bare domain or native path names the same target.
    Block {
        /// Why the content is blocked.
        #[arg(short = 'm', long)]
        reason: String,
        /// Operator performing the action.
        #[arg(short, long)]
        user: Option<String>,
        /// Content to block.
        #[arg(required = true)]
        references: Vec<String>,
    },
    /// Remove content from the blocklist.
    Unblock {
        /// Why the content is unblocked.
        #[arg(short = 'm', long)]
        reason: String,
        /// Operator performing the action.
        #[arg(short, long)]
        user: Option<String>,
        /// Content to unblock.
        #[arg(required = true)]
        references: Vec<String>,
    },
    /// Evict content from secondary caches, independent of block state.
    Purge {
        /// Content to purge.
        #[arg(required = true)]
        references: Vec<String>,
    },
    /// Look up blocklist entries for content.
    Search {
        /// Print table headers (Id, User, Reason).
        #[arg(long)]
        headers: bool,
        /// Content to search for.
        #[arg(required = true)]
        references: Vec<String>,
    },
    /// Show audit log records for block and unblock actions.
    Audit {
        /// Number of records to request from the audit log.
        #[arg(long, default_value_t = 100)]
        limit: usize,
        /// Print table headers (Created, Action, User, Ids, Reason).
        #[arg(long)]
        headers: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = if self.config.exists() {
            CordonConfig::from_file(&self.config)?
        } else {
            tracing::warn!(
                "config file not found, using defaults: {}",
                self.config.display()
            );
            CordonConfig::default()
        };
        let api = assemble(&config);

        match &self.command {
            Command::Block {
                reason,
                user,
                references,
            } => {
                let req = BlockRequest {
                    references: references.clone(),
                    reason: reason.clone(),
                    user: user.clone(),
                };
                let outcome = api.block(&req).await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&outcome.blocked)?);
                } else {
                    for rc in &outcome.blocked {
                        println!("{}", rc.id);
                    }
                }
                if let Some(batch) = outcome.batch_error {
                    return Err(anyhow::Error::new(batch));
                }
                if let Some(audit) = outcome.audit_error {
                    return Err(anyhow::Error::new(audit));
                }
                Ok(())
            }
            Command::Unblock {
                reason,
                user,
                references,
            } => {
                let req = BlockRequest {
                    references: references.clone(),
                    reason: reason.clone(),
                    user: user.clone(),
                };
                let outcome = api.unblock(&req).await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&outcome.unblocked)?);
                } else {
                    for id in &outcome.unblocked {
                        println!("{}", id);
                    }
                }
                if let Some(batch) = outcome.batch_error {
                    return Err(anyhow::Error::new(batch));
                }
                if let Some(audit) = outcome.audit_error {
                    return Err(anyhow::Error::new(audit));
                }
                Ok(())
            }
            Command::Purge { references } => {
                for reference in references {
                    let id = api.purge(reference).await?;
                    println!("{}", id);
                }
                Ok(())
            }
            Command::Search {
                headers,
                references,
            } => {
                let mut entries = Vec::new();
                for reference in references {
                    if let Some(entry) = api.search(reference).await? {
                        entries.push(entry);
                    }
                }
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                } else {
                    print!("{}", render_search(&entries, *headers));
                }
                Ok(())
            }
            Command::Audit { limit, headers } => {
                let actions = api.audit_log(*limit).await?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&actions)?);
                } else {
                    print!("{}", render_audit(&actions, *headers));
                }
                Ok(())
            }
        }
    }
}

/// Assembles the local service: in-memory registry, literal content source.
///
/// Daemon-backed deployments swap this for a client of the node's API; the
/// command surface above stays the same.
fn assemble(config: &CordonConfig) -> Cordon {
    let registry: Arc<dyn Blocklist> = Arc::new(MemoryBlocklist::with_config(
        MemoryBlocklistConfig {
            audit_capacity: config.audit_capacity,
        },
    ));
    let resolver = Resolver::with_timeout(
        Arc::new(LiteralSource::new()),
        Duration::from_secs(config.resolve_timeout_secs),
    );
    Cordon::new(registry, resolver)
}
