// ABOUTME: Command-line interface definitions using clap
// ABOUTME: Defines all subcommands and global flags

use crate::config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pagemill")]
#[command(about = "Mirror Notion databases and pages into a folder of Markdown files", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the config file (default: ~/.pagemill.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one sync pass over all configured targets (default)
    Sync {
        /// Sync only the named target
        #[arg(long)]
        only: Option<String>,
    },

    /// Sync repeatedly on a fixed interval until interrupted
    Watch {
        /// Seconds between passes (defaults to sync_interval from config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// List databases shared with the integration
    Databases,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Sync { only: None })
    }

    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(config::default_config_path)
    }
}
