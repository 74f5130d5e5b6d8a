//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dogmirror_core::Config;

/// Local mirror of the dog-breed catalog with a paginated read API.
#[derive(Parser, Debug)]
#[command(name = "dogmirror", version)]
pub struct Cli {
    /// SQLite file to mirror into (overrides DB_PATH)
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Upstream endpoint (overrides UPSTREAM_BASE_URL)
    #[arg(long, global = true)]
    pub upstream: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server and background jobs (default)
    Serve {
        /// Listen port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one ingestion pass and print its report as JSON
    Refresh {
        /// First page to request
        #[arg(long, default_value_t = 1)]
        start_page: u32,

        /// Pages to request; omit or pass 0 to walk until the catalog ends
        #[arg(long)]
        max_pages: Option<u32>,
    },
}

impl Cli {
    /// Fold command-line overrides into the env-derived config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.db_path {
            config.storage.db_path = path.clone();
        }
        if let Some(url) = &self.upstream {
            config.upstream.base_url = url.clone();
        }
        if let Some(Command::Serve { port: Some(port) }) = &self.command {
            config.server.port = *port;
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve { port: None })
    }
}
