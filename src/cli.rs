//! CLI definitions for sitemind.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// sitemind CLI.
#[derive(Parser)]
#[command(name = "sitemind")]
#[command(about = "Inspect and maintain the sitemind knowledge store")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.sitemind/config.toml)
    #[arg(short, long, global = true, env = "SITEMIND_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show knowledge store counters
    Stats,

    /// Print the translator context digest for a domain
    Context {
        /// Domain, e.g. shop.example.com
        domain: String,
    },

    /// Show what is known about a domain
    Profile {
        /// Domain, e.g. shop.example.com
        domain: String,
    },

    /// Drop every cached page model for a domain
    Forget {
        /// Domain, e.g. shop.example.com
        domain: String,
    },

    /// List the operations offered for a page
    Operations {
        /// Page URL; core operations only when the page is not cached
        #[arg(long)]
        url: Option<String>,
    },

    /// Saved session management
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum SessionAction {
    /// List saved sessions, most recently active first
    List {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Delete a saved session
    Delete {
        /// Session ID
        id: String,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Validate the configuration file
    Check,

    /// Print the effective configuration
    Show,
}
