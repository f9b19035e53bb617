//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod access;
pub mod args;
pub mod cache;
pub mod context;
pub mod init;
pub mod resource;
pub mod status;

pub use args::{GatedResourceArgs, OutputFormat, PaginationArgs};
pub use context::CommandContext;

use crate::resource::ResourceType;

/// kitgate - Kit resource cache and restrict-content verification
#[derive(Parser, Debug)]
#[command(name = "kitgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "KITGATE_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "KITGATE_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override store directory (`:memory:` for a throwaway store)
    #[arg(long, global = true, env = "KITGATE_STORE", hide_env = true)]
    pub store: Option<String>,

    /// Override the Kit API host
    #[arg(long, global = true, env = "KITGATE_API_HOST", hide_env = true)]
    pub api_host: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "KITGATE_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize kitgate configuration
    Init,

    /// Show configuration and cache status
    Status,

    /// Display version information
    Version,

    /// List, inspect and refresh cached Kit resources
    #[command(subcommand)]
    Resource(ResourceCommands),

    /// Manage the local store
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Restrict-content verification
    #[command(subcommand)]
    Access(AccessCommands),
}

/// Resource subcommands
#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// List cached resources, refreshing when expired
    List {
        /// Resource type
        #[arg(value_enum)]
        resource_type: ResourceType,

        #[command(flatten)]
        pagination: PaginationArgs,
    },

    /// Show a single cached resource
    Get {
        /// Resource type
        #[arg(value_enum)]
        resource_type: ResourceType,

        /// Kit ID
        id: u64,
    },

    /// Fetch fresh resource lists from Kit
    Refresh {
        /// Resource type (all types when omitted)
        #[arg(value_enum)]
        resource_type: Option<ResourceType>,
    },

    /// Refresh all resource types periodically until interrupted
    Watch {
        /// Seconds between refreshes (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Store management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cached resource sets and pending challenges
    Status,

    /// Delete every cached resource set and challenge
    Clear,

    /// Print the store location
    Path,
}

/// Restrict-content subcommands
#[derive(Subcommand, Debug)]
pub enum AccessCommands {
    /// Email a one-time code to a visitor
    RequestCode {
        /// Visitor email address
        #[arg(long, short = 'e')]
        email: String,

        #[command(flatten)]
        resource: GatedResourceArgs,
    },

    /// Check a one-time code and mint a subscription proof
    Verify {
        /// Token returned by request-code
        #[arg(long)]
        token: String,

        /// Code from the email
        #[arg(long)]
        code: String,
    },

    /// Decide whether a visitor may read gated content (exits 1 when denied)
    Check {
        #[command(flatten)]
        resource: GatedResourceArgs,

        /// Proof from the URL parameter
        #[arg(long)]
        proof: Option<String>,

        /// Proof from the cookie
        #[arg(long)]
        cookie: Option<String>,

        /// Visitor IP address
        #[arg(long)]
        ip: Option<String>,
    },

    /// Decode a subscription proof
    Inspect {
        /// Proof (cookie value)
        proof: String,
    },

    /// Test whether an IPv4 address is inside a CIDR range
    IpInRange {
        /// IPv4 address
        ip: String,

        /// CIDR range, e.g. 34.100.182.96/28
        range: String,
    },
}
