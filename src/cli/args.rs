use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command line arguments for enumlookup
#[derive(Parser, Debug)]
#[command(
    name = "enumlookup",
    version = env!("CARGO_PKG_VERSION"),
    about = "ENUM (E.164 Number Mapping) lookup tool",
    long_about = "Resolves telephone numbers to service URIs by querying DNS NAPTR records under one or more ENUM domains (RFC 6116)."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a number under one or more ENUM domains
    Query(QueryArgs),
    /// Print the ENUM query name of a number without querying
    Name {
        /// Telephone number
        number: String,
        /// Domain suffix
        #[arg(default_value = "e164.arpa")]
        domain: String,
    },
    /// Configuration management commands
    Config(ConfigArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// One `order|pref|service|servicefound|uri` line per record
    Lines,
    /// JSON output
    Json,
    /// Table output
    Table,
    /// CSV output
    Csv,
}

/// Lookup backend argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Dns,
    Script,
}

/// Query arguments
#[derive(ClapArgs, Debug)]
pub struct QueryArgs {
    /// Telephone number, with or without the leading '+'
    pub number: String,

    /// Comma-separated domains, e.g. 'e164.arpa,e164.org,nrenum.net'
    pub domains: Option<String>,

    /// Enumservice type to flag as found (repeatable)
    #[arg(short, long = "service")]
    pub services: Vec<String>,

    /// Lookup backend
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Nameserver address to query (repeatable, implies the DNS backend)
    #[arg(short, long = "nameserver")]
    pub nameservers: Vec<String>,

    /// Lookup script (implies the script backend)
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Per-domain timeout in milliseconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

impl QueryArgs {
    /// Domains given on the command line, empty when none
    pub fn domain_list(&self) -> Vec<String> {
        self.domains
            .as_deref()
            .map(|domains| {
                domains
                    .split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<String>,
    },
    /// Create default configuration
    Init {
        /// Directory to create the project configuration in
        #[arg(long)]
        path: Option<String>,
        /// Global configuration
        #[arg(short, long)]
        global: bool,
    },
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Lines => write!(f, "lines"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
