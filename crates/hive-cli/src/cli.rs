use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hive",
    about = "Hive: a persistent hierarchical typed key-value registry",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Registry database file (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Erase every key, leaving an empty registry
    Init,
    /// Create a key and any missing ancestors
    Add(PathArgs),
    /// Delete a key and its subtree
    Del(PathArgs),
    /// Store a typed value, creating the key if needed
    Set(SetArgs),
    /// Show a key's type and value
    Get(PathArgs),
    /// List the children of a key (top level by default)
    Ls(LsArgs),
    /// Check tag and value-table consistency
    Verify,
}

#[derive(Args)]
pub struct PathArgs {
    pub path: String,
}

#[derive(Args)]
pub struct LsArgs {
    pub path: Option<String>,
}

#[derive(Args)]
pub struct SetArgs {
    pub path: String,
    #[command(subcommand)]
    pub value: SetValue,
}

#[derive(Subcommand)]
pub enum SetValue {
    /// Clear the value
    Void,
    /// Unsigned 64-bit number
    Number { value: u64 },
    /// Text
    String { value: String },
    /// Bytes, hex-encoded
    Raw { hex: String },
}
