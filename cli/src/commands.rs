//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for nova-tools
#[derive(Parser, Debug)]
#[command(name = "nova-tools")]
#[command(author, version, about = "Run Nova agent tools from the command line")]
#[command(long_about = r#"
Validate, gate and execute Nova agent tools against a workspace.

Configuration is merged from (highest priority first):
1. NOVA_* environment variables   e.g. NOVA_TOOLS__ALLOW_SHELL_COMMANDS=true
2. --config <path>                Explicit config file
3. ./nova.toml or ./.nova.toml    Project-level config
4. ~/.config/nova/config.toml     Global config

Example:
  nova-tools list
  nova-tools invoke file_read '{"path": "README.md"}'
  echo '{"tool": "sys_usage", "args": {}}' | nova-tools batch
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Workspace directory (overrides tools.workspace_dir; defaults to the current directory)
    #[arg(short, long, value_name = "DIR", global = true)]
    pub workspace: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files (environment variables still apply)
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Append metrics to this JSONL file instead of the configured one
    #[arg(long, value_name = "PATH", global = true)]
    pub metrics: Option<PathBuf>,

    /// Do not write metrics
    #[arg(long, global = true, conflicts_with = "metrics")]
    pub no_metrics: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available tools
    List {
        /// Print JSON Schema tool definitions
        #[arg(long)]
        json: bool,
    },

    /// Invoke a single tool
    Invoke {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(value_name = "ARGS_JSON")]
        args: Option<String>,

        /// Print the result envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read tool calls as JSON lines from stdin and print one result envelope per line
    Batch,

    /// Show configuration file locations and exit
    ShowConfig,
}
