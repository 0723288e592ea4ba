//! Clap derive structures for the `thr` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// thr -- browse and maintain technology hardening requirements
#[derive(Debug, Parser)]
#[command(
    name = "thr",
    version,
    about = "Manage technology hardening requirements from the command line",
    long_about = "Browse technology families and technologies, and list, inspect,\n\
        save and delete the hardening controls stored in a THR registry.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Registry profile to use
    #[arg(long, short = 'p', env = "THR_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Registry URL (overrides profile)
    #[arg(long, short = 'u', env = "THR_URL", global = true)]
    pub url: Option<String>,

    /// Registry API key
    #[arg(long, env = "THR_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Use the built-in sample registry instead of a remote store
    #[arg(long, global = true)]
    pub demo: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "THR_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "THR_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "THR_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List technology families
    #[command(alias = "fam", alias = "f")]
    Families(FamiliesArgs),

    /// List technologies
    #[command(alias = "tech", alias = "t")]
    Techs(TechsArgs),

    /// Manage hardening controls
    #[command(alias = "ctl", alias = "c")]
    Controls(ControlsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Families ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FamiliesArgs {
    #[command(subcommand)]
    pub command: FamiliesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FamiliesCommand {
    /// List all technology families
    #[command(alias = "ls")]
    List,
}

// ── Technologies ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TechsArgs {
    #[command(subcommand)]
    pub command: TechsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TechsCommand {
    /// List technologies, optionally within one family
    #[command(alias = "ls")]
    List {
        /// Family ID to list technologies for
        #[arg(long, short = 'f')]
        family: Option<String>,
    },
}

// ── Controls ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ControlsArgs {
    #[command(subcommand)]
    pub command: ControlsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ControlsCommand {
    /// List controls (at most 50, ranking order unless --sort is given)
    #[command(alias = "ls")]
    List(ControlsListArgs),

    /// Show one control
    Get {
        /// Control ID
        id: String,
    },

    /// Create or update a control from a JSON or YAML file
    Save {
        /// Path to the control record (.json, .yaml or .yml)
        #[arg(long, short = 'F')]
        from_file: PathBuf,

        /// Technology for a new control (overrides `tech_id` in the file)
        #[arg(long, short = 't')]
        tech: Option<String>,
    },

    /// Delete a control
    #[command(alias = "rm")]
    Delete {
        /// Control ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct ControlsListArgs {
    /// Only controls of this technology
    #[arg(long, short = 't')]
    pub tech: Option<String>,

    /// Only controls of technologies in this family
    #[arg(long, short = 'f')]
    pub family: Option<String>,

    /// Case-insensitive match on id, statement or description
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Sort by column
    #[arg(long)]
    pub sort: Option<SortArg>,

    /// Sort descending (with --sort)
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Id,
    ControlFamily,
    ControlType,
    Statement,
    ThrCode,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key to change
        key: ProfileKey,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

/// Settable keys of a config profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ProfileKey {
    Url,
    #[value(alias = "api-key")]
    ApiKey,
    #[value(alias = "api-key-env")]
    ApiKeyEnv,
    #[value(alias = "ca-cert")]
    CaCert,
    Insecure,
    Timeout,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
