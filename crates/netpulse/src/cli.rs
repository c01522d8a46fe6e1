//! Clap derive structures for the `netpulse` CLI.
//!
//! Defines the command tree, global flags and shared value enums.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netpulse -- network traffic monitoring from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "netpulse",
    version,
    about = "Query and watch a netpulse monitoring backend",
    long_about = "Command-line client for a netpulse backend.\n\n\
        One-shot commands print traffic, devices, anomalies and alerts;\n\
        `watch` follows the live event stream.",
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
    /// Config profile to use
    #[arg(long, short = 'p', env = "NETPULSE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides NETPULSE_API_URL and the profile)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Session token (overrides the stored one)
    #[arg(long, env = "NETPULSE_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "NETPULSE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides the profile)
    #[arg(long, env = "NETPULSE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal and NO_COLOR is unset
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    Low,
    Medium,
    High,
}

impl SeverityArg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session token
    Login(LoginArgs),

    /// Create an account and store the session token
    Signup(SignupArgs),

    /// End the session and forget the stored token
    Logout,

    /// Set a new password with a reset token
    ResetPassword(ResetPasswordArgs),

    /// Show the active profile and whether its token is accepted
    Whoami,

    /// Dashboard summary: stats, protocol mix, busiest hosts
    #[command(alias = "ov")]
    Overview,

    /// Traffic samples
    Traffic(TrafficArgs),

    /// Detected anomalies
    #[command(alias = "an")]
    Anomalies(AnomaliesArgs),

    /// Devices seen on the network
    #[command(alias = "dev")]
    Devices,

    /// Hosts ranked by traffic volume
    TopTalkers(TopTalkersArgs),

    /// Alerts derived from current anomalies
    Alerts(AlertsArgs),

    /// Follow the live stream
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (prompted if omitted)
    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Debug, Args)]
pub struct SignupArgs {
    /// Account email (prompted if omitted)
    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,

    /// Accept the privacy policy
    #[arg(long)]
    pub agree_policy: bool,
}

#[derive(Debug, Args)]
pub struct ResetPasswordArgs {
    /// Token from the password-reset e-mail
    #[arg(long)]
    pub reset_token: String,

    /// Read the new password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

// ── Network queries ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TrafficArgs {
    /// Look-back window in hours
    #[arg(long, default_value = "24")]
    pub hours: u32,
}

#[derive(Debug, Args)]
pub struct AnomaliesArgs {
    /// Look-back window in hours
    #[arg(long, default_value = "24")]
    pub hours: u32,

    /// Only show anomalies of this severity
    #[arg(long, short = 's')]
    pub severity: Option<SeverityArg>,
}

#[derive(Debug, Args)]
pub struct TopTalkersArgs {
    /// Show at most this many hosts
    #[arg(long, short = 'l', default_value = "10")]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct AlertsArgs {
    /// Case-insensitive match on title or description
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Leave out acknowledged alerts
    #[arg(long)]
    pub hide_acknowledged: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this long (e.g. "30s", "5m"); runs until Ctrl-C otherwise
    #[arg(long, short = 'd', value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile interactively
    Init,

    /// Display the current configuration (tokens masked)
    Show,

    /// Set a configuration value
    Set {
        /// Dotted key, e.g. "defaults.output" or "profiles.home.api_url"
        key: String,

        /// Value to set
        value: String,
    },

    /// Print the config file location
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
