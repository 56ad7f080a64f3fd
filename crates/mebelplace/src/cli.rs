//! Clap derive structures for the `mebelplace` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use mebelplace_api::UserRole;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mebelplace -- command-line client for the MebelPlace marketplace API
#[derive(Debug, Parser)]
#[command(
    name = "mebelplace",
    version,
    about = "Talk to the MebelPlace API from the command line",
    long_about = "Log in once, then call any MebelPlace endpoint.\n\n\
        The session is persisted between runs and the access token is\n\
        refreshed transparently when the backend answers 401.",
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
    /// API root URL (overrides the config file)
    #[arg(long, env = "MEBELPLACE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format [default: from config, else plain]
    #[arg(long, short = 'o', env = "MEBELPLACE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates (local development only)
    #[arg(long, short = 'k', env = "MEBELPLACE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "MEBELPLACE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Human-readable key/value lines
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Log in with phone number and password
    Login(LoginArgs),

    /// Create an account and log in
    Register(RegisterArgs),

    /// End the session (server-side best effort, local always)
    Logout,

    /// Show the logged-in user
    #[command(alias = "me")]
    Whoami,

    /// Show local session state without contacting the server
    Status,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Call an arbitrary API endpoint with the stored session
    Api(ApiArgs),

    /// Manage CLI configuration
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Phone number, e.g. +77001234567
    #[arg(long, env = "MEBELPLACE_PHONE")]
    pub phone: String,

    /// Password (prompted when omitted)
    #[arg(long, env = "MEBELPLACE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// One-time SMS code, when the backend asks for one
    #[arg(long)]
    pub sms_code: Option<String>,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Phone number, e.g. +77001234567
    #[arg(long, env = "MEBELPLACE_PHONE")]
    pub phone: String,

    #[arg(long)]
    pub username: String,

    /// Password (prompted when omitted)
    #[arg(long, env = "MEBELPLACE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    /// Account role
    #[arg(long, default_value = "user")]
    pub role: RoleArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    /// Buyer placing requests
    User,
    /// Furniture maker answering requests
    Master,
    Admin,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => Self::User,
            RoleArg::Master => Self::Master,
            RoleArg::Admin => Self::Admin,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RAW API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ApiArgs {
    #[command(subcommand)]
    pub command: ApiCommand,
}

#[derive(Debug, Subcommand)]
pub enum ApiCommand {
    /// GET a path, printing the envelope's `data`
    Get {
        /// Path relative to the API root, e.g. /requests
        path: String,

        /// Query parameter (repeatable)
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// POST a JSON body
    Post {
        path: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// PUT a JSON body
    Put {
        path: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// PATCH a JSON body
    Patch {
        path: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// DELETE a path
    Delete { path: String },

    /// POST a multipart form with files
    Upload {
        path: String,

        /// File part (repeatable)
        #[arg(long = "file", short = 'F', value_name = "FIELD=PATH", required = true)]
        files: Vec<String>,

        /// Text part (repeatable)
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct BodyArgs {
    /// Inline JSON body
    #[arg(long, short = 'd', conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the JSON body from a file
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a configuration value
    Set {
        /// Config key: api_url, credential_store, ca_cert, defaults.output,
        /// defaults.insecure, defaults.timeout
        key: String,

        /// Value to set
        value: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
