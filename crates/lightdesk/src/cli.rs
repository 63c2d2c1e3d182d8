//! Clap derive structures for the `lightdesk` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lightdesk -- watch and drive a live DMX lighting backend
#[derive(Debug, Parser)]
#[command(
    name = "lightdesk",
    version,
    about = "Watch and drive a live DMX lighting desk from the command line",
    long_about = "Connects to a lighting backend over its WebSocket, keeps channel levels,\n\
        the channel mapping, universes and now-playing details in sync, and sends\n\
        channel fades. Reconnects with exponential backoff when the socket drops.",
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
    /// Backend profile to use
    #[arg(long, short = 'p', env = "LIGHTDESK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile), e.g. http://desk.local:8080/
    #[arg(long, short = 's', env = "LIGHTDESK_SERVER", global = true)]
    pub server: Option<String>,

    /// WebSocket URL (overrides the one derived from the server URL)
    #[arg(long, env = "LIGHTDESK_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LIGHTDESK_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "LIGHTDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request and connect timeout in seconds (overrides profile)
    #[arg(long, env = "LIGHTDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
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
    /// Read, watch and fade DMX channel levels
    #[command(alias = "ch")]
    Channels(ChannelsArgs),

    /// Show which fixture each channel drives
    #[command(alias = "map")]
    Mapping(MappingArgs),

    /// List DMX universes
    Universes,

    /// Show now-playing track details
    Track(TrackArgs),

    /// Stream list-change notifications (fixtures, scenes, cues, ...)
    Changes(ChangesArgs),

    /// List stored scripts
    Scripts,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Channels ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChannelsArgs {
    #[command(subcommand)]
    pub command: ChannelsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChannelsCommand {
    /// Print current levels once the backend has reported them
    #[command(alias = "ls")]
    Get {
        /// Only channels in this universe
        #[arg(long, short = 'u')]
        universe: Option<u16>,
    },

    /// Stream level changes until interrupted
    Watch {
        /// Only channels in this universe
        #[arg(long, short = 'u')]
        universe: Option<u16>,
    },

    /// Fade one channel to a level
    Set {
        /// Universe number
        universe: u16,
        /// Channel number
        id: u16,
        /// Target level (0-255)
        level: u8,
        /// Fade time, e.g. 0s, 250ms, 1.5s
        #[arg(long, short = 'f', default_value = "0s")]
        fade: humantime::Duration,
    },
}

// ── Mapping ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MappingArgs {
    #[command(subcommand)]
    pub command: MappingCommand,
}

#[derive(Debug, Subcommand)]
pub enum MappingCommand {
    /// Print the channel -> fixture mapping
    Show {
        /// Only this universe
        #[arg(long, short = 'u')]
        universe: Option<u16>,
    },
}

// ── Track ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TrackArgs {
    /// Keep printing as the track changes
    #[arg(long, short = 'w')]
    pub watch: bool,
}

// ── Changes ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChangesArgs {
    /// Only these kinds (repeatable); all when omitted
    #[arg(long = "kind", value_enum)]
    pub kinds: Vec<ChangeKindArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChangeKindArg {
    Fixtures,
    Scenes,
    Cues,
    CueStacks,
    CueSlots,
    FxPresets,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration
    Show,

    /// Create or update a profile
    Init {
        /// Backend base URL
        #[arg(long)]
        server: String,

        /// WebSocket URL override
        #[arg(long)]
        ws_url: Option<String>,

        /// Profile name (defaults to "default")
        #[arg(long = "name", default_value = "default")]
        name: String,

        /// Make this the default profile
        #[arg(long)]
        set_default: bool,
    },

    /// List configured profiles
    Profiles,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
