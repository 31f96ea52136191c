use clap::{Parser, Subcommand, ValueEnum};
use fleet_models::LifecycleAction;
use std::path::PathBuf;

/// Fleet - admin console for sandboxed server instances
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Sign in to the control plane
    Login {
        /// Operator identifier
        #[arg(short, long)]
        username: String,

        /// Secret (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in operator
    Whoami,

    /// List all instances
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,

        /// Show one card per instance instead of a table
        #[arg(long)]
        cards: bool,
    },

    /// Show one instance (by id or name)
    Get {
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Create a new instance from a script or archive
    Create {
        /// Instance name
        name: String,

        /// Code artifact (.py script or .zip archive)
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short, long)]
        description: Option<String>,

        /// Entry object inside the code
        #[arg(long, default_value = "mcp")]
        entry_object: String,

        /// Port or comma-separated ports (blank: assigned on start)
        #[arg(long)]
        ports: Option<String>,

        /// Command override
        #[arg(long)]
        command: Option<String>,

        /// Arguments override
        #[arg(long)]
        args: Option<String>,

        /// Base image (default: platform image if offered)
        #[arg(long)]
        image: Option<String>,

        /// Environment variable, KEY=VALUE (repeatable)
        #[arg(short = 'e', long = "env", value_parser = parse_key_value)]
        env: Vec<(String, String)>,

        /// Secret environment variable, KEY=VALUE (repeatable)
        #[arg(long = "secret", value_parser = parse_key_value)]
        secrets: Vec<(String, String)>,

        /// Config file to upload (repeatable)
        #[arg(long = "config")]
        config: Vec<PathBuf>,

        /// Inline config file, FILENAME=CONTENT (repeatable)
        #[arg(long = "config-inline", value_parser = parse_key_value)]
        config_inline: Vec<(String, String)>,
    },

    /// Update editable fields of an instance
    Update {
        id: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        entry_object: Option<String>,

        /// Port (empty string clears it)
        #[arg(long)]
        port: Option<String>,

        #[arg(long)]
        command: Option<String>,

        #[arg(long)]
        args: Option<String>,
    },

    /// Replace the code artifact of an instance
    UploadCode { id: String, file: PathBuf },

    /// Add or overwrite config files of an instance
    UploadConfig {
        id: String,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Run a lifecycle action (start, stop, restart, remove_container, rebuild)
    Action {
        id: String,

        action: LifecycleAction,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete an instance
    Delete {
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List base images offered for new instances
    Images {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Show container engine status and the port pool
    System {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Show the port pool only
    Ports {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Instance counts by status
    Overview,

    /// Show control plane version (no sign-in needed)
    Version,

    /// Show current configuration
    Config,

    /// Manage stored config files of an instance
    ConfigFiles {
        #[command(subcommand)]
        command: ConfigFilesCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigFilesCommand {
    /// List config files
    List {
        id: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Add a config file
    Add {
        id: String,

        filename: String,

        /// Read content from this file
        #[arg(long, conflicts_with = "content")]
        from: Option<PathBuf>,

        /// Inline content
        #[arg(long)]
        content: Option<String>,
    },

    /// Replace a config file
    Update {
        id: String,

        config_id: i64,

        filename: String,

        #[arg(long, conflicts_with = "content")]
        from: Option<PathBuf>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Remove a config file
    Remove {
        id: String,

        config_id: i64,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Splits `KEY=VALUE` at the first `=`. The key may be empty; form
/// validation reports that.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}
