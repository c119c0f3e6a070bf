use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use memento_core::device::Capability;
use memento_core::screen::SortOrder;

#[derive(Parser)]
#[command(name = "memento")]
#[command(about = "Keep photos and voice clips tied to your account")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and store its profile
    #[command(alias = "signup")]
    Register {
        #[arg(long, value_name = "NAME")]
        first_name: String,
        #[arg(long, value_name = "NAME")]
        last_name: String,
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Email verification
    Verify {
        #[command(subcommand)]
        command: VerifyCommands,
    },
    /// Photo gallery
    #[command(alias = "photo")]
    Photos {
        #[command(subcommand)]
        command: PhotoCommands,
    },
    /// Voice clip gallery
    Audio {
        #[command(subcommand)]
        command: AudioCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Sync local replica with remote libSQL database
    Sync,
}

#[derive(Subcommand)]
pub enum VerifyCommands {
    /// Send the verification email
    Send,
    /// Re-read the account and print its verification state
    Status,
    /// Poll until the address is verified
    Wait {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "3000", value_name = "MS")]
        interval_ms: u64,
        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum PhotoCommands {
    /// Pick an image file from disk
    Add {
        /// Image to add
        path: PathBuf,
    },
    /// Take a picture with the configured camera command
    Capture,
    /// List photos
    List {
        /// Sort order
        #[arg(long, value_enum, default_value_t = SortArg::Date)]
        sort: SortArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Keep listening and reprint on every change
        #[arg(long)]
        watch: bool,
    },
    /// Choose share, delete, or cancel for a photo
    Open {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Share a photo by email
    Share {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Delete a photo
    Delete {
        /// Record ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AudioCommands {
    /// Record PCM16 little-endian audio from stdin until EOF or Ctrl-C
    Record {
        /// Keep the clip on disk without storing a record
        #[arg(long)]
        no_upload: bool,
    },
    /// List voice clips
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Keep listening and reprint on every change
        #[arg(long)]
        watch: bool,
    },
    /// Play a voice clip
    Play {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Choose share, delete, or cancel for a clip
    Open {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Share a voice clip by email
    Share {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Delete a voice clip
    Delete {
        /// Record ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Firebase web config JSON file
        #[arg(long, value_name = "PATH")]
        backend_config: Option<PathBuf>,
        /// Firebase API key
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
        /// Firebase project id
        #[arg(long, value_name = "ID")]
        project_id: Option<String>,
        /// Firebase auth domain
        #[arg(long, value_name = "DOMAIN")]
        auth_domain: Option<String>,
        /// Directory for the database, photos, and clips
        #[arg(long, value_name = "PATH")]
        data_dir: Option<PathBuf>,
        /// Camera command; `{output}` is replaced by the target file
        #[arg(long, value_name = "COMMAND")]
        camera_command: Option<String>,
        /// Audio player command; the clip path is appended
        #[arg(long, value_name = "COMMAND")]
        player_command: Option<String>,
        /// Directory where shared messages are written
        #[arg(long, value_name = "PATH")]
        outbox_dir: Option<PathBuf>,
        /// Grant a device permission without prompting
        #[arg(long, value_enum, value_name = "CAPABILITY")]
        grant: Vec<CapabilityArg>,
        /// Deny a device permission without prompting
        #[arg(long, value_enum, value_name = "CAPABILITY")]
        deny: Vec<CapabilityArg>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortArg {
    Date,
    Name,
}

impl From<SortArg> for SortOrder {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Date => Self::Date,
            SortArg::Name => Self::Name,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CapabilityArg {
    Camera,
    MediaLibrary,
    Microphone,
}

impl From<CapabilityArg> for Capability {
    fn from(value: CapabilityArg) -> Self {
        match value {
            CapabilityArg::Camera => Self::Camera,
            CapabilityArg::MediaLibrary => Self::MediaLibrary,
            CapabilityArg::Microphone => Self::Microphone,
        }
    }
}
