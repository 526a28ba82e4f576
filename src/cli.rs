use clap::Parser;

use crate::auth::session::DEFAULT_USER_AGENT;
use crate::transfer::profile::DEFAULT_PROFILE_PATH;
use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "sharepoint-dl",
    version,
    about = "Download shared SharePoint / OneDrive folders through rclone"
)]
pub struct Cli {
    /// JSON file with the tasks to run: an array of
    /// {"link": ..., "password": ..., "downloadTo": ...}
    #[arg(short = 't', long)]
    pub tasks: String,

    /// User-Agent sent with every request during the link handshake
    #[arg(long, env = "SHAREPOINT_DL_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Seconds to wait before retrying a rate-limited or failed task,
    /// and after a failed batch
    #[arg(long, default_value_t = 60)]
    pub retry_wait: u64,

    /// Give up on a task after this many attempts (default: retry forever)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,

    /// Number of simultaneous file transfers
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub transfers: u16,

    /// Download at most this many files per task (0 means no limit)
    #[arg(long)]
    pub file_limit: Option<usize>,

    /// Resume from the first listed file whose name contains this text
    #[arg(long)]
    pub initial_file: Option<String>,

    /// List the shared folder recursively instead of only its top level
    #[arg(long)]
    pub recursive: bool,

    /// Don't ask rclone to print transfer progress
    #[arg(long)]
    pub no_progress: bool,

    /// Path to the rclone binary (default: looked up on PATH)
    #[arg(long)]
    pub rclone: Option<String>,

    /// Where to write the rclone connection profile
    #[arg(long, default_value = DEFAULT_PROFILE_PATH)]
    pub profile: String,

    /// Exit with status 2 if any task was skipped
    #[arg(long)]
    pub strict: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
