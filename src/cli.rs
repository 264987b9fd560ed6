use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, configure and start a new directory server instance
    Create(CreateArgs),

    /// Start the directory service
    Start(CommonArgs),

    /// Stop the directory service
    Stop(CommonArgs),

    /// Restart the directory service
    Restart(CommonArgs),

    /// Change the password of the admin system account
    ChangeAdminPassword(ChangeAdminPasswordArgs),

    /// Validate the settings file and print the effective settings
    Validate(CommonArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

/// Options shared by every subcommand that touches the host.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to a YAML settings file overriding the default host layout
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// OS account the directory service runs as (created if missing)
    #[arg(short, long, default_value = "dirsrv")]
    pub user: String,

    /// Kerberos realm name, e.g. EXAMPLE.COM
    #[arg(short, long)]
    pub realm: String,

    /// Fully-qualified host name of this server
    #[arg(long)]
    pub hostname: String,

    /// File holding the Directory Manager password
    #[arg(long)]
    pub dm_password_file: Utf8PathBuf,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ChangeAdminPasswordArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Server id of the existing instance (the `slapd-<id>` suffix)
    #[arg(short, long)]
    pub server_id: String,

    /// Kerberos realm name of the instance
    #[arg(short, long)]
    pub realm: String,

    /// Fully-qualified host name of this server
    #[arg(long)]
    pub hostname: String,

    /// OS account the directory service runs as
    #[arg(short, long, default_value = "dirsrv")]
    pub user: String,

    /// File holding the current Directory Manager password
    #[arg(long)]
    pub dm_password_file: Utf8PathBuf,

    /// File holding the new admin password
    #[arg(long)]
    pub new_password_file: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// Maps directly to the `tracing` levels; `--log-level debug` shows every
/// step detail, `--log-level trace` also shows command resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Commands {
    /// Log level requested on the command line, if the subcommand has one.
    pub fn log_level(&self) -> Option<LogLevel> {
        match self {
            Commands::Create(opts) => Some(opts.common.log_level),
            Commands::ChangeAdminPassword(opts) => Some(opts.common.log_level),
            Commands::Start(opts)
            | Commands::Stop(opts)
            | Commands::Restart(opts)
            | Commands::Validate(opts) => Some(opts.log_level),
            Commands::Completions(_) => None,
        }
    }
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
