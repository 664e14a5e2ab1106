use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::application::examiner::ExaminerFamily;
use crate::domain::types::{CountryCode, Locale};

/// Command-line arguments for the helpgate binary.
#[derive(Debug, Parser)]
#[command(name = "helpgate", version, about = "Help-center gateway")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "HELPGATE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP gateway.
    Serve(Box<ServeArgs>),
    /// Pull catalog data from the upstream once and exit.
    Sync(SyncArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the per-request deadline.
    #[arg(long = "server-request-timeout-seconds", value_name = "SECONDS")]
    pub server_request_timeout_seconds: Option<u64>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override how long a loader waits for more keys before dispatching.
    #[arg(long = "loader-batch-wait-ms", value_name = "MILLIS")]
    pub loader_batch_wait_ms: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SyncArgs {
    /// Restrict the sync to one country.
    #[arg(long, value_name = "CODE", value_parser = CountryCode::from_str)]
    pub country: Option<CountryCode>,

    /// Restrict the sync to one locale.
    #[arg(long, value_name = "LOCALE", value_parser = Locale::from_str)]
    pub locale: Option<Locale>,

    /// Restrict the sync to the given families; repeatable.
    #[arg(long = "family", value_name = "FAMILY", value_parser = ExaminerFamily::from_str)]
    pub families: Vec<ExaminerFamily>,

    /// Sync every family for every supported country and locale.
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with_all = ["country", "locale", "families"])]
    pub all: bool,
}
