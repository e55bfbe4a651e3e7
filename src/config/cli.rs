use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the confgend binary.
#[derive(Debug, Parser)]
#[command(
    name = "confgend",
    version,
    about = "PBX configuration generation daemon"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CONFGEND_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the line protocol server.
    Serve(Box<ServeArgs>),
    /// Generate one file in-process and print it.
    Generate(GenerateArgs),
    /// Send one request to a running daemon and print the response.
    Request(RequestArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StorageOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the cache directory.
    #[arg(long = "cache-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub storage: StorageOverrides,

    /// Override the listener host.
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the maximum request line length in bytes.
    #[arg(long = "max-request-bytes", value_name = "BYTES")]
    pub max_request_bytes: Option<u64>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "graceful-shutdown-seconds", value_name = "SECONDS")]
    pub graceful_shutdown_seconds: Option<u64>,

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
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub storage: StorageOverrides,

    /// File to generate, as `resource/filename`.
    #[arg(value_name = "RESOURCE/FILENAME")]
    pub target: String,

    /// Request arguments (`cached`, `invalidate`, or generator-specific).
    #[arg(value_name = "ARG")]
    pub args: Vec<String>,
}

#[derive(Debug, Args, Clone)]
pub struct RequestArgs {
    /// Daemon address; defaults to the configured listener.
    #[arg(long = "addr", value_name = "HOST:PORT")]
    pub addr: Option<String>,

    /// File to request, as `resource/filename`.
    #[arg(value_name = "RESOURCE/FILENAME")]
    pub target: String,

    /// Request arguments (`cached`, `invalidate`, or generator-specific).
    #[arg(value_name = "ARG")]
    pub args: Vec<String>,
}
