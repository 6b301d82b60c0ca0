//! CLI arguments and subcommands for herakles-nic-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-nic-exporter",
    about = "Prometheus exporter for RDMA NIC hardware counters",
    long_about = "Prometheus exporter for RDMA NIC hardware counters.\n\n\
                  Discovers ionic devices under /sys/class/infiniband, reads their \
                  ports/1/hw_counters files on a fixed interval and serves them as \
                  per-device gauges and counters.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version,
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-nic-exporter — More info: https://www.herakles.now — Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Path serving the Prometheus exposition
    #[arg(long)]
    pub metrics_path: Option<String>,

    /// Log level (default: info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Seconds between the end of one update cycle and the start of the next
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Directory scanned for devices
    #[arg(long)]
    pub device_root: Option<PathBuf>,

    /// Device name pattern (`*`, `?` and `[...]` globs)
    #[arg(long)]
    pub device_pattern: Option<String>,

    /// Port whose hw_counters are exported
    #[arg(long)]
    pub port_number: Option<u32>,

    /// Parallel device reader threads (0 = auto)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable internal herakles_nic_exporter_* metrics
    #[arg(long)]
    pub disable_telemetry: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover devices and report counter file coverage
    Check {
        /// List every missing counter file
        #[arg(long)]
        verbose: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run update cycles once and print the resulting exposition
    Test {
        /// Number of update cycles
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print every cycle's report
        #[arg(long)]
        verbose: bool,
    },

    /// List the exported metric schema
    Schema {
        /// Only show metrics of this kind
        #[arg(short = 'k', long)]
        kind: Option<String>,
    },

    /// Generate a synthetic device tree for local testing
    GenerateTestdata {
        /// Directory that will act as the device root
        #[arg(short = 'o', long, default_value = "testdata")]
        output: PathBuf,

        /// Number of devices to create
        #[arg(long, default_value_t = 2)]
        devices: usize,

        /// Fraction (0.0-1.0) of counter files left out per device
        #[arg(long, default_value_t = 0.0)]
        missing_ratio: f64,
    },

    /// Check runtime requirements and permissions
    CheckRequirements,
}
