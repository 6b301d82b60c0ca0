//! Configuration management for herakles-nic-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use clap::ValueEnum;

use crate::cli::{Args, ConfigFormat, LogLevel};
use crate::discovery::{
    DevicePattern, DEFAULT_DEVICE_PATTERN, DEFAULT_DEVICE_ROOT, DEFAULT_PORT_NUMBER,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9102;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_INTERVAL_SECONDS: u64 = 15;

/// Routes that the metrics path must not shadow.
const RESERVED_PATHS: &[&str] = &["/", "/health", "/config"];

/// Exporter configuration. Every field is optional; unset fields fall back
/// to the compiled-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,
    #[serde(alias = "metrics-path")]
    pub metrics_path: Option<String>,

    // Collection
    #[serde(alias = "interval-seconds")]
    pub interval_seconds: Option<u64>,
    #[serde(alias = "device-root")]
    pub device_root: Option<PathBuf>,
    #[serde(alias = "device-pattern")]
    pub device_pattern: Option<String>,
    #[serde(alias = "port-number")]
    pub port_number: Option<u32>,
    pub parallelism: Option<usize>,

    // Feature flags
    pub enable_health: Option<bool>,
    pub enable_telemetry: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            metrics_path: Some(DEFAULT_METRICS_PATH.to_string()),
            interval_seconds: Some(DEFAULT_INTERVAL_SECONDS),
            device_root: Some(PathBuf::from(DEFAULT_DEVICE_ROOT)),
            device_pattern: Some(DEFAULT_DEVICE_PATTERN.to_string()),
            port_number: Some(DEFAULT_PORT_NUMBER),
            parallelism: None,
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.unwrap_or(DEFAULT_INTERVAL_SECONDS))
    }

    pub fn device_root(&self) -> PathBuf {
        self.device_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE_ROOT))
    }

    pub fn device_pattern(&self) -> &str {
        self.device_pattern
            .as_deref()
            .unwrap_or(DEFAULT_DEVICE_PATTERN)
    }

    pub fn port_number(&self) -> u32 {
        self.port_number.unwrap_or(DEFAULT_PORT_NUMBER)
    }

    pub fn metrics_path(&self) -> &str {
        self.metrics_path.as_deref().unwrap_or(DEFAULT_METRICS_PATH)
    }

    /// Effective log level; unset or unparsable values fall back to `info`.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|s| LogLevel::from_str(s, true).ok())
            .unwrap_or(LogLevel::Info)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.interval_seconds == Some(0) {
        return Err("interval_seconds must be greater than 0".into());
    }

    if cfg.port_number == Some(0) {
        return Err("port_number must be 1 or greater".into());
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_str(level, true).is_err() {
            return Err(format!(
                "Invalid log_level '{}' (off, error, warn, info, debug, trace)",
                level
            )
            .into());
        }
    }

    let pattern = cfg.device_pattern();
    if pattern.trim().is_empty() {
        return Err("device_pattern must not be empty".into());
    }
    if let Err(e) = DevicePattern::new(pattern) {
        return Err(format!("Invalid device_pattern '{}': {}", pattern, e).into());
    }

    let metrics_path = cfg.metrics_path();
    if !metrics_path.starts_with('/') {
        return Err(format!("metrics_path '{}' must start with '/'", metrics_path).into());
    }
    if RESERVED_PATHS.contains(&metrics_path) {
        return Err(format!(
            "metrics_path '{}' collides with a built-in endpoint",
            metrics_path
        )
        .into());
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

/// Checks that a TLS input file exists, is readable and not empty.
fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("TLS {} file not found: {}", what, path).into());
    }
    match fs::metadata(p) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Err(e) => {
            Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into())
        }
        Ok(_) => Ok(()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(path) = &args.metrics_path {
        config.metrics_path = Some(path.clone());
    }

    // Collection settings
    if let Some(interval) = args.interval {
        config.interval_seconds = Some(interval);
    }
    if let Some(root) = &args.device_root {
        config.device_root = Some(root.clone());
    }
    if let Some(pattern) = &args.device_pattern {
        config.device_pattern = Some(pattern.clone());
    }
    if let Some(port_number) = args.port_number {
        config.port_number = Some(port_number);
    }
    if let Some(threads) = args.parallelism {
        config.parallelism = Some(threads);
    }

    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Loads a config file, or the first default location that exists.
/// Returns defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/herakles/nic-exporter.yaml",
                "/etc/herakles/nic-exporter.yml",
                "/etc/herakles/nic-exporter.json",
                "./herakles-nic-exporter.yaml",
                "./herakles-nic-exporter.yml",
                "./herakles-nic-exporter.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    if !path.exists() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Serializes configuration in the requested format.
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.interval(), Duration::from_secs(15));
        assert_eq!(cfg.device_root(), PathBuf::from("/sys/class/infiniband"));
        assert_eq!(cfg.device_pattern(), "ionic_*");
        assert_eq!(cfg.port, Some(9102));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let cfg = Config {
            interval_seconds: Some(0),
            ..Config::default()
        };
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("interval_seconds"));
    }

    #[test]
    fn test_reserved_metrics_path_rejected() {
        let cfg = Config {
            metrics_path: Some("/health".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            metrics_path: Some("metrics".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let cfg = Config {
            enable_tls: Some(true),
            tls_cert_path: Some("/nonexistent/cert.pem".into()),
            ..Config::default()
        };
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("tls_key_path is not set"));
    }

    #[test]
    fn test_load_yaml_and_cli_precedence() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "port: 9300\ninterval_seconds: 30\ndevice_pattern: \"mlx5_*\"").unwrap();

        let args = Args::parse_from([
            "herakles-nic-exporter",
            "--config",
            file.path().to_str().unwrap(),
            "--port",
            "9400",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.port, Some(9400));
        assert_eq!(cfg.interval_seconds, Some(30));
        assert_eq!(cfg.device_pattern(), "mlx5_*");
        // unset in file, not defaulted by serde
        assert_eq!(cfg.device_root, None);
        assert_eq!(cfg.device_root(), PathBuf::from(DEFAULT_DEVICE_ROOT));
    }

    #[test]
    fn test_log_level_from_file_and_cli() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "log_level: debug").unwrap();
        let path = file.path().to_str().unwrap();

        let args = Args::parse_from(["herakles-nic-exporter", "--config", path]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.log_level(), LogLevel::Debug);

        let args = Args::parse_from([
            "herakles-nic-exporter",
            "--config",
            path,
            "--log-level",
            "warn",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.log_level(), LogLevel::Warn);

        let args = Args::parse_from(["herakles-nic-exporter", "--no-config"]);
        assert_eq!(resolve_config(&args).unwrap().log_level(), LogLevel::Info);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let cfg = Config {
            log_level: Some("loud".into()),
            ..Config::default()
        };
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Invalid log_level"));

        let cfg = Config {
            log_level: Some("TRACE".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"port": 9500, "enable_telemetry": false}}"#).unwrap();
        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.port, Some(9500));
        assert_eq!(cfg.enable_telemetry, Some(false));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("missing.yaml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_render_toml() {
        let text = render_config(&Config::default(), &ConfigFormat::Toml).unwrap();
        assert!(text.contains("interval_seconds = 15"));
    }
}
