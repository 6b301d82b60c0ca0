//! herakles-nic-exporter - version 0.1.0
//!
//! Prometheus exporter for RDMA NIC hardware counters with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod commands;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

use commands::{
    command_check, command_config, command_generate_testdata, command_schema, command_test,
};
use herakles_nic_exporter::cli::{Args, Commands, LogLevel};
use herakles_nic_exporter::config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_PORT,
};
use herakles_nic_exporter::discovery::{discover_devices, DevicePattern};
use herakles_nic_exporter::handlers::build_router;
use herakles_nic_exporter::scheduler::spawn_scheduler;
use herakles_nic_exporter::startup_checks;
use herakles_nic_exporter::state::AppState;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let level = config.log_level();
    let log_level = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Sizes the global rayon pool used for parallel device reads.
fn configure_parallelism(config: &Config) {
    let Some(threads) = config.parallelism.filter(|n| *n > 0) else {
        return;
    };

    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        Ok(()) => info!("Device reader pool: {} thread(s)", threads),
        Err(e) => warn!("Could not size device reader pool: {}", e),
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        match command {
            Commands::Config {
                output,
                format,
                commented,
            } => return command_config(output.clone(), format.clone(), *commented),
            Commands::Schema { kind } => return command_schema(kind.clone()),
            Commands::GenerateTestdata {
                output,
                devices,
                missing_ratio,
            } => return command_generate_testdata(output.clone(), *devices, *missing_ratio),
            _ => {
                // Other commands need config validation
            }
        }

        let config = load_validated_config(&args)?;

        return match command {
            Commands::Check { verbose } => command_check(*verbose, &config),

            Commands::Test {
                iterations,
                verbose,
            } => command_test(*iterations, *verbose, &config),

            Commands::CheckRequirements => {
                println!("🔍 Checking Runtime Requirements");
                println!("================================\n");

                setup_logging(&config);
                match startup_checks::validate_requirements(&config.device_root()) {
                    Ok(_) => {
                        println!("\n✅ All requirements met - ready for production!");
                        Ok(())
                    }
                    Err(e) => {
                        eprintln!("\n❌ Requirements check failed: {}", e);
                        std::process::exit(1);
                    }
                }
            }

            Commands::Config { .. }
            | Commands::Schema { .. }
            | Commands::GenerateTestdata { .. } => Ok(()),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;

    setup_logging(&config);

    info!("Starting herakles-nic-exporter");

    let device_root = config.device_root();
    if let Err(e) = startup_checks::validate_requirements(&device_root) {
        error!("❌ Startup validation failed: {}", e);
    }

    configure_parallelism(&config);

    // Device set is fixed for the lifetime of the process
    let pattern = DevicePattern::new(config.device_pattern())?;
    let devices = match discover_devices(&device_root, &pattern, config.port_number()) {
        Ok(devices) => devices,
        Err(e) => {
            error!("❌ Device discovery failed: {}", e);
            std::process::exit(1);
        }
    };

    let bind_ip_str = config
        .bind
        .clone()
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;
    let interval = config.interval();
    // Both paths are checked by validate_effective_config when TLS is enabled
    let tls_paths = match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) if config.enable_tls.unwrap_or(false) => {
            Some((cert.clone(), key.clone()))
        }
        _ => None,
    };

    let state = Arc::new(AppState::new(config, devices)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = spawn_scheduler(state.clone(), interval, shutdown_rx);

    let app = build_router(state.clone());

    if let Some((cert_path, key_path)) = tls_paths {
        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!(
            "herakles-nic-exporter listening on https://{}:{}",
            bind_ip_str, port
        );

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
            }
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "herakles-nic-exporter listening on http://{}:{}",
            bind_ip_str, port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
            }
        }
    }

    // A running cycle finishes before the scheduler observes the flag
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        warn!("Scheduler task ended abnormally: {}", e);
    }

    info!("herakles-nic-exporter stopped gracefully");
    Ok(())
}
