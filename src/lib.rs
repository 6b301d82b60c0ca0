//! Herakles NIC Exporter Library
//!
//! Samples the hardware counters that RDMA network interfaces expose under
//! `/sys/class/infiniband/<device>/ports/<n>/hw_counters/` and republishes
//! them as device-labelled Prometheus metrics.
//!
//! # Features
//!
//! - **Schema-driven**: the exported metric set is the static list in [`schema`]
//! - **Kind-aware updates**: gauges keep the last reading, counters sum readings
//! - **Per-device isolation**: a broken device never stops the others
//! - **Background refresh**: scrapes only read; a scheduler refreshes values
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use herakles_nic_exporter::discovery::{discover_devices, DevicePattern};
//! use herakles_nic_exporter::registry::MetricRegistry;
//! use herakles_nic_exporter::schema::METRIC_DEFINITIONS;
//! use herakles_nic_exporter::updater::Updater;
//!
//! let pattern = DevicePattern::new("ionic_*").unwrap();
//! let devices = discover_devices(Path::new("/sys/class/infiniband"), &pattern, 1).unwrap();
//!
//! let registry = Arc::new(MetricRegistry::new(METRIC_DEFINITIONS).unwrap());
//! let updater = Updater::new(devices, registry.clone());
//!
//! let report = updater.run_cycle();
//! println!("{} values applied", report.observations_applied);
//! println!("{}", registry.encode().unwrap());
//! ```

pub mod cli;
pub mod collectors;
pub mod config;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod health_stats;
pub mod registry;
pub mod scheduler;
pub mod schema;
pub mod startup_checks;
pub mod state;
pub mod telemetry;
pub mod updater;

// Re-export main types for convenience
pub use discovery::{discover_devices, Device, DevicePattern};
pub use error::ExporterError;
pub use registry::{MetricRegistry, Snapshot};
pub use schema::{MetricDefinition, MetricKind, METRIC_DEFINITIONS};
pub use state::{AppState, SharedState};
pub use updater::{CycleReport, Updater};
