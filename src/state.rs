//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the background update task.

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::discovery::Device;
use crate::error::ExporterError;
use crate::health_stats::HealthStats;
use crate::registry::MetricRegistry;
use crate::schema::METRIC_DEFINITIONS;
use crate::telemetry::ExporterTelemetry;
use crate::updater::{CycleReport, Updater};

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Arc<MetricRegistry>,
    pub updater: Arc<Updater>,
    /// Present unless telemetry is disabled in the configuration.
    pub telemetry: Option<ExporterTelemetry>,
    pub health_stats: Arc<HealthStats>,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Builds the registry from the schema and wires it to the discovered
    /// devices.
    pub fn new(config: Config, devices: Vec<Device>) -> Result<Self, ExporterError> {
        let registry = Arc::new(MetricRegistry::new(METRIC_DEFINITIONS)?);

        let telemetry = if config.enable_telemetry.unwrap_or(true) {
            Some(ExporterTelemetry::new(registry.registry(), devices.len())?)
        } else {
            None
        };

        Ok(Self {
            updater: Arc::new(Updater::new(devices, registry.clone())),
            registry,
            telemetry,
            health_stats: Arc::new(HealthStats::new()),
            config: Arc::new(config),
            start_time: Instant::now(),
        })
    }

    pub fn devices(&self) -> &[Device] {
        self.updater.devices()
    }

    /// Feeds a finished cycle into health stats and telemetry.
    pub fn record_cycle(&self, report: &CycleReport) {
        self.health_stats.record_cycle(report);
        if let Some(telemetry) = &self.telemetry {
            telemetry.observe_cycle(report);
        }
    }
}
