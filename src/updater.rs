//! Update cycle: reads every discovered device and folds the readings into
//! the metric registry.
//!
//! A cycle is driven by the scheduler, and by the `test` subcommand. Failures
//! are isolated per device and reported through logs and the returned
//! [`CycleReport`].

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::collectors::{read_device_counters, DeviceReading};
use crate::discovery::Device;
use crate::error::{ExporterError, FailureKind};
use crate::registry::MetricRegistry;

/// A failure recorded during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleError {
    pub device: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Summary of one update cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Set when another cycle was already running and this one did nothing.
    pub skipped: bool,
    pub devices_total: usize,
    /// Devices whose every present counter file was applied.
    pub devices_read: usize,
    /// Devices without a counter directory this cycle.
    pub devices_unavailable: usize,
    /// Devices whose reads were aborted by a read, parse or apply error.
    pub devices_failed: usize,
    pub observations_applied: usize,
    pub missing_files: usize,
    pub errors: Vec<CycleError>,
    pub duration_seconds: f64,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        !self.skipped && self.devices_failed == 0
    }

    fn record_error(&mut self, device: &str, err: &ExporterError) {
        self.errors.push(CycleError {
            device: device.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        });
    }
}

/// Clears the in-flight flag when a cycle ends, even by unwinding.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the device set fixed at startup and the registry it writes to.
pub struct Updater {
    devices: Vec<Device>,
    registry: Arc<MetricRegistry>,
    in_flight: AtomicBool,
}

impl Updater {
    pub fn new(devices: Vec<Device>, registry: Arc<MetricRegistry>) -> Self {
        Self {
            devices,
            registry,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs one full pass over all devices.
    ///
    /// Device files are read in parallel; readings are applied in discovery
    /// order once every device has been read. A call made while another
    /// cycle is in flight returns immediately with `skipped` set.
    #[instrument(skip(self), fields(devices = self.devices.len()))]
    pub fn run_cycle(&self) -> CycleReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Update cycle already in progress, skipping");
            return CycleReport {
                skipped: true,
                devices_total: self.devices.len(),
                ..Default::default()
            };
        }
        let _in_flight = InFlight(&self.in_flight);

        let start = Instant::now();
        debug!("Starting update cycle");

        let definitions = self.registry.definitions();
        let readings: Vec<DeviceReading> = self
            .devices
            .par_iter()
            .map(|device| read_device_counters(device, definitions))
            .collect();

        let mut report = CycleReport {
            devices_total: self.devices.len(),
            ..Default::default()
        };
        for reading in readings {
            self.apply_reading(reading, &mut report);
        }

        report.duration_seconds = start.elapsed().as_secs_f64();
        info!(
            "Update cycle completed: {}/{} devices read, {} values applied, {} files missing, {:.2}ms",
            report.devices_read,
            report.devices_total,
            report.observations_applied,
            report.missing_files,
            report.duration_seconds * 1000.0
        );

        report
    }

    fn apply_reading(&self, reading: DeviceReading, report: &mut CycleReport) {
        let DeviceReading {
            device,
            observations,
            missing,
            outcome,
        } = reading;

        for obs in &observations {
            if let Err(e) = self.registry.apply(obs.definition, &device, obs.value) {
                error!("Error applying {} for device {}: {}", obs.definition.name, device, e);
                report.record_error(&device, &e);
                report.devices_failed += 1;
                return;
            }
            report.observations_applied += 1;
        }

        if !missing.is_empty() {
            warn!(
                "{} metric file(s) missing for device {}: {}",
                missing.len(),
                device,
                missing.join(", ")
            );
            report.missing_files += missing.len();
        }

        match outcome {
            Ok(()) => report.devices_read += 1,
            Err(e @ ExporterError::DeviceCountersUnavailable { .. }) => {
                warn!("{}, skipping", e);
                report.record_error(&device, &e);
                report.devices_unavailable += 1;
            }
            Err(e) => {
                error!("Error updating metrics for device {}: {}", device, e);
                report.record_error(&device, &e);
                report.devices_failed += 1;
            }
        }
    }
}
