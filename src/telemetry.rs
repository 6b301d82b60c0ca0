//! Exporter self-telemetry.
//!
//! These series describe the exporter itself and are registered next to the
//! schema metrics in the same prometheus registry.

use prometheus::{Gauge, IntCounter, IntCounterVec, Opts, Registry};

use crate::error::{ExporterError, FailureKind};
use crate::updater::CycleReport;

/// Prefix of every self-telemetry metric.
pub const TELEMETRY_PREFIX: &str = "herakles_nic_exporter";

#[derive(Clone)]
pub struct ExporterTelemetry {
    pub devices: Gauge,
    pub update_duration_seconds: Gauge,
    pub update_success: Gauge,
    pub updates_total: IntCounter,
    pub read_errors_total: IntCounterVec, // labels: kind
    pub scrape_duration_seconds: Gauge,
}

impl ExporterTelemetry {
    /// Creates and registers the telemetry metrics with the registry.
    pub fn new(registry: &Registry, device_count: usize) -> Result<Self, ExporterError> {
        let devices = Gauge::new(
            format!("{TELEMETRY_PREFIX}_devices"),
            "Number of devices discovered at startup",
        )?;
        let update_duration_seconds = Gauge::new(
            format!("{TELEMETRY_PREFIX}_update_duration_seconds"),
            "Duration of the last update cycle",
        )?;
        let update_success = Gauge::new(
            format!("{TELEMETRY_PREFIX}_update_success"),
            "Whether the last update cycle read every device without errors (1) or not (0)",
        )?;
        let updates_total = IntCounter::new(
            format!("{TELEMETRY_PREFIX}_updates_total"),
            "Number of completed update cycles",
        )?;
        let read_errors_total = IntCounterVec::new(
            Opts::new(
                format!("{TELEMETRY_PREFIX}_read_errors_total"),
                "Counter read problems by kind",
            ),
            &["kind"],
        )?;
        let scrape_duration_seconds = Gauge::new(
            format!("{TELEMETRY_PREFIX}_scrape_duration_seconds"),
            "Time spent rendering the last /metrics response",
        )?;

        registry.register(Box::new(devices.clone()))?;
        registry.register(Box::new(update_duration_seconds.clone()))?;
        registry.register(Box::new(update_success.clone()))?;
        registry.register(Box::new(updates_total.clone()))?;
        registry.register(Box::new(read_errors_total.clone()))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        devices.set(device_count as f64);

        Ok(Self {
            devices,
            update_duration_seconds,
            update_success,
            updates_total,
            read_errors_total,
            scrape_duration_seconds,
        })
    }

    pub fn observe_cycle(&self, report: &CycleReport) {
        if report.skipped {
            return;
        }
        self.updates_total.inc();
        self.update_duration_seconds.set(report.duration_seconds);
        self.update_success
            .set(if report.is_success() { 1.0 } else { 0.0 });

        if report.missing_files > 0 {
            self.read_errors_total
                .with_label_values(&[FailureKind::MetricFileMissing.as_str()])
                .inc_by(report.missing_files as u64);
        }
        for err in &report.errors {
            self.read_errors_total
                .with_label_values(&[err.kind.as_str()])
                .inc();
        }
    }

    pub fn observe_scrape(&self, seconds: f64) {
        self.scrape_duration_seconds.set(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::CycleError;

    #[test]
    fn test_observe_cycle() {
        let registry = Registry::new();
        let telemetry = ExporterTelemetry::new(&registry, 2).unwrap();

        telemetry.observe_cycle(&CycleReport {
            devices_total: 2,
            devices_read: 1,
            devices_unavailable: 1,
            missing_files: 2,
            errors: vec![CycleError {
                device: "ionic_0".into(),
                kind: FailureKind::DeviceCountersUnavailable,
                message: String::new(),
            }],
            duration_seconds: 0.25,
            ..Default::default()
        });

        assert_eq!(telemetry.devices.get(), 2.0);
        assert_eq!(telemetry.updates_total.get(), 1);
        assert_eq!(telemetry.update_success.get(), 1.0);
        assert_eq!(telemetry.update_duration_seconds.get(), 0.25);
        assert_eq!(
            telemetry
                .read_errors_total
                .with_label_values(&["metric_file_missing"])
                .get(),
            2
        );
        assert_eq!(
            telemetry
                .read_errors_total
                .with_label_values(&["device_counters_unavailable"])
                .get(),
            1
        );
    }

    #[test]
    fn test_skipped_cycle_ignored() {
        let registry = Registry::new();
        let telemetry = ExporterTelemetry::new(&registry, 1).unwrap();
        telemetry.observe_cycle(&CycleReport {
            skipped: true,
            ..Default::default()
        });
        assert_eq!(telemetry.updates_total.get(), 0);
    }
}
