//! Error types for device discovery, counter reading and metric updates.
//!
//! Startup errors (`DiscoveryIo`, `NoDevicesFound`) are fatal to the process.
//! Everything raised during an update cycle is logged and isolated to the
//! device that produced it.

use std::fmt;
use std::path::PathBuf;

/// Errors produced by the collection engine.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("failed to scan device root {root}: {source}")]
    DiscoveryIo {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no devices matching '{pattern}' found in {root}")]
    NoDevicesFound { root: PathBuf, pattern: String },

    #[error("device {device} has no hw_counters directory at {path}")]
    DeviceCountersUnavailable { device: String, path: PathBuf },

    #[error("metric file {metric} missing for device {device}")]
    MetricFileMissing { device: String, metric: String },

    #[error("error reading {path}: {source}")]
    MetricRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing value '{raw}' from {path}")]
    MetricParse { path: PathBuf, raw: String },

    #[error("counter {metric} on device {device} reported negative value {value}")]
    NegativeCounter {
        device: String,
        metric: String,
        value: f64,
    },

    #[error("metric {0} is not part of the schema")]
    UnknownMetric(String),

    #[error("metric {metric} is a {actual}, not a {expected}")]
    KindMismatch {
        metric: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

/// Error class, used as the `kind` telemetry label and for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    DiscoveryIo,
    NoDevicesFound,
    DeviceCountersUnavailable,
    MetricFileMissing,
    MetricRead,
    MetricParse,
    NegativeCounter,
    UnknownMetric,
    KindMismatch,
    Prometheus,
    Encoding,
}

impl FailureKind {
    /// Stable label for the `read_errors_total` telemetry counter.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::DiscoveryIo => "discovery_io",
            FailureKind::NoDevicesFound => "no_devices_found",
            FailureKind::DeviceCountersUnavailable => "device_counters_unavailable",
            FailureKind::MetricFileMissing => "metric_file_missing",
            FailureKind::MetricRead => "metric_read",
            FailureKind::MetricParse => "metric_parse",
            FailureKind::NegativeCounter => "negative_counter",
            FailureKind::UnknownMetric => "unknown_metric",
            FailureKind::KindMismatch => "kind_mismatch",
            FailureKind::Prometheus => "prometheus",
            FailureKind::Encoding => "encoding",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl ExporterError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExporterError::DiscoveryIo { .. } => FailureKind::DiscoveryIo,
            ExporterError::NoDevicesFound { .. } => FailureKind::NoDevicesFound,
            ExporterError::DeviceCountersUnavailable { .. } => {
                FailureKind::DeviceCountersUnavailable
            }
            ExporterError::MetricFileMissing { .. } => FailureKind::MetricFileMissing,
            ExporterError::MetricRead { .. } => FailureKind::MetricRead,
            ExporterError::MetricParse { .. } => FailureKind::MetricParse,
            ExporterError::NegativeCounter { .. } => FailureKind::NegativeCounter,
            ExporterError::UnknownMetric(_) => FailureKind::UnknownMetric,
            ExporterError::KindMismatch { .. } => FailureKind::KindMismatch,
            ExporterError::Prometheus(_) => FailureKind::Prometheus,
            ExporterError::Encoding(_) => FailureKind::Encoding,
        }
    }

    /// Whether the process must stop because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExporterError::DiscoveryIo { .. } | ExporterError::NoDevicesFound { .. }
        )
    }
}
