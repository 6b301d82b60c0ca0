//! Health statistics and monitoring for the exporter.
//!
//! This module provides types and functionality for tracking exporter health,
//! including update cycle performance, read failures and HTTP request metrics.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

use crate::error::FailureKind;
use crate::updater::CycleReport;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(last, avg, max, min, count)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Thread-safe circular buffer for tracking HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(256)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            // Keep only last 10 minutes of timestamps to avoid unbounded growth
            if let Some(cutoff) = now.checked_sub(Duration::from_secs(600)) {
                while guard.front().is_some_and(|&t| t < cutoff) {
                    guard.pop_front();
                }
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            match Instant::now().checked_sub(Duration::from_secs(60)) {
                Some(cutoff) => guard.iter().filter(|&&t| t >= cutoff).count() as u64,
                None => guard.len() as u64,
            }
        } else {
            0
        }
    }
}

/// Exporter health statistics.
pub struct HealthStats {
    // Cycle performance
    pub cycle_duration_seconds: Stat,
    pub devices_read: Stat,
    pub values_applied: Stat,
    pub total_cycles: AtomicU64,
    pub cycle_success_count: AtomicU64,
    pub cycle_failure_count: AtomicU64,
    pub skipped_cycles: AtomicU64,

    // Error tracking
    pub device_unavailable_count: AtomicU64,
    pub missing_file_count: AtomicU64,
    pub read_error_count: AtomicU64,
    pub parse_error_count: AtomicU64,

    // HTTP server stats
    pub http_request_timestamps: RequestTimestamps,
    pub metrics_endpoint_calls: AtomicU64,
    pub request_duration_ms: Stat,
    pub exported_series: Stat,

    // Timing
    pub start_time: Instant,
    pub last_cycle_time: StdRwLock<Option<DateTime<Utc>>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            cycle_duration_seconds: Stat::default(),
            devices_read: Stat::default(),
            values_applied: Stat::default(),
            total_cycles: AtomicU64::new(0),
            cycle_success_count: AtomicU64::new(0),
            cycle_failure_count: AtomicU64::new(0),
            skipped_cycles: AtomicU64::new(0),
            device_unavailable_count: AtomicU64::new(0),
            missing_file_count: AtomicU64::new(0),
            read_error_count: AtomicU64::new(0),
            parse_error_count: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            metrics_endpoint_calls: AtomicU64::new(0),
            request_duration_ms: Stat::default(),
            exported_series: Stat::default(),
            start_time: Instant::now(),
            last_cycle_time: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_cycle(&self, report: &CycleReport) {
        if report.skipped {
            self.skipped_cycles.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.cycle_duration_seconds
            .add_sample(report.duration_seconds);
        self.devices_read.add_sample(report.devices_read as f64);
        self.values_applied
            .add_sample(report.observations_applied as f64);
        self.total_cycles.fetch_add(1, Ordering::Relaxed);

        if report.is_success() {
            self.cycle_success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cycle_failure_count.fetch_add(1, Ordering::Relaxed);
        }

        self.device_unavailable_count
            .fetch_add(report.devices_unavailable as u64, Ordering::Relaxed);
        self.missing_file_count
            .fetch_add(report.missing_files as u64, Ordering::Relaxed);
        for err in &report.errors {
            match err.kind {
                FailureKind::MetricParse | FailureKind::NegativeCounter => {
                    self.parse_error_count.fetch_add(1, Ordering::Relaxed);
                }
                FailureKind::MetricRead => {
                    self.read_error_count.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            }
        }

        if let Ok(mut guard) = self.last_cycle_time.write() {
            *guard = Some(Utc::now());
        }
    }

    /// Records a cycle whose worker task died before producing a report.
    pub fn record_cycle_crash(&self) {
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
        self.cycle_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn record_metrics_endpoint_call(&self) {
        self.metrics_endpoint_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_duration(&self, duration_ms: f64) {
        self.request_duration_ms.add_sample(duration_ms);
    }

    pub fn record_exported_series(&self, count: u64) {
        self.exported_series.add_sample(count as f64);
    }

    /// True once at least one cycle ran to completion.
    pub fn has_completed_cycle(&self) -> bool {
        self.cycle_success_count.load(Ordering::Relaxed)
            + self.cycle_failure_count.load(Ordering::Relaxed)
            > 0
    }

    pub fn get_cycle_success_rate(&self) -> f64 {
        let success = self.cycle_success_count.load(Ordering::Relaxed);
        let failure = self.cycle_failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_cycle_time_str(&self) -> String {
        match self.last_cycle_time.read() {
            Ok(guard) => guard
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            Err(_) => "N/A".to_string(),
        }
    }

    pub fn render_table(&self) -> String {
        let (cd_cur, cd_avg, cd_max, cd_min, _) = self.cycle_duration_seconds.snapshot();
        let (dr_cur, dr_avg, dr_max, dr_min, _) = self.devices_read.snapshot();
        let (va_cur, va_avg, va_max, va_min, _) = self.values_applied.snapshot();
        let (rd_cur, rd_avg, rd_max, rd_min, _) = self.request_duration_ms.snapshot();
        let (es_cur, es_avg, es_max, es_min, _) = self.exported_series.snapshot();

        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - EXPORTER INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        let row = |out: &mut String, name: &str, values: [String; 4]| {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                values[0],
                values[1],
                values[2],
                values[3],
                left = left_col,
                col = col_w
            )
            .ok();
        };

        writeln!(out).ok();
        writeln!(out, "UPDATE CYCLES").ok();
        writeln!(out, "-------------").ok();
        row(
            &mut out,
            "cycle_duration (s)",
            [
                format!("{:.3}", cd_cur),
                format!("{:.3}", cd_avg),
                format!("{:.3}", cd_max),
                format!("{:.3}", cd_min),
            ],
        );
        row(
            &mut out,
            "devices_read",
            [
                format!("{:.0}", dr_cur),
                format!("{:.1}", dr_avg),
                format!("{:.0}", dr_max),
                format!("{:.0}", dr_min),
            ],
        );
        row(
            &mut out,
            "values_applied",
            [
                format!("{:.0}", va_cur),
                format!("{:.1}", va_avg),
                format!("{:.0}", va_max),
                format!("{:.0}", va_min),
            ],
        );

        writeln!(out).ok();
        writeln!(out, "HTTP SERVER").ok();
        writeln!(out, "-----------").ok();
        row(
            &mut out,
            "request_duration (ms)",
            [
                format!("{:.2}", rd_cur),
                format!("{:.2}", rd_avg),
                format!("{:.2}", rd_max),
                format!("{:.2}", rd_min),
            ],
        );
        row(
            &mut out,
            "exported_series",
            [
                format!("{:.0}", es_cur),
                format!("{:.1}", es_avg),
                format!("{:.0}", es_max),
                format!("{:.0}", es_min),
            ],
        );

        writeln!(out).ok();
        writeln!(out, "COUNTERS").ok();
        writeln!(out, "--------").ok();
        let counters = [
            ("total_cycles", self.total_cycles.load(Ordering::Relaxed)),
            ("skipped_cycles", self.skipped_cycles.load(Ordering::Relaxed)),
            (
                "devices_unavailable",
                self.device_unavailable_count.load(Ordering::Relaxed),
            ),
            (
                "missing_files",
                self.missing_file_count.load(Ordering::Relaxed),
            ),
            ("read_errors", self.read_error_count.load(Ordering::Relaxed)),
            ("parse_errors", self.parse_error_count.load(Ordering::Relaxed)),
            (
                "metrics_requests",
                self.metrics_endpoint_calls.load(Ordering::Relaxed),
            ),
            (
                "http_requests_last_min",
                self.http_request_timestamps.count_last_minute(),
            ),
        ];
        for (name, value) in counters {
            writeln!(out, "{:left$} | {:>col$}", name, value, left = left_col, col = col_w).ok();
        }

        writeln!(out).ok();
        writeln!(
            out,
            "cycle_success_rate: {:.1}%",
            self.get_cycle_success_rate()
        )
        .ok();
        writeln!(out, "last_cycle: {}", self.get_last_cycle_time_str()).ok();

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::CycleError;

    #[test]
    fn test_running_stat() {
        let mut stat = RunningStat::default();
        stat.add(2.0);
        stat.add(4.0);
        assert_eq!(stat.avg(), 3.0);
        assert_eq!(stat.min, 2.0);
        assert_eq!(stat.max, 4.0);
        assert_eq!(stat.last, 4.0);
    }

    #[test]
    fn test_record_cycle_counts_errors() {
        let stats = HealthStats::new();
        assert!(!stats.has_completed_cycle());

        let report = CycleReport {
            devices_total: 2,
            devices_read: 1,
            devices_failed: 1,
            missing_files: 3,
            errors: vec![
                CycleError {
                    device: "ionic_1".into(),
                    kind: FailureKind::MetricParse,
                    message: "bad".into(),
                },
                CycleError {
                    device: "ionic_2".into(),
                    kind: FailureKind::NegativeCounter,
                    message: "negative".into(),
                },
                CycleError {
                    device: "ionic_3".into(),
                    kind: FailureKind::MetricRead,
                    message: "Is a directory".into(),
                },
                CycleError {
                    device: "ionic_4".into(),
                    kind: FailureKind::DeviceCountersUnavailable,
                    message: "gone".into(),
                },
            ],
            ..Default::default()
        };
        stats.record_cycle(&report);

        assert!(stats.has_completed_cycle());
        assert_eq!(stats.cycle_failure_count.load(Ordering::Relaxed), 1);
        assert_eq!(stats.parse_error_count.load(Ordering::Relaxed), 2);
        assert_eq!(stats.read_error_count.load(Ordering::Relaxed), 1);
        assert_eq!(stats.missing_file_count.load(Ordering::Relaxed), 3);
        assert_eq!(stats.get_cycle_success_rate(), 0.0);
        assert_ne!(stats.get_last_cycle_time_str(), "N/A");
    }

    #[test]
    fn test_skipped_cycle_is_not_completed() {
        let stats = HealthStats::new();
        stats.record_cycle(&CycleReport {
            skipped: true,
            ..Default::default()
        });
        assert!(!stats.has_completed_cycle());
        assert_eq!(stats.skipped_cycles.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_render_table_sections() {
        let stats = HealthStats::new();
        stats.record_http_request();
        let table = stats.render_table();
        assert!(table.contains("UPDATE CYCLES"));
        assert!(table.contains("HTTP SERVER"));
        assert!(table.contains("http_requests_last_min"));
        assert!(table.contains("last_cycle: N/A"));
    }
}
