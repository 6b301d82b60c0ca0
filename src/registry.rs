//! Long-lived metric state built from the schema.
//!
//! Values live in prometheus `GaugeVec`/`CounterVec` series labelled by
//! device (`nic`). Each value is updated atomically, so a reader sees either
//! the previous or the new value of a series, never a torn one. A scrape may
//! mix values from the running cycle and the previous one across series.

use ahash::AHashMap as HashMap;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ExporterError;
use crate::schema::{MetricDefinition, MetricKind};

/// Label carrying the device name on every series.
pub const DEVICE_LABEL: &str = "nic";

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 64 * 1024;

#[derive(Clone)]
enum SeriesVec {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

impl SeriesVec {
    fn kind(&self) -> MetricKind {
        match self {
            SeriesVec::Gauge(_) => MetricKind::Gauge,
            SeriesVec::Counter(_) => MetricKind::Counter,
        }
    }

    fn value(&self, device: &str) -> Option<f64> {
        match self {
            SeriesVec::Gauge(vec) => vec
                .get_metric_with_label_values(&[device])
                .ok()
                .map(|g| g.get()),
            SeriesVec::Counter(vec) => vec
                .get_metric_with_label_values(&[device])
                .ok()
                .map(|c| c.get()),
        }
    }
}

/// One `(metric, device)` series as seen by a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: &'static str,
    pub device: String,
    pub kind: MetricKind,
    pub value: f64,
}

/// Point-in-time copy of every observed series, in schema order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub samples: Vec<Sample>,
}

impl Snapshot {
    pub fn get(&self, metric: &str, device: &str) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.metric == metric && s.device == device)
            .map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Schema-driven registry of per-device series.
pub struct MetricRegistry {
    registry: Registry,
    definitions: &'static [MetricDefinition],
    series: HashMap<&'static str, SeriesVec>,
    /// Device labels with at least one successful reading, per metric.
    observed: Mutex<HashMap<&'static str, BTreeSet<String>>>,
}

impl MetricRegistry {
    /// Creates a registry with its own prometheus `Registry`.
    pub fn new(definitions: &'static [MetricDefinition]) -> Result<Self, ExporterError> {
        Self::with_registry(Registry::new(), definitions)
    }

    /// Registers one device-labelled vector per definition on `registry`.
    pub fn with_registry(
        registry: Registry,
        definitions: &'static [MetricDefinition],
    ) -> Result<Self, ExporterError> {
        let mut series = HashMap::with_capacity(definitions.len());

        for def in definitions {
            let opts = Opts::new(def.name, def.description);
            let vec = match def.kind {
                MetricKind::Gauge => {
                    let gauge = GaugeVec::new(opts, &[DEVICE_LABEL])?;
                    registry.register(Box::new(gauge.clone()))?;
                    SeriesVec::Gauge(gauge)
                }
                MetricKind::Counter => {
                    let counter = CounterVec::new(opts, &[DEVICE_LABEL])?;
                    registry.register(Box::new(counter.clone()))?;
                    SeriesVec::Counter(counter)
                }
            };
            series.insert(def.name, vec);
        }

        Ok(Self {
            registry,
            definitions,
            series,
            observed: Mutex::new(HashMap::new()),
        })
    }

    pub fn definitions(&self) -> &'static [MetricDefinition] {
        self.definitions
    }

    /// Underlying prometheus registry, shared with exporter telemetry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn lookup(&self, name: &str, expected: MetricKind) -> Result<&SeriesVec, ExporterError> {
        let vec = self
            .series
            .get(name)
            .ok_or_else(|| ExporterError::UnknownMetric(name.to_string()))?;
        if vec.kind() != expected {
            return Err(ExporterError::KindMismatch {
                metric: name.to_string(),
                expected: expected.as_str(),
                actual: vec.kind().as_str(),
            });
        }
        Ok(vec)
    }

    fn mark_observed(&self, name: &str, device: &str) {
        let Some((&key, _)) = self.series.get_key_value(name) else {
            return;
        };
        self.observed_index()
            .entry(key)
            .or_default()
            .insert(device.to_string());
    }

    /// Recovers from poisoning; the index is insert-only.
    fn observed_index(&self) -> MutexGuard<'_, HashMap<&'static str, BTreeSet<String>>> {
        self.observed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrites the gauge for `(name, device)`.
    pub fn apply_gauge(&self, name: &str, device: &str, value: f64) -> Result<(), ExporterError> {
        if let SeriesVec::Gauge(vec) = self.lookup(name, MetricKind::Gauge)? {
            vec.with_label_values(&[device]).set(value);
            self.mark_observed(name, device);
        }
        Ok(())
    }

    /// Adds `observed` to the running total for `(name, device)`.
    ///
    /// The reading is accumulated as-is; no delta against the previous
    /// reading is computed.
    pub fn apply_counter_delta(
        &self,
        name: &str,
        device: &str,
        observed: f64,
    ) -> Result<(), ExporterError> {
        if let SeriesVec::Counter(vec) = self.lookup(name, MetricKind::Counter)? {
            // prometheus counters panic on negative increments
            if observed < 0.0 || observed.is_nan() {
                return Err(ExporterError::NegativeCounter {
                    device: device.to_string(),
                    metric: name.to_string(),
                    value: observed,
                });
            }
            vec.with_label_values(&[device]).inc_by(observed);
            self.mark_observed(name, device);
        }
        Ok(())
    }

    /// Applies a reading with the rule of its definition's kind.
    pub fn apply(
        &self,
        definition: &MetricDefinition,
        device: &str,
        value: f64,
    ) -> Result<(), ExporterError> {
        match definition.kind {
            MetricKind::Gauge => self.apply_gauge(definition.name, device, value),
            MetricKind::Counter => self.apply_counter_delta(definition.name, device, value),
        }
    }

    /// Copies the current value of every observed series.
    pub fn snapshot(&self) -> Snapshot {
        let observed = self.observed_index().clone();

        let mut samples = Vec::new();
        for def in self.definitions {
            let (Some(devices), Some(vec)) = (observed.get(def.name), self.series.get(def.name))
            else {
                continue;
            };
            for device in devices {
                if let Some(value) = vec.value(device) {
                    samples.push(Sample {
                        metric: def.name,
                        device: device.clone(),
                        kind: def.kind,
                        value,
                    });
                }
            }
        }

        Snapshot { samples }
    }

    /// Number of observed `(metric, device)` series.
    pub fn series_count(&self) -> usize {
        self.observed_index().values().map(BTreeSet::len).sum()
    }

    /// Renders the whole registry in the Prometheus text format.
    pub fn encode(&self) -> Result<String, ExporterError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::with_capacity(BUFFER_CAP);
        encoder.encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ExporterError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::METRIC_DEFINITIONS;

    static TEST_SCHEMA: &[MetricDefinition] = &[
        MetricDefinition {
            name: "lifespan",
            description: "NIC lifespan in seconds",
            kind: MetricKind::Gauge,
        },
        MetricDefinition {
            name: "rx_rdma_ucast_pkts",
            description: "Received RDMA Unicast Packets",
            kind: MetricKind::Counter,
        },
    ];

    #[test]
    fn test_poisoned_index_still_records_series() {
        let reg = MetricRegistry::new(TEST_SCHEMA).unwrap();
        reg.apply_gauge("lifespan", "ionic_0", 1.0).unwrap();

        std::thread::scope(|s| {
            let result = s
                .spawn(|| {
                    let _guard = reg.observed.lock().unwrap();
                    panic!("writer died holding the index");
                })
                .join();
            assert!(result.is_err());
        });
        assert!(reg.observed.is_poisoned());

        reg.apply_counter_delta("rx_rdma_ucast_pkts", "ionic_1", 5.0)
            .unwrap();

        let snapshot = reg.snapshot();
        assert_eq!(snapshot.get("lifespan", "ionic_0"), Some(1.0));
        assert_eq!(snapshot.get("rx_rdma_ucast_pkts", "ionic_1"), Some(5.0));
        assert_eq!(reg.series_count(), 2);
    }

    #[test]
    fn test_gauge_overwrites() {
        let reg = MetricRegistry::new(TEST_SCHEMA).unwrap();
        reg.apply_gauge("lifespan", "ionic_0", 10.0).unwrap();
        reg.apply_gauge("lifespan", "ionic_0", 42.0).unwrap();
        assert_eq!(reg.snapshot().get("lifespan", "ionic_0"), Some(42.0));
    }

    #[test]
    fn test_counter_accumulates_observations() {
        let reg = MetricRegistry::new(TEST_SCHEMA).unwrap();
        reg.apply_counter_delta("rx_rdma_ucast_pkts", "ionic_0", 10.0)
            .unwrap();
        reg.apply_counter_delta("rx_rdma_ucast_pkts", "ionic_0", 15.0)
            .unwrap();
        assert_eq!(
            reg.snapshot().get("rx_rdma_ucast_pkts", "ionic_0"),
            Some(25.0)
        );
    }

    #[test]
    fn test_devices_are_isolated() {
        let reg = MetricRegistry::new(TEST_SCHEMA).unwrap();
        reg.apply_gauge("lifespan", "ionic_0", 1.0).unwrap();
        reg.apply_gauge("lifespan", "ionic_1", 2.0).unwrap();

        let snap = reg.snapshot();
        assert_eq!(snap.get("lifespan", "ionic_0"), Some(1.0));
        assert_eq!(snap.get("lifespan", "ionic_1"), Some(2.0));
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn test_series_absent_until_first_reading() {
        let reg = MetricRegistry::new(TEST_SCHEMA).unwrap();
        assert!(reg.snapshot().is_empty());
        assert_eq!(reg.series_count(), 0);
        assert!(!reg.encode().unwrap().contains("nic=\"ionic_0\""));
    }

    #[test]
    fn test_unknown_metric_and_kind_mismatch() {
        let reg = MetricRegistry::new(TEST_SCHEMA).unwrap();
        assert!(matches!(
            reg.apply_gauge("nope", "ionic_0", 1.0),
            Err(ExporterError::UnknownMetric(_))
        ));
        assert!(matches!(
            reg.apply_gauge("rx_rdma_ucast_pkts", "ionic_0", 1.0),
            Err(ExporterError::KindMismatch { .. })
        ));
        assert!(matches!(
            reg.apply_counter_delta("lifespan", "ionic_0", 1.0),
            Err(ExporterError::KindMismatch { .. })
        ));
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn test_negative_counter_rejected() {
        let reg = MetricRegistry::new(TEST_SCHEMA).unwrap();
        reg.apply_counter_delta("rx_rdma_ucast_pkts", "ionic_0", 5.0)
            .unwrap();
        let err = reg
            .apply_counter_delta("rx_rdma_ucast_pkts", "ionic_0", -1.0)
            .unwrap_err();
        assert!(matches!(err, ExporterError::NegativeCounter { .. }));
        assert_eq!(
            reg.snapshot().get("rx_rdma_ucast_pkts", "ionic_0"),
            Some(5.0)
        );
    }

    #[test]
    fn test_encode_text_format() {
        let reg = MetricRegistry::new(TEST_SCHEMA).unwrap();
        reg.apply_gauge("lifespan", "ionic_0", 42.0).unwrap();
        reg.apply_counter_delta("rx_rdma_ucast_pkts", "ionic_0", 25.0)
            .unwrap();

        let text = reg.encode().unwrap();
        assert!(text.contains("# TYPE lifespan gauge"));
        assert!(text.contains("# TYPE rx_rdma_ucast_pkts counter"));
        assert!(text.contains("lifespan{nic=\"ionic_0\"} 42"));
        assert!(text.contains("rx_rdma_ucast_pkts{nic=\"ionic_0\"} 25"));
    }

    #[test]
    fn test_full_schema_registers() {
        let reg = MetricRegistry::new(METRIC_DEFINITIONS).unwrap();
        assert_eq!(reg.definitions().len(), METRIC_DEFINITIONS.len());
    }
}
