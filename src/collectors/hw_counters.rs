//! Hardware counter reader.
//!
//! Reads `<device>/ports/<n>/hw_counters/<metric>` for every schema entry.
//! Missing files are skipped; a file that cannot be read or parsed stops the
//! remaining reads of that device for the current cycle.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, trace};

use crate::discovery::Device;
use crate::error::ExporterError;
use crate::schema::{MetricDefinition, MetricKind};

/// One parsed counter value.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub definition: &'static MetricDefinition,
    pub value: f64,
}

/// Result of reading one device.
///
/// `observations` holds everything read before `outcome` turned into an
/// error, so partial progress is still applied.
#[derive(Debug)]
pub struct DeviceReading {
    pub device: String,
    pub observations: Vec<Observation>,
    /// Metric names whose counter file did not exist.
    pub missing: Vec<&'static str>,
    pub outcome: Result<(), ExporterError>,
}

impl DeviceReading {
    fn new(device: &Device) -> Self {
        Self {
            device: device.name.clone(),
            observations: Vec::new(),
            missing: Vec::new(),
            outcome: Ok(()),
        }
    }
}

/// Parses the text of a counter file: surrounding whitespace is ignored and
/// the rest must be a finite decimal number.
pub fn parse_counter_value(raw: &str, path: &Path) -> Result<f64, ExporterError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ExporterError::MetricParse {
            path: path.to_path_buf(),
            raw: trimmed.to_string(),
        }),
    }
}

/// Reads one counter file. `Ok(None)` means the file does not exist.
pub fn read_counter_file(path: &Path) -> Result<Option<f64>, ExporterError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ExporterError::MetricRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_counter_value(&content, path).map(Some)
}

/// Reads every definition for `device`, in schema order.
pub fn read_device_counters(
    device: &Device,
    definitions: &'static [MetricDefinition],
) -> DeviceReading {
    let mut reading = DeviceReading::new(device);

    if !device.counters_path.is_dir() {
        reading.outcome = Err(ExporterError::DeviceCountersUnavailable {
            device: device.name.clone(),
            path: device.counters_path.clone(),
        });
        return reading;
    }

    for def in definitions {
        let path = device.counters_path.join(def.name);

        let value = match read_counter_file(&path) {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(
                    "Metric file {} missing for device {}, skipping",
                    def.name, device.name
                );
                reading.missing.push(def.name);
                continue;
            }
            Err(e) => {
                reading.outcome = Err(e);
                return reading;
            }
        };

        if def.kind == MetricKind::Counter && value < 0.0 {
            reading.outcome = Err(ExporterError::NegativeCounter {
                device: device.name.clone(),
                metric: def.name.to_string(),
                value,
            });
            return reading;
        }

        trace!("{} {} = {}", device.name, def.name, value);
        reading.observations.push(Observation {
            definition: def,
            value,
        });
    }

    reading
}
