//! Collectors module for device metrics.
//!
//! This module contains the readers that turn files under a device's sysfs
//! tree into numeric observations.

pub mod hw_counters;

pub use hw_counters::{read_device_counters, DeviceReading, Observation};
