//! Device discovery under the infiniband class directory.
//!
//! Discovery runs once before the scheduler starts. Devices that disappear
//! later stay in the set and simply fail to read on every cycle.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ExporterError;

/// Default root scanned for devices.
pub const DEFAULT_DEVICE_ROOT: &str = "/sys/class/infiniband";

/// Default device name pattern (AMD Pensando ionic RDMA devices).
pub const DEFAULT_DEVICE_PATTERN: &str = "ionic_*";

/// Default port whose counters are exported.
pub const DEFAULT_PORT_NUMBER: u32 = 1;

/// A discovered device and the directory holding its counter files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Label value for the `nic` label, e.g. `ionic_0`.
    pub name: String,
    /// Path as found under the device root (usually a symlink in sysfs).
    pub path: PathBuf,
    /// `<path>/ports/<n>/hw_counters`.
    pub counters_path: PathBuf,
}

impl Device {
    pub fn new(path: impl Into<PathBuf>, port_number: u32) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_string_lossy().to_string();
        let counters_path = counters_dir(&path, port_number);
        Some(Self {
            name,
            path,
            counters_path,
        })
    }
}

/// Returns the counter directory of a device for the given port.
pub fn counters_dir(device_path: &Path, port_number: u32) -> PathBuf {
    device_path
        .join("ports")
        .join(port_number.to_string())
        .join("hw_counters")
}

/// Shell-style name pattern (`*`, `?` and `[...]` classes).
#[derive(Debug, Clone)]
pub struct DevicePattern {
    pattern: glob::Pattern,
}

impl DevicePattern {
    pub fn new(pattern: &str) -> Result<Self, glob::PatternError> {
        Ok(Self {
            pattern: glob::Pattern::new(pattern)?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.matches(name)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Scans `root` for entries whose name matches `pattern`.
///
/// Results are sorted by name. An unreadable root is a `DiscoveryIo` error,
/// a readable root without matches is `NoDevicesFound`.
pub fn discover_devices(
    root: &Path,
    pattern: &DevicePattern,
    port_number: u32,
) -> Result<Vec<Device>, ExporterError> {
    let entries = fs::read_dir(root).map_err(|source| ExporterError::DiscoveryIo {
        root: root.to_path_buf(),
        source,
    })?;

    let mut devices = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ExporterError::DiscoveryIo {
            root: root.to_path_buf(),
            source,
        })?;

        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if !pattern.matches(&name) {
            debug!("Ignoring {} (does not match {})", name, pattern.as_str());
            continue;
        }

        if let Some(device) = Device::new(entry.path(), port_number) {
            devices.push(device);
        }
    }

    if devices.is_empty() {
        return Err(ExporterError::NoDevicesFound {
            root: root.to_path_buf(),
            pattern: pattern.as_str().to_string(),
        });
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));

    info!(
        "Discovered {} device(s): {}",
        devices.len(),
        devices
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pattern_matches_prefix_glob() {
        let pattern = DevicePattern::new("ionic_*").unwrap();
        assert!(pattern.matches("ionic_0"));
        assert!(pattern.matches("ionic_"));
        assert!(!pattern.matches("mlx5_0"));
        assert!(!pattern.matches("xionic_0"));
    }

    #[test]
    fn test_pattern_dot_is_literal() {
        let pattern = DevicePattern::new("dev.?").unwrap();
        assert!(pattern.matches("dev.1"));
        assert!(!pattern.matches("devx1"));
    }

    #[test]
    fn test_pattern_character_class() {
        let pattern = DevicePattern::new("ionic_[01]").unwrap();
        assert!(pattern.matches("ionic_0"));
        assert!(pattern.matches("ionic_1"));
        assert!(!pattern.matches("ionic_2"));
        assert!(!pattern.matches("ionic_10"));
    }

    #[test]
    fn test_pattern_rejects_unclosed_class() {
        assert!(DevicePattern::new("ionic_[0").is_err());
    }

    #[test]
    fn test_discover_with_character_class() {
        let dir = TempDir::new().unwrap();
        for name in ["ionic_0", "ionic_1", "ionic_2"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }

        let pattern = DevicePattern::new("ionic_[02]").unwrap();
        let devices = discover_devices(dir.path(), &pattern, 1).unwrap();

        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["ionic_0", "ionic_2"]);
    }

    #[test]
    fn test_discover_sorted_matches() {
        let dir = TempDir::new().unwrap();
        for name in ["ionic_1", "mlx5_0", "ionic_0"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }

        let pattern = DevicePattern::new(DEFAULT_DEVICE_PATTERN).unwrap();
        let devices = discover_devices(dir.path(), &pattern, 1).unwrap();

        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["ionic_0", "ionic_1"]);
        assert_eq!(
            devices[0].counters_path,
            dir.path().join("ionic_0/ports/1/hw_counters")
        );
    }

    #[test]
    fn test_discover_no_matches() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("mlx5_0")).unwrap();

        let pattern = DevicePattern::new(DEFAULT_DEVICE_PATTERN).unwrap();
        let err = discover_devices(dir.path(), &pattern, 1).unwrap_err();
        assert!(matches!(err, ExporterError::NoDevicesFound { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = TempDir::new().unwrap();
        let pattern = DevicePattern::new(DEFAULT_DEVICE_PATTERN).unwrap();
        let err = discover_devices(&dir.path().join("missing"), &pattern, 1).unwrap_err();
        assert!(matches!(err, ExporterError::DiscoveryIo { .. }));
    }

    #[test]
    fn test_counters_dir_uses_port_number() {
        let dir = counters_dir(Path::new("/sys/class/infiniband/ionic_0"), 2);
        assert_eq!(
            dir,
            PathBuf::from("/sys/class/infiniband/ionic_0/ports/2/hw_counters")
        );
    }
}
