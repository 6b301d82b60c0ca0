//! Startup requirement validation for herakles-nic-exporter.
//!
//! This module checks that the exporter can see the device tree before the
//! server starts. Only an unreadable device root is an error.

use nix::unistd::geteuid;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(device_root: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    check_device_root_access(device_root)?;

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - some hw_counters files may not be readable");
        warn!("   Recommendation: Run as root or grant read access to /sys/class/infiniband");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

/// Check that the device root exists and can be listed
fn check_device_root_access(device_root: &Path) -> Result<(), ValidationError> {
    match fs::read_dir(device_root) {
        Ok(_) => {
            info!("✅ Device root readable: {}", device_root.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            error!("❌ {} not found", device_root.display());
            error!("   Is the RDMA driver loaded? Try: modprobe ionic_rdma");
            Err(ValidationError::DeviceRootMissing(
                device_root.display().to_string(),
            ))
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            error!("❌ Cannot read {} - insufficient permissions", device_root.display());
            Err(ValidationError::InsufficientPermissions(e.to_string()))
        }
        Err(e) => {
            warn!("⚠️  Could not test {} access: {}", device_root.display(), e);
            Ok(()) // Continue but warn
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Device root not found: {0}")]
    DeviceRootMissing(String),
}
