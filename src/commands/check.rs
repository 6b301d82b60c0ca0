//! Check command implementation.
//!
//! Runs discovery and reports which counter files each device exposes.

use herakles_nic_exporter::collectors::read_device_counters;
use herakles_nic_exporter::config::{validate_effective_config, Config};
use herakles_nic_exporter::discovery::{discover_devices, DevicePattern};
use herakles_nic_exporter::schema::METRIC_DEFINITIONS;

/// Validates the device tree and configuration.
pub fn command_check(verbose: bool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Herakles NIC Exporter - System Check");
    println!("=======================================");

    let mut all_ok = true;

    let root = config.device_root();
    let pattern = DevicePattern::new(config.device_pattern())?;

    println!(
        "\n📁 Scanning {} for '{}'...",
        root.display(),
        pattern.as_str()
    );

    match discover_devices(&root, &pattern, config.port_number()) {
        Ok(devices) => {
            println!("   ✅ Found {} device(s)", devices.len());

            for device in &devices {
                let reading = read_device_counters(device, METRIC_DEFINITIONS);
                let present = reading.observations.len();

                match &reading.outcome {
                    Ok(()) => println!(
                        "   ✅ {}: {}/{} counter files present",
                        device.name,
                        present,
                        METRIC_DEFINITIONS.len()
                    ),
                    Err(e) => {
                        println!("   ❌ {}: {}", device.name, e);
                        all_ok = false;
                    }
                }

                if verbose {
                    for name in &reading.missing {
                        println!("      ├─ missing: {}", name);
                    }
                }
            }
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - see above for details");
        std::process::exit(1);
    }
}
