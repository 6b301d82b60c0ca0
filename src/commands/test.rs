//! Test command implementation.
//!
//! Runs update cycles against the configured device tree and prints the
//! resulting exposition.

use std::sync::Arc;

use herakles_nic_exporter::config::Config;
use herakles_nic_exporter::discovery::{discover_devices, DevicePattern};
use herakles_nic_exporter::registry::MetricRegistry;
use herakles_nic_exporter::schema::METRIC_DEFINITIONS;
use herakles_nic_exporter::updater::Updater;

/// Tests metrics collection.
pub fn command_test(
    iterations: usize,
    verbose: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🧪 Herakles NIC Exporter - Test Mode");
    println!("====================================");

    let pattern = DevicePattern::new(config.device_pattern())?;
    let devices = discover_devices(&config.device_root(), &pattern, config.port_number())?;
    println!("   📁 Found {} device(s)", devices.len());

    let registry = Arc::new(MetricRegistry::new(METRIC_DEFINITIONS)?);
    let updater = Updater::new(devices, registry.clone());
    let mut failed_cycles = 0;

    for iteration in 1..=iterations {
        println!("\n🔄 Iteration {}/{}:", iteration, iterations);

        let report = updater.run_cycle();
        println!(
            "   ⏱️  Cycle duration: {:.2}ms",
            report.duration_seconds * 1000.0
        );
        println!("   📊 Values applied: {}", report.observations_applied);
        println!("   ❌ Errors: {}", report.errors.len());

        if !report.is_success() {
            failed_cycles += 1;
        }

        if verbose {
            println!(
                "   ├─ devices read: {}, unavailable: {}, failed: {}",
                report.devices_read, report.devices_unavailable, report.devices_failed
            );
            println!("   ├─ missing files: {}", report.missing_files);
            for err in &report.errors {
                println!("   ├─ [{}] {}: {}", err.kind, err.device, err.message);
            }
        }
    }

    println!("\n📈 Exposition after {} cycle(s):\n", iterations);
    print!("{}", registry.encode()?);

    if failed_cycles == 0 {
        println!("\n✅ Test completed successfully");
    } else {
        println!("\n⚠️  Test completed with {} failed cycle(s)", failed_cycles);
    }
    Ok(())
}
