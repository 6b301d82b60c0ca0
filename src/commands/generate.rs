//! Generate testdata command implementation.
//!
//! Writes a synthetic `<root>/ionic_N/ports/1/hw_counters/` tree so the
//! exporter can be pointed at it with `--device-root`.

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use herakles_nic_exporter::discovery::{counters_dir, DEFAULT_PORT_NUMBER};
use herakles_nic_exporter::schema::{MetricDefinition, MetricKind, METRIC_DEFINITIONS};

/// Name prefix of generated devices.
const DEVICE_PREFIX: &str = "ionic_";

// Value ranges for generated counter files
const MAX_LIFESPAN: u64 = 1_000;
const MAX_COUNTER_VALUE: u64 = 1_000_000;

/// Summary written next to the generated devices.
#[derive(Debug, Serialize)]
struct TestdataManifest {
    version: String,
    generated_at: String,
    devices: Vec<GeneratedDevice>,
}

#[derive(Debug, Serialize)]
struct GeneratedDevice {
    name: String,
    files: usize,
    missing: Vec<&'static str>,
}

/// Generates a synthetic device tree for testing purposes.
pub fn command_generate_testdata(
    output: PathBuf,
    devices: usize,
    missing_ratio: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&missing_ratio) {
        return Err(format!("missing_ratio must be within 0.0-1.0, got {missing_ratio}").into());
    }

    debug!(
        "Generating test data: devices={}, missing_ratio={}, output={}",
        devices,
        missing_ratio,
        output.display()
    );

    let mut rng = rand::thread_rng();
    let mut generated = Vec::with_capacity(devices);

    for index in 0..devices {
        let name = format!("{DEVICE_PREFIX}{index}");
        let device = write_device(&output, &name, missing_ratio, &mut rng)?;
        generated.push(device);
    }

    let manifest = TestdataManifest {
        version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        devices: generated,
    };
    fs::write(
        output.join("testdata.json"),
        serde_json::to_string_pretty(&manifest)?,
    )?;

    println!(
        "✅ Generated test data: {} device(s) in {}",
        manifest.devices.len(),
        output.display()
    );
    println!(
        "   Run: herakles-nic-exporter --device-root {}",
        output.display()
    );

    Ok(())
}

fn write_device(
    root: &Path,
    name: &str,
    missing_ratio: f64,
    rng: &mut impl Rng,
) -> Result<GeneratedDevice, std::io::Error> {
    let dir = counters_dir(&root.join(name), DEFAULT_PORT_NUMBER);
    fs::create_dir_all(&dir)?;

    let mut files = 0;
    let mut missing = Vec::new();

    for def in METRIC_DEFINITIONS {
        if missing_ratio > 0.0 && rng.gen_bool(missing_ratio) {
            missing.push(def.name);
            continue;
        }
        fs::write(dir.join(def.name), format!("{}\n", random_value(def, rng)))?;
        files += 1;
    }

    debug!("Generated {} with {} counter files", name, files);

    Ok(GeneratedDevice {
        name: name.to_string(),
        files,
        missing,
    })
}

fn random_value(def: &MetricDefinition, rng: &mut impl Rng) -> u64 {
    match def.kind {
        MetricKind::Gauge => rng.gen_range(0..=MAX_LIFESPAN),
        MetricKind::Counter => rng.gen_range(0..=MAX_COUNTER_VALUE),
    }
}
