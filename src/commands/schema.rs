//! Schema command implementation.
//!
//! Lists the exported hardware counter metrics.

use herakles_nic_exporter::schema::{MetricKind, METRIC_DEFINITIONS};

/// Lists the metric schema, optionally filtered by kind.
pub fn command_schema(kind: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("gauge") => Some(MetricKind::Gauge),
        Some("counter") => Some(MetricKind::Counter),
        Some(other) => return Err(format!("unknown metric kind '{other}' (gauge|counter)").into()),
    };

    println!("📋 Exported hardware counters");
    println!("=============================");

    let mut shown = 0;
    for def in METRIC_DEFINITIONS
        .iter()
        .filter(|d| filter.map_or(true, |k| d.kind == k))
    {
        println!("{:<28} {:<8} {}", def.name, def.kind, def.description);
        shown += 1;
    }

    println!("\n{} metric(s), label: nic", shown);
    Ok(())
}
