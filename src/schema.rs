//! Static schema of the hardware counters exported per device.
//!
//! Each entry names a file under `ports/<n>/hw_counters/` and decides whether
//! the value is republished as a gauge (last reading) or a counter (running
//! sum of readings). Nothing else in the crate special-cases metric names.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;

/// How a reading is folded into the exported series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Replaced by every successful reading.
    Gauge,
    /// Every successful reading is added to the running total.
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One exported metric. `name` doubles as the counter file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: MetricKind,
}

const fn gauge(name: &'static str, description: &'static str) -> MetricDefinition {
    MetricDefinition {
        name,
        description,
        kind: MetricKind::Gauge,
    }
}

const fn counter(name: &'static str, description: &'static str) -> MetricDefinition {
    MetricDefinition {
        name,
        description,
        kind: MetricKind::Counter,
    }
}

/// All metrics in exposition order.
pub static METRIC_DEFINITIONS: &[MetricDefinition] = &[
    gauge("lifespan", "NIC lifespan in seconds"),
    // ========== Requester RX errors ==========
    counter("req_rx_cqe_err", "Request RX CQE Errors"),
    counter("req_rx_cqe_flush", "Request RX CQE Flushes"),
    counter("req_rx_dup_response", "Duplicate RX responses"),
    counter("req_rx_impl_nak_seq_err", "Request RX NAK sequence errors"),
    counter("req_rx_inval_pkts", "Invalid RX packets"),
    counter("req_rx_oper_err", "Request RX operation errors"),
    counter("req_rx_pkt_seq_err", "Packet sequence errors"),
    counter("req_rx_rmt_acc_err", "Remote access errors"),
    counter("req_rx_rmt_req_err", "Remote request errors"),
    counter("req_rx_rnr_retry_err", "RNR retry errors"),
    // ========== Requester TX errors ==========
    counter("req_tx_loc_acc_err", "Local TX access errors"),
    counter("req_tx_loc_oper_err", "Local TX operation errors"),
    counter(
        "req_tx_loc_sgl_inv_err",
        "Local TX scatter-gather list invalid errors",
    ),
    counter("req_tx_mem_mgmt_err", "TX memory management errors"),
    counter("req_tx_retry_excd_err", "TX retries exceeded"),
    // ========== Responder RX errors ==========
    counter("resp_rx_cqe_err", "Response RX CQE Errors"),
    counter("resp_rx_cqe_flush", "Response RX CQE Flushes"),
    counter("resp_rx_dup_request", "Duplicate RX requests"),
    counter("resp_rx_inval_request", "Invalid RX requests"),
    counter("resp_rx_loc_len_err", "Local length errors"),
    counter("resp_rx_loc_oper_err", "Local operation errors"),
    counter("resp_rx_outof_atomic", "Out of atomic resources"),
    counter("resp_rx_outof_buf", "Out of buffer space"),
    // Spelling matches the file the driver exposes.
    counter("resp_rx_outouf_seq", "Out of sequence errors"),
    counter("resp_rx_s0_table_err", "Table errors in RX response"),
    // ========== Responder TX errors ==========
    counter(
        "resp_tx_loc_sgl_inv_err",
        "Local TX scatter-gather list invalid errors",
    ),
    counter("resp_tx_pkt_seq_err", "Response TX Packet Sequence Errors"),
    counter("resp_tx_rmt_acc_err", "Remote TX access errors"),
    counter("resp_tx_rmt_inval_req_err", "Remote TX invalid request errors"),
    counter("resp_tx_rmt_oper_err", "Remote TX operation errors"),
    counter("resp_tx_rnr_retry_err", "Remote TX RNR retry errors"),
    // ========== RDMA RX traffic ==========
    counter(
        "rx_rdma_cnp_pkts",
        "Received RDMA Congestion Notification Packets",
    ),
    counter("rx_rdma_ecn_pkts", "Received RDMA ECN Marked Packets"),
    counter("rx_rdma_mcast_bytes", "Received RDMA Multicast Bytes"),
    counter("rx_rdma_mcast_pkts", "Received RDMA Multicast Packets"),
    counter("rx_rdma_ucast_bytes", "Received RDMA Unicast Bytes"),
    counter("rx_rdma_ucast_pkts", "Received RDMA Unicast Packets"),
    // ========== RDMA TX traffic ==========
    counter(
        "tx_rdma_cnp_pkts",
        "Transmitted RDMA Congestion Notification Packets",
    ),
    counter("tx_rdma_mcast_bytes", "Transmitted RDMA Multicast Bytes"),
    counter("tx_rdma_mcast_pkts", "Transmitted RDMA Multicast Packets"),
    counter("tx_rdma_ucast_bytes", "Transmitted RDMA Unicast Bytes"),
    counter("tx_rdma_ucast_pkts", "Transmitted RDMA Unicast Packets"),
];

static BY_NAME: Lazy<HashMap<&'static str, &'static MetricDefinition>> =
    Lazy::new(|| METRIC_DEFINITIONS.iter().map(|d| (d.name, d)).collect());

/// Looks up a schema entry by metric name.
pub fn find(name: &str) -> Option<&'static MetricDefinition> {
    BY_NAME.get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = METRIC_DEFINITIONS.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), METRIC_DEFINITIONS.len());
    }

    #[test]
    fn test_lifespan_is_the_only_gauge() {
        let gauges: Vec<_> = METRIC_DEFINITIONS
            .iter()
            .filter(|d| d.kind == MetricKind::Gauge)
            .map(|d| d.name)
            .collect();
        assert_eq!(gauges, vec!["lifespan"]);
    }

    #[test]
    fn test_names_are_valid_prometheus_names() {
        let re = regex::Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").unwrap();
        for def in METRIC_DEFINITIONS {
            assert!(re.is_match(def.name), "invalid metric name {}", def.name);
            assert!(!def.description.is_empty());
        }
    }

    #[test]
    fn test_find() {
        let def = find("rx_rdma_ucast_pkts").expect("schema entry");
        assert_eq!(def.kind, MetricKind::Counter);
        assert!(find("does_not_exist").is_none());
    }
}
