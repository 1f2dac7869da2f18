//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guardian_tx_attempts_total` (counter): submission attempts by outcome
//! - `guardian_nonce_refresh_total` (counter): nonce reads from the node by reason
//! - `guardian_uploads_total` (counter): storage uploads by service, outcome
//! - `guardian_rpc_failover_total` (counter): provider failovers by method
//! - `guardian_rpc_health` (gauge): 1=healthy, 0=unhealthy
//! - `guardian_registrations_total` (counter): repositories registered
//! - `guardian_dmca_filed_total` (counter): DMCA notices filed on chain
//! - `guardian_bounty_claims_total` (counter): bounty claims recorded

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_tx_attempt(outcome: &'static str) {
    metrics::counter!("guardian_tx_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_nonce_refresh(reason: &'static str) {
    metrics::counter!("guardian_nonce_refresh_total", "reason" => reason).increment(1);
}

pub fn record_upload(service: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("guardian_uploads_total", "service" => service, "outcome" => outcome)
        .increment(1);
}

pub fn record_rpc_failover(method: &'static str) {
    metrics::counter!("guardian_rpc_failover_total", "method" => method).increment(1);
}

pub fn record_rpc_health(healthy: bool) {
    metrics::gauge!("guardian_rpc_health").set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_registration() {
    metrics::counter!("guardian_registrations_total").increment(1);
}

pub fn record_dmca_filed() {
    metrics::counter!("guardian_dmca_filed_total").increment(1);
}

pub fn record_bounty_claim() {
    metrics::counter!("guardian_bounty_claims_total").increment(1);
}
