// ABOUTME: Counters for scheduler activity
// ABOUTME: Thin wrappers over the metrics facade plus an optional Prometheus endpoint

use anyhow::{Context, Result};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const DISPATCHES: &str = "banter_dispatches_total";
pub const FALLBACKS: &str = "banter_generation_fallbacks_total";
pub const STIMULI: &str = "banter_stimuli_total";
pub const MESSAGES_SENT: &str = "banter_messages_sent_total";
pub const SEND_FAILURES: &str = "banter_send_failures_total";
pub const COMMANDS: &str = "banter_admin_commands_total";

pub fn record_dispatch(agent_id: &str) {
    counter!(DISPATCHES, "agent" => agent_id.to_string()).increment(1);
}

/// `kind` is "timeout" or "error"
pub fn record_fallback(agent_id: &str, kind: &'static str) {
    counter!(FALLBACKS, "agent" => agent_id.to_string(), "kind" => kind).increment(1);
}

/// `kind` is "roast" or "stall"
pub fn record_stimulus(kind: &'static str) {
    counter!(STIMULI, "kind" => kind).increment(1);
}

pub fn record_message_sent(agent_id: &str) {
    counter!(MESSAGES_SENT, "agent" => agent_id.to_string()).increment(1);
}

pub fn record_send_failure(agent_id: &str) {
    counter!(SEND_FAILURES, "agent" => agent_id.to_string()).increment(1);
}

pub fn record_command(name: &str) {
    counter!(COMMANDS, "command" => name.to_string()).increment(1);
}

/// Serve every counter at `http://{addr}/metrics`. Must run inside a tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    tracing::info!(%addr, "Prometheus metrics endpoint listening");
    Ok(())
}
