//! Prometheus metrics for monitoring bracket server health and activity.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener,
//! scrape them at `http://<METRICS_BIND>/metrics`.
//!
//! # Metrics Categories
//!
//! - **Bracket Metrics**: Brackets seeded, matches resolved, tournaments completed
//! - **WebSocket Metrics**: Active connections, total connections
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ko_server::metrics;
//! use std::net::SocketAddr;
//!
//! // Initialize metrics exporter
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! // Record a seeded bracket
//! metrics::bracket_seeded(16);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Record a seeded bracket and its entrant count.
pub fn bracket_seeded(entrants: usize) {
    metrics::counter!("knockout_brackets_seeded_total").increment(1);
    metrics::histogram!("knockout_bracket_entrants").record(entrants as f64);
}

/// Record a resolved match, labelled by whether it settled the tournament.
pub fn match_resolved(terminal: bool) {
    metrics::counter!("knockout_matches_resolved_total",
        "terminal" => terminal.to_string()
    )
    .increment(1);
}

/// Increment completed tournaments counter.
pub fn tournament_completed() {
    metrics::counter!("knockout_tournaments_completed_total").increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Record a newly established WebSocket connection.
pub fn ws_connection_opened() {
    metrics::counter!("knockout_ws_connections_total").increment(1);
    metrics::gauge!("knockout_ws_connections_active").increment(1.0);
}

/// Record a closed WebSocket connection.
pub fn ws_connection_closed() {
    metrics::gauge!("knockout_ws_connections_active").decrement(1.0);
}
