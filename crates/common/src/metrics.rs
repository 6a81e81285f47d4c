//! Metrics collection for lockwork.
//!
//! Counters cover the three things operators actually watch: the REST
//! boundary, controller command outcomes, and reconciliation progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide collector, lazily created on first use.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Returns the process-wide collector.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Installs a pre-built collector; fails if one is already set.
pub fn init_metrics(metrics: Arc<Metrics>) -> Result<(), Arc<Metrics>> {
    METRICS.set(metrics)
}

/// Atomic counters shared by the API layer and the dispatch engine.
#[derive(Debug)]
pub struct Metrics {
    /// Creation instant, read back as the uptime gauge.
    started: Instant,

    // === HTTP Metrics ===
    /// Requests received since startup
    pub http_requests_total: AtomicU64,
    /// Requests currently in flight
    pub http_requests_active: AtomicU64,
    /// Requests bucketed by status class (2xx, 4xx, 5xx)
    pub http_requests_2xx: AtomicU64,
    pub http_requests_4xx: AtomicU64,
    pub http_requests_5xx: AtomicU64,
    /// Summed latency in microseconds, divided out at snapshot time
    pub http_request_latency_us_total: AtomicU64,
    /// Divisor for the latency average
    pub http_request_latency_count: AtomicU64,

    // === Device Command Metrics ===
    /// Transport attempts actually sent to controllers
    pub commands_sent: AtomicU64,
    /// Commands that reached a terminal Acknowledged outcome
    pub commands_acknowledged: AtomicU64,
    /// Commands that exhausted their attempt budget
    pub commands_failed: AtomicU64,
    /// Retry attempts (attempts beyond the first, per command)
    pub command_retries: AtomicU64,

    // === Reconciliation Metrics ===
    /// Permission-change events received by the engine
    pub reconcile_events: AtomicU64,
    /// Doors that converged (refresh acknowledged at the latest revision)
    pub reconcile_converged: AtomicU64,
    /// Alerts raised for doors failing past the attempt threshold
    pub reconcile_alerts: AtomicU64,
    /// Doors currently awaiting reconciliation
    pub doors_pending: AtomicU64,

    // === Auth Metrics ===
    /// Sessions issued (login + refresh)
    pub sessions_issued: AtomicU64,
    /// Rejected logins and invalid bearer tokens
    pub auth_failures: AtomicU64,
}

impl Metrics {
    /// All counters start at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            http_requests_total: AtomicU64::new(0),
            http_requests_active: AtomicU64::new(0),
            http_requests_2xx: AtomicU64::new(0),
            http_requests_4xx: AtomicU64::new(0),
            http_requests_5xx: AtomicU64::new(0),
            http_request_latency_us_total: AtomicU64::new(0),
            http_request_latency_count: AtomicU64::new(0),

            commands_sent: AtomicU64::new(0),
            commands_acknowledged: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
            command_retries: AtomicU64::new(0),

            reconcile_events: AtomicU64::new(0),
            reconcile_converged: AtomicU64::new(0),
            reconcile_alerts: AtomicU64::new(0),
            doors_pending: AtomicU64::new(0),

            sessions_issued: AtomicU64::new(0),
            auth_failures: AtomicU64::new(0),
        }
    }

    /// Seconds since this collector was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Counts a finished request and folds its latency into the average.
    pub fn record_http_request(&self, status_code: u16, latency: Duration) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);

        match status_code {
            200..=299 => self.http_requests_2xx.fetch_add(1, Ordering::Relaxed),
            400..=499 => self.http_requests_4xx.fetch_add(1, Ordering::Relaxed),
            500..=599 => self.http_requests_5xx.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };

        self.http_request_latency_us_total
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
        self.http_request_latency_count
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Bumps the in-flight gauge; pair with [`Self::end_request`].
    pub fn start_request(&self) {
        self.http_requests_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops the in-flight gauge back down.
    pub fn end_request(&self) {
        self.http_requests_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record one transport attempt to a controller.
    pub fn record_command_sent(&self) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the terminal outcome of a dispatched command.
    pub fn record_command_outcome(&self, acknowledged: bool) {
        if acknowledged {
            self.commands_acknowledged.fetch_add(1, Ordering::Relaxed);
        } else {
            self.commands_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a retry attempt within one command's budget.
    pub fn record_command_retry(&self) {
        self.command_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a permission-change event entering the engine.
    pub fn record_reconcile_event(&self) {
        self.reconcile_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a door converging to the latest permission revision.
    pub fn record_door_converged(&self) {
        self.reconcile_converged.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an alert for a door failing past the attempt threshold.
    pub fn record_reconcile_alert(&self) {
        self.reconcile_alerts.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the pending-door gauge.
    pub fn set_doors_pending(&self, pending: u64) {
        self.doors_pending.store(pending, Ordering::Relaxed);
    }

    /// Record a session being issued.
    pub fn record_session_issued(&self) {
        self.sessions_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected login or invalid token.
    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter into a serializable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.uptime_secs(),
            http_requests_total: self.http_requests_total.load(Ordering::Relaxed),
            http_requests_active: self.http_requests_active.load(Ordering::Relaxed),
            http_requests_2xx: self.http_requests_2xx.load(Ordering::Relaxed),
            http_requests_4xx: self.http_requests_4xx.load(Ordering::Relaxed),
            http_requests_5xx: self.http_requests_5xx.load(Ordering::Relaxed),
            http_request_latency_avg_us: self.average_latency_us(),

            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            commands_acknowledged: self.commands_acknowledged.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            command_retries: self.command_retries.load(Ordering::Relaxed),

            reconcile_events: self.reconcile_events.load(Ordering::Relaxed),
            reconcile_converged: self.reconcile_converged.load(Ordering::Relaxed),
            reconcile_alerts: self.reconcile_alerts.load(Ordering::Relaxed),
            doors_pending: self.doors_pending.load(Ordering::Relaxed),

            sessions_issued: self.sessions_issued.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
        }
    }

    fn average_latency_us(&self) -> u64 {
        let total = self.http_request_latency_us_total.load(Ordering::Relaxed);
        let count = self.http_request_latency_count.load(Ordering::Relaxed);
        if count > 0 { total / count } else { 0 }
    }

    /// Renders the counters in Prometheus text exposition format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        output.push_str("# HELP lockwork_uptime_seconds Seconds since process start\n");
        output.push_str("# TYPE lockwork_uptime_seconds gauge\n");
        output.push_str(&format!(
            "lockwork_uptime_seconds {}\n",
            snapshot.uptime_secs
        ));

        // HTTP
        output.push_str("# HELP lockwork_http_requests_total Total HTTP requests\n");
        output.push_str("# TYPE lockwork_http_requests_total counter\n");
        output.push_str(&format!(
            "lockwork_http_requests_total {}\n",
            snapshot.http_requests_total
        ));

        output.push_str("# HELP lockwork_http_requests_active Active HTTP requests\n");
        output.push_str("# TYPE lockwork_http_requests_active gauge\n");
        output.push_str(&format!(
            "lockwork_http_requests_active {}\n",
            snapshot.http_requests_active
        ));

        output.push_str("# HELP lockwork_http_requests_by_status HTTP requests by status\n");
        output.push_str("# TYPE lockwork_http_requests_by_status counter\n");
        output.push_str(&format!(
            "lockwork_http_requests_by_status{{status=\"2xx\"}} {}\n",
            snapshot.http_requests_2xx
        ));
        output.push_str(&format!(
            "lockwork_http_requests_by_status{{status=\"4xx\"}} {}\n",
            snapshot.http_requests_4xx
        ));
        output.push_str(&format!(
            "lockwork_http_requests_by_status{{status=\"5xx\"}} {}\n",
            snapshot.http_requests_5xx
        ));

        output.push_str("# HELP lockwork_http_request_latency_avg_us Average request latency\n");
        output.push_str("# TYPE lockwork_http_request_latency_avg_us gauge\n");
        output.push_str(&format!(
            "lockwork_http_request_latency_avg_us {}\n",
            snapshot.http_request_latency_avg_us
        ));

        // Device command metrics
        output.push_str("# HELP lockwork_commands_sent Transport attempts sent to controllers\n");
        output.push_str("# TYPE lockwork_commands_sent counter\n");
        output.push_str(&format!(
            "lockwork_commands_sent {}\n",
            snapshot.commands_sent
        ));

        output.push_str("# HELP lockwork_commands_acknowledged Commands acknowledged\n");
        output.push_str("# TYPE lockwork_commands_acknowledged counter\n");
        output.push_str(&format!(
            "lockwork_commands_acknowledged {}\n",
            snapshot.commands_acknowledged
        ));

        output.push_str("# HELP lockwork_commands_failed Commands that exhausted retries\n");
        output.push_str("# TYPE lockwork_commands_failed counter\n");
        output.push_str(&format!(
            "lockwork_commands_failed {}\n",
            snapshot.commands_failed
        ));

        output.push_str("# HELP lockwork_command_retries Retry attempts\n");
        output.push_str("# TYPE lockwork_command_retries counter\n");
        output.push_str(&format!(
            "lockwork_command_retries {}\n",
            snapshot.command_retries
        ));

        // Reconciliation metrics
        output.push_str("# HELP lockwork_reconcile_events Permission-change events received\n");
        output.push_str("# TYPE lockwork_reconcile_events counter\n");
        output.push_str(&format!(
            "lockwork_reconcile_events {}\n",
            snapshot.reconcile_events
        ));

        output.push_str("# HELP lockwork_reconcile_converged Doors converged\n");
        output.push_str("# TYPE lockwork_reconcile_converged counter\n");
        output.push_str(&format!(
            "lockwork_reconcile_converged {}\n",
            snapshot.reconcile_converged
        ));

        output.push_str("# HELP lockwork_reconcile_alerts Convergence-failure alerts raised\n");
        output.push_str("# TYPE lockwork_reconcile_alerts counter\n");
        output.push_str(&format!(
            "lockwork_reconcile_alerts {}\n",
            snapshot.reconcile_alerts
        ));

        output.push_str("# HELP lockwork_doors_pending Doors awaiting reconciliation\n");
        output.push_str("# TYPE lockwork_doors_pending gauge\n");
        output.push_str(&format!(
            "lockwork_doors_pending {}\n",
            snapshot.doors_pending
        ));

        // Auth metrics
        output.push_str("# HELP lockwork_sessions_issued Sessions issued\n");
        output.push_str("# TYPE lockwork_sessions_issued counter\n");
        output.push_str(&format!(
            "lockwork_sessions_issued {}\n",
            snapshot.sessions_issued
        ));

        output.push_str("# HELP lockwork_auth_failures Rejected logins and invalid tokens\n");
        output.push_str("# TYPE lockwork_auth_failures counter\n");
        output.push_str(&format!(
            "lockwork_auth_failures {}\n",
            snapshot.auth_failures
        ));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter, serialized for the ops endpoint.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,

    // HTTP boundary
    pub http_requests_total: u64,
    pub http_requests_active: u64,
    pub http_requests_2xx: u64,
    pub http_requests_4xx: u64,
    pub http_requests_5xx: u64,
    pub http_request_latency_avg_us: u64,

    // Device commands
    pub commands_sent: u64,
    pub commands_acknowledged: u64,
    pub commands_failed: u64,
    pub command_retries: u64,

    // Reconciliation
    pub reconcile_events: u64,
    pub reconcile_converged: u64,
    pub reconcile_alerts: u64,
    pub doors_pending: u64,

    // Auth
    pub sessions_issued: u64,
    pub auth_failures: u64,
}

/// Measures wall-clock duration between construction and [`Self::elapsed`].
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Begins timing now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since [`Self::start`] was called.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.http_requests_total.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.commands_sent.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_http_request() {
        let metrics = Metrics::new();

        metrics.record_http_request(200, Duration::from_millis(50));
        metrics.record_http_request(404, Duration::from_millis(10));
        metrics.record_http_request(500, Duration::from_millis(100));

        assert_eq!(metrics.http_requests_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.http_requests_2xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_4xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_5xx.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_active_request_tracking() {
        let metrics = Metrics::new();

        metrics.start_request();
        metrics.start_request();
        assert_eq!(metrics.http_requests_active.load(Ordering::Relaxed), 2);

        metrics.end_request();
        assert_eq!(metrics.http_requests_active.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_command_outcomes() {
        let metrics = Metrics::new();

        metrics.record_command_sent();
        metrics.record_command_sent();
        metrics.record_command_retry();
        metrics.record_command_outcome(true);
        metrics.record_command_outcome(false);

        assert_eq!(metrics.commands_sent.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.command_retries.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.commands_acknowledged.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.commands_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_pending_gauge() {
        let metrics = Metrics::new();

        metrics.set_doors_pending(4);
        assert_eq!(metrics.doors_pending.load(Ordering::Relaxed), 4);
        metrics.set_doors_pending(0);
        assert_eq!(metrics.doors_pending.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_snapshot() {
        let metrics = Metrics::new();
        metrics.record_reconcile_event();
        metrics.record_door_converged();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.reconcile_events, 1);
        assert_eq!(snapshot.reconcile_converged, 1);
        assert_eq!(snapshot.uptime_secs, 0);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.record_http_request(200, Duration::from_millis(50));
        metrics.record_command_sent();

        let prometheus = metrics.to_prometheus();
        assert!(prometheus.contains("lockwork_http_requests_total 1"));
        assert!(prometheus.contains("lockwork_http_requests_by_status{status=\"2xx\"} 1"));
        assert!(prometheus.contains("lockwork_commands_sent 1"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.elapsed();
        assert!(elapsed >= Duration::from_millis(10));
    }

    #[test]
    fn test_average_latency() {
        let metrics = Metrics::new();
        assert_eq!(metrics.average_latency_us(), 0);
        metrics.record_http_request(200, Duration::from_micros(100));
        metrics.record_http_request(200, Duration::from_micros(200));
        assert_eq!(metrics.average_latency_us(), 150);
    }
}
