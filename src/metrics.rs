use metrics::{counter, histogram};
use std::time::{Duration, Instant};

use crate::llm::ProviderKind;

/// Metrics collection and management
///
/// Emits through the `metrics` facade; the binary decides whether a recorder is
/// installed.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    // Provider metrics
    pub provider_calls_total: &'static str,
    pub provider_call_duration: &'static str,

    // Session metrics
    pub sessions_started_total: &'static str,
    pub sessions_closed_total: &'static str,
    pub session_minutes: &'static str,
    pub summary_fallbacks_total: &'static str,

    // Error metrics
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            provider_calls_total: "tutor_provider_calls_total",
            provider_call_duration: "tutor_provider_call_duration_seconds",

            sessions_started_total: "tutor_sessions_started_total",
            sessions_closed_total: "tutor_sessions_closed_total",
            session_minutes: "tutor_session_minutes",
            summary_fallbacks_total: "tutor_summary_fallbacks_total",

            errors_total: "tutor_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Record one provider round trip
    pub fn record_provider_call(&self, provider: ProviderKind, operation: &'static str, outcome: &'static str, duration: Duration) {
        counter!(
            self.provider_calls_total,
            "provider" => provider.as_str(),
            "operation" => operation,
            "outcome" => outcome
        )
        .increment(1);
        histogram!(self.provider_call_duration, "provider" => provider.as_str(), "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Record a new session row
    pub fn record_session_started(&self, week: u32) {
        counter!(self.sessions_started_total, "week" => week.to_string()).increment(1);
    }

    /// Record a closed session and its reported length
    pub fn record_session_closed(&self, minutes: u32, with_memory: bool) {
        counter!(self.sessions_closed_total, "with_memory" => with_memory.to_string()).increment(1);
        histogram!(self.session_minutes).record(f64::from(minutes));
    }

    /// Record a summary that fell back to defaults
    pub fn record_summary_fallback(&self, reason: &'static str) {
        counter!(self.summary_fallbacks_total, "reason" => reason).increment(1);
    }

    /// Record error metrics
    pub fn record_error(&self, kind: &'static str, operation: &'static str) {
        counter!(self.errors_total, "kind" => kind, "operation" => operation).increment(1);
    }
}

/// Times a provider call and reports it on `finish`
pub struct MetricsTimer {
    collector: MetricsCollector,
    provider: ProviderKind,
    operation: &'static str,
    start: Instant,
}

impl MetricsTimer {
    #[must_use]
    pub fn new(collector: MetricsCollector, provider: ProviderKind, operation: &'static str) -> Self {
        Self { collector, provider, operation, start: Instant::now() }
    }

    pub fn finish(self, outcome: &'static str) -> Duration {
        let duration = self.start.elapsed();
        self.collector.record_provider_call(self.provider, self.operation, outcome, duration);
        duration
    }
}
