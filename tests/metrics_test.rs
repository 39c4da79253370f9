//! Unit tests for metrics.rs module

use std::time::Duration;

use spanish_tutor::llm::ProviderKind;
use spanish_tutor::metrics::{MetricsCollector, MetricsTimer};

#[test]
fn test_metrics_collector_default_names() {
    let collector = MetricsCollector::default();
    assert_eq!(collector.provider_calls_total, "tutor_provider_calls_total");
    assert_eq!(collector.provider_call_duration, "tutor_provider_call_duration_seconds");
    assert_eq!(collector.sessions_started_total, "tutor_sessions_started_total");
    assert_eq!(collector.sessions_closed_total, "tutor_sessions_closed_total");
    assert_eq!(collector.session_minutes, "tutor_session_minutes");
    assert_eq!(collector.summary_fallbacks_total, "tutor_summary_fallbacks_total");
    assert_eq!(collector.errors_total, "tutor_errors_total");
}

#[test]
fn test_record_calls_without_recorder() {
    let collector = MetricsCollector::default();
    collector.record_provider_call(ProviderKind::OpenAi, "chat", "success", Duration::from_millis(120));
    collector.record_session_started(2);
    collector.record_session_closed(12, true);
    collector.record_summary_fallback("provider_error");
    collector.record_error("rate_limited", "chat");
}

#[test]
fn test_metrics_timer_reports_elapsed() {
    let timer = MetricsTimer::new(MetricsCollector::default(), ProviderKind::Gemini, "summary");
    std::thread::sleep(Duration::from_millis(5));
    let elapsed = timer.finish("api_error");
    assert!(elapsed >= Duration::from_millis(5));
}

#[test]
fn test_collector_clone_shares_names() {
    let collector = MetricsCollector::default();
    let cloned = collector.clone();
    assert_eq!(collector.errors_total, cloned.errors_total);
}
