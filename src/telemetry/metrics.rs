//! Prometheus metrics

use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// Decode through matching for one message
    Pass,
    /// Matching alone
    Matching,
    /// Handing instructions to the execution engine
    Submission,
}

impl LatencyMetric {
    fn name(self) -> &'static str {
        match self {
            LatencyMetric::Pass => "polyarb_pass_latency_ms",
            LatencyMetric::Matching => "polyarb_matching_latency_ms",
            LatencyMetric::Submission => "polyarb_submission_latency_ms",
        }
    }
}

/// Per-market counters
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    EventsApplied,
    EventsRejected,
    LevelsSkipped,
    Instructions,
    UnknownAsset,
    SubmitErrors,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::EventsApplied => "polyarb_events_applied_total",
            CounterMetric::EventsRejected => "polyarb_events_rejected_total",
            CounterMetric::LevelsSkipped => "polyarb_levels_skipped_total",
            CounterMetric::Instructions => "polyarb_instructions_total",
            CounterMetric::UnknownAsset => "polyarb_unknown_asset_total",
            CounterMetric::SubmitErrors => "polyarb_submit_errors_total",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Pipelines currently consuming messages
    ActivePipelines,
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::ActivePipelines => "polyarb_active_pipelines",
        }
    }
}

pub fn record_latency(metric: LatencyMetric, market: &str, duration: Duration) {
    metrics::histogram!(metric.name(), "market" => market.to_string())
        .record(duration.as_secs_f64() * 1000.0);
}

pub fn increment(metric: CounterMetric, market: &str, value: u64) {
    if value > 0 {
        metrics::counter!(metric.name(), "market" => market.to_string()).increment(value);
    }
}

pub fn adjust_gauge(metric: GaugeMetric, delta: f64) {
    metrics::gauge!(metric.name()).increment(delta);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        let names = [
            LatencyMetric::Pass.name(),
            LatencyMetric::Matching.name(),
            LatencyMetric::Submission.name(),
            CounterMetric::EventsApplied.name(),
            CounterMetric::UnknownAsset.name(),
            GaugeMetric::ActivePipelines.name(),
        ];
        assert!(names.iter().all(|n| n.starts_with("polyarb_")));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_latency(LatencyMetric::Pass, "mlb-tex-bal", Duration::from_millis(3));
        increment(CounterMetric::Instructions, "mlb-tex-bal", 2);
        adjust_gauge(GaugeMetric::ActivePipelines, 1.0);
    }
}
