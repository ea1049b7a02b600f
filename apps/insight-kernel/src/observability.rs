use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::events::{EventPayload, RunEvent, Severity};

const DEFAULT_DIRECTIVES: &str = "insight_kernel=debug,tower_http=trace";

/// Installs the global fmt subscriber. `RUST_LOG` overrides the defaults.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Cheap run-level counters shown alongside the derived views.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    pub total_events: usize,
    pub total_errors: usize,
    pub tool_calls: usize,
    pub llm_calls: usize,
    pub total_tokens: u64,
    pub p99_tool_latency_ms: u64,
}

pub fn summarize_metrics(events: &[RunEvent]) -> RunMetrics {
    let mut metrics = RunMetrics {
        total_events: events.len(),
        ..RunMetrics::default()
    };
    let mut latencies = Vec::new();

    for event in events {
        if event.severity == Severity::Error {
            metrics.total_errors += 1;
        }
        match event.payload_view() {
            EventPayload::ToolCall(_) => metrics.tool_calls += 1,
            EventPayload::ToolResult(tool) => latencies.extend(tool.duration_ms),
            EventPayload::LlmCall(llm) => {
                metrics.llm_calls += 1;
                metrics.total_tokens += llm.total_tokens.unwrap_or_else(|| {
                    llm.prompt_tokens.unwrap_or(0) + llm.completion_tokens.unwrap_or(0)
                });
            }
            _ => {}
        }
    }

    if !latencies.is_empty() {
        latencies.sort_unstable();
        let rank = ((latencies.len() as f64) * 0.99).ceil() as usize;
        metrics.p99_tool_latency_ms = latencies[rank.clamp(1, latencies.len()) - 1];
    }

    metrics
}
