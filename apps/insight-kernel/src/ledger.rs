// [[RARO]]/apps/insight-kernel/src/ledger.rs
// Purpose: In-memory, append-only event log per run, plus derived snapshots.
// Architecture: Domain Logic Layer
// Dependencies: dashmap, chrono, uuid

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregator::derive_agent_states;
use crate::classifier::{classify_events, Card, MappedEvent};
use crate::detect::{detect_chartable_data, detect_structured_data, ChartableData, StructuredData};
use crate::error::KernelError;
use crate::events::RunEvent;
use crate::filter::{filter_events_for_display, FilterOptions};
use crate::models::{AgentRoster, JobStatus, ProgressHint, ProgressSnapshot};
use crate::observability::{summarize_metrics, RunMetrics};
use crate::progress::{calculate_progress, get_current_stage};

/// What the caller knows about a run before its first event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub summary: ProgressHint,
}

#[derive(Debug)]
struct RunRecord {
    run_id: String,
    status: JobStatus,
    error: Option<String>,
    manifest: RunManifest,
    events: Vec<RunEvent>,
    created_at: String,
}

/// Detected shapes for one `tool_result` card.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedShape {
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartableData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredData>,
}

/// Everything the execution viewer renders, recomputed from the full log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub run_id: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub created_at: String,
    pub stage: String,
    pub progress: ProgressSnapshot,
    #[serde(flatten)]
    pub roster: AgentRoster,
    pub cards: Vec<MappedEvent>,
    pub shapes: Vec<DetectedShape>,
    pub metrics: RunMetrics,
}

pub struct RunLedger {
    runs: DashMap<String, RunRecord>,
    max_events_per_run: usize,
}

impl RunLedger {
    pub fn new(max_events_per_run: usize) -> Self {
        RunLedger {
            runs: DashMap::new(),
            max_events_per_run,
        }
    }

    pub fn create_run(&self, manifest: RunManifest) -> String {
        let run_id = Uuid::new_v4().to_string();
        tracing::info!("Created run {} ({} expected agents)", run_id, manifest.agents.len());

        self.runs.insert(
            run_id.clone(),
            RunRecord {
                run_id: run_id.clone(),
                status: JobStatus::Pending,
                error: None,
                manifest,
                events: Vec::new(),
                created_at: Utc::now().to_rfc3339(),
            },
        );
        run_id
    }

    /// Appends in arrival order. Returns the new length of the run's log.
    pub fn append_events(&self, run_id: &str, events: Vec<RunEvent>) -> Result<usize, KernelError> {
        let mut record = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| KernelError::RunNotFound(run_id.to_string()))?;

        if record.events.len() + events.len() > self.max_events_per_run {
            return Err(KernelError::EventLimitExceeded {
                run_id: run_id.to_string(),
                limit: self.max_events_per_run,
            });
        }

        if record.status == JobStatus::Pending && !events.is_empty() {
            record.status = JobStatus::Running;
        }
        if record.status.is_terminal() && !events.is_empty() {
            tracing::debug!(
                "Run {} received {} events after {:?}",
                run_id,
                events.len(),
                record.status
            );
        }

        record.events.extend(events);
        Ok(record.events.len())
    }

    pub fn set_status(
        &self,
        run_id: &str,
        status: JobStatus,
        error: Option<String>,
    ) -> Result<(), KernelError> {
        let mut record = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| KernelError::RunNotFound(run_id.to_string()))?;

        match (&status, &error) {
            (JobStatus::Failed, Some(reason)) => {
                tracing::warn!("Run {} failed: {}", run_id, reason)
            }
            _ => tracing::info!("Run {} -> {:?}", run_id, status),
        }

        record.status = status;
        record.error = error;
        Ok(())
    }

    pub fn remove_run(&self, run_id: &str) -> Result<(), KernelError> {
        self.runs
            .remove(run_id)
            .map(|_| ())
            .ok_or_else(|| KernelError::RunNotFound(run_id.to_string()))
    }

    /// Derives the full view for `run_id`. The run's events are borrowed
    /// under the read guard, never copied.
    pub fn snapshot(
        &self,
        run_id: &str,
        options: &FilterOptions,
    ) -> Result<RunSnapshot, KernelError> {
        let record = self
            .runs
            .get(run_id)
            .ok_or_else(|| KernelError::RunNotFound(run_id.to_string()))?;

        let events = record.events.as_slice();
        let manifest = &record.manifest;

        let cards = classify_events(filter_events_for_display(events, options));
        let shapes = detect_shapes(&cards);

        Ok(RunSnapshot {
            run_id: record.run_id.clone(),
            status: record.status,
            error: record.error.clone(),
            created_at: record.created_at.clone(),
            stage: get_current_stage(events),
            progress: calculate_progress(events, Some(&manifest.summary), record.status),
            roster: derive_agent_states(events, Some(manifest.agents.as_slice())),
            cards,
            shapes,
            metrics: summarize_metrics(events),
        })
    }
}

fn detect_shapes(cards: &[MappedEvent]) -> Vec<DetectedShape> {
    cards
        .iter()
        .filter_map(|card| match &card.card {
            Card::ToolResult(result) if !result.output_data.is_null() => {
                let chart = detect_chartable_data(&result.output_data);
                let structured = detect_structured_data(&result.output_data);
                (chart.is_some() || structured.is_some()).then(|| DetectedShape {
                    event_id: card.id.clone(),
                    chart,
                    structured,
                })
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, Severity};
    use crate::models::AgentStatus;
    use serde_json::json;

    fn ledger() -> RunLedger {
        RunLedger::new(10)
    }

    fn view(ledger: &RunLedger, run_id: &str) -> RunSnapshot {
        ledger.snapshot(run_id, &FilterOptions::default()).unwrap()
    }

    fn tool_result(agent: &str, output: serde_json::Value) -> RunEvent {
        RunEvent::new(
            EventKind::ToolResult,
            Some(agent.to_string()),
            json!({"tool_name": "market_data", "duration_ms": 40, "output_data": output}),
        )
    }

    #[test]
    fn test_append_moves_pending_run_to_running() {
        let ledger = ledger();
        let run_id = ledger.create_run(RunManifest::default());
        let created = view(&ledger, &run_id);
        assert_eq!(created.status, JobStatus::Pending);
        assert!(chrono::DateTime::parse_from_rfc3339(&created.created_at).is_ok());

        let total = ledger
            .append_events(&run_id, vec![RunEvent::new(EventKind::System, None, json!({}))])
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(view(&ledger, &run_id).status, JobStatus::Running);
    }

    #[test]
    fn test_event_cap_and_unknown_run() {
        let ledger = ledger();
        let run_id = ledger.create_run(RunManifest::default());
        let batch: Vec<RunEvent> = (0..11)
            .map(|_| RunEvent::new(EventKind::System, None, json!({})))
            .collect();

        assert!(matches!(
            ledger.append_events(&run_id, batch),
            Err(KernelError::EventLimitExceeded { limit: 10, .. })
        ));
        assert_eq!(view(&ledger, &run_id).metrics.total_events, 0);
        assert!(matches!(
            ledger.append_events("nope", vec![]),
            Err(KernelError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_composes_views() {
        let ledger = ledger();
        let run_id = ledger.create_run(RunManifest {
            agents: vec!["Analyst".to_string(), "Writer".to_string()],
            summary: ProgressHint { total_agents: Some(2) },
        });
        ledger
            .append_events(
                &run_id,
                vec![
                    RunEvent::new(
                        EventKind::Activity,
                        Some("System".into()),
                        json!({"activity_type": "phase", "message": "Collecting market data"}),
                    ),
                    RunEvent::new(
                        EventKind::ToolCall,
                        Some("Analyst".into()),
                        json!({"tool_name": "market_data"}),
                    ),
                    tool_result(
                        "Analyst",
                        json!({"prices": [{"date": "2024-01-01", "close": 10.0}]}),
                    ),
                    tool_result("Analyst", json!("plain text, nothing to chart")),
                    RunEvent::new(EventKind::LlmCall, Some("Analyst".into()), json!({}))
                        .with_severity(Severity::Debug),
                ],
            )
            .unwrap();

        let snapshot = ledger.snapshot(&run_id, &FilterOptions::default()).unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.stage, "Collecting market data");
        assert_eq!(snapshot.cards.len(), 3);
        assert_eq!(snapshot.shapes.len(), 1);
        assert!(matches!(snapshot.shapes[0].chart, Some(ChartableData::Line { .. })));
        assert_eq!(snapshot.roster.active_agent_name.as_deref(), Some("Analyst"));
        let writer = snapshot.roster.agents.iter().find(|a| a.agent_name == "Writer").unwrap();
        assert_eq!(writer.status, AgentStatus::Idle);
        assert_eq!(snapshot.progress.total_agents, 2);
        assert_eq!(snapshot.progress.percentage, 25);
        assert_eq!(snapshot.metrics.total_events, 5);
    }

    #[test]
    fn test_failed_status_carries_error() {
        let ledger = ledger();
        let run_id = ledger.create_run(RunManifest::default());
        ledger
            .set_status(&run_id, JobStatus::Failed, Some("LLM quota exhausted".to_string()))
            .unwrap();

        let snapshot = ledger.snapshot(&run_id, &FilterOptions::default()).unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("LLM quota exhausted"));
        assert_eq!(snapshot.progress.percentage, 0);

        ledger.remove_run(&run_id).unwrap();
        assert!(ledger.snapshot(&run_id, &FilterOptions::default()).is_err());
    }
}
