// [[RARO]]/apps/insight-kernel/src/progress.rs
// Purpose: Aggregate completion percentage and current phase label.
// Architecture: Domain Logic Layer

use std::collections::HashSet;

use crate::events::{str_field, EventKind, RunEvent, SYSTEM_AGENT};
use crate::models::{JobStatus, ProgressHint, ProgressSnapshot};

/// Ceiling while a job is still live; 100 is reserved for a job the
/// backend has marked completed.
const LIVE_CEILING: f64 = 99.0;

pub fn calculate_progress(
    events: &[RunEvent],
    hint: Option<&ProgressHint>,
    job_status: JobStatus,
) -> ProgressSnapshot {
    let agent_names = || events.iter().filter_map(RunEvent::agent).filter(|n| *n != SYSTEM_AGENT);

    let observed: HashSet<&str> = agent_names().collect();
    let completed: HashSet<&str> = events
        .iter()
        .filter(|e| e.event_type == EventKind::TaskOutput)
        .filter_map(RunEvent::agent)
        .filter(|n| *n != SYSTEM_AGENT)
        .collect();
    let current_agent = agent_names().last();

    let total = observed
        .len()
        .max(hint.and_then(|h| h.total_agents).unwrap_or(0))
        .max(1);
    let share = |done: f64| done / total as f64 * 100.0;

    let percentage = match job_status {
        JobStatus::Completed => 100.0,
        JobStatus::Failed | JobStatus::Cancelled => share(completed.len() as f64).min(100.0),
        JobStatus::Pending | JobStatus::Running => {
            let mid_task = current_agent.is_some_and(|name| !completed.contains(name));
            let bonus = if mid_task { 0.5 } else { 0.0 };
            share(completed.len() as f64 + bonus).round().min(LIVE_CEILING)
        }
    };

    ProgressSnapshot {
        percentage: percentage.round() as u8,
        completed_agents: completed.len(),
        total_agents: total,
        current_agent: current_agent.map(str::to_string),
        status: job_status,
    }
}

/// Human-readable label for what the crew is doing right now.
pub fn get_current_stage(events: &[RunEvent]) -> String {
    let activities = || events.iter().rev().filter(|e| e.event_type == EventKind::Activity);

    let phase_message = activities()
        .filter(|e| e.is_phase())
        .find_map(|e| str_field(&e.payload, "message").filter(|m| !m.trim().is_empty()));
    if let Some(message) = phase_message {
        return message.to_string();
    }

    match activities().next() {
        Some(latest) => stage_label(latest.activity_type().unwrap_or("thinking")).to_string(),
        None => "Thinking".to_string(),
    }
}

fn stage_label(activity_type: &str) -> &'static str {
    match activity_type {
        "thinking" => "Thinking",
        "planning" => "Planning",
        "researching" => "Researching",
        "analyzing" => "Analyzing",
        "tool_use" => "Using tools",
        "delegating" => "Delegating",
        "reviewing" => "Reviewing",
        "writing" => "Writing report",
        "finalizing" => "Finalizing",
        _ => "Working",
    }
}
