// [[RARO]]/apps/insight-kernel/src/aggregator.rs
// Purpose: Folds the event stream into per-agent lifecycle state.
// Architecture: Domain Logic Layer
// Dependencies: Chrono (via timestamps)

use std::collections::HashMap;

use crate::events::{display_agent_name, str_field, EventPayload, RunEvent, Severity, SYSTEM_AGENT};
use crate::models::{AgentRoster, AgentState, AgentStatus};
use crate::timestamps;

const UNKNOWN_TOOL: &str = "Unknown Tool";

/// Derives the current roster from the complete event list.
///
/// `manifest` lists agents the crew is expected to run; any of them not yet
/// mentioned by an event is reported idle ("Waiting"). Output is sorted by
/// `last_seen_at` descending with never-seen agents last.
pub fn derive_agent_states(events: &[RunEvent], manifest: Option<&[String]>) -> AgentRoster {
    events
        .iter()
        .fold(RosterFold::default(), RosterFold::apply)
        .finish(manifest.unwrap_or_default())
}

/// Accumulator for [`derive_agent_states`]. Owned and threaded through
/// `fold`, so each call starts from an empty state.
#[derive(Debug, Clone, Default)]
struct RosterFold {
    /// First-seen order; the tie-breaker for the final sort.
    order: Vec<String>,
    states: HashMap<String, AgentState>,
    last_touched: Option<String>,
}

impl RosterFold {
    fn apply(mut self, event: &RunEvent) -> Self {
        let Some(name) = event.agent() else {
            return self;
        };

        let is_task_state = match event.payload_view() {
            EventPayload::ToolCall(tool) => {
                let tool_name = tool.tool_name.unwrap_or(UNKNOWN_TOOL);
                // A done agent goes back to running here; re-delegated
                // agents report further tool calls after their output.
                let state = self.touch(name, event);
                state.status = AgentStatus::Running;
                state.current_action_label = format!("Calling `{}`", tool_name);
                state.last_tool_name = Some(tool_name.to_string());
                false
            }
            EventPayload::ToolResult(tool) => {
                let state = self.touch(name, event);
                state.status = AgentStatus::Running;
                state.current_action_label = "Processing result".to_string();
                if let Some(duration) = tool.duration_ms {
                    state.last_tool_duration_ms = Some(duration);
                }
                false
            }
            EventPayload::TaskOutput(_) => {
                let state = self.touch(name, event);
                state.status = AgentStatus::Done;
                state.current_action_label = "Completed".to_string();
                false
            }
            EventPayload::TaskState(task) => {
                match task.status {
                    Some("failed") => {
                        let state = self.touch(name, event);
                        state.status = AgentStatus::Failed;
                        state.current_action_label =
                            task.error.unwrap_or("Task failed").to_string();
                    }
                    Some("completed") => {
                        let state = self.touch(name, event);
                        if state.status != AgentStatus::Done {
                            state.status = AgentStatus::Done;
                            state.current_action_label = "Completed".to_string();
                        }
                    }
                    _ => {
                        if self.states.contains_key(name) {
                            self.touch(name, event);
                        }
                    }
                }
                true
            }
            EventPayload::Activity(activity) => {
                if name != SYSTEM_AGENT && !self.states.contains_key(name) {
                    let label = activity
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or("Working")
                        .to_string();
                    let state = self.touch(name, event);
                    state.status = AgentStatus::Running;
                    state.current_action_label = label;
                }
                false
            }
            EventPayload::LlmCall(_)
            | EventPayload::System(_)
            | EventPayload::Unrecognized(_) => false,
        };

        // Errors never override done, and a no-op must not reorder the roster.
        let already_done = self.states.get(name).is_some_and(|s| s.status == AgentStatus::Done);
        if event.severity == Severity::Error && !is_task_state && !already_done {
            let label = error_text(event).to_string();
            let state = self.touch(name, event);
            state.status = AgentStatus::Failed;
            state.current_action_label = label;
        }

        self
    }

    /// Returns the entry for `name`, creating an idle one on first sight,
    /// and records the event as this agent's latest activity.
    fn touch(&mut self, name: &str, event: &RunEvent) -> &mut AgentState {
        if name != SYSTEM_AGENT {
            self.last_touched = Some(name.to_string());
        }
        if !self.states.contains_key(name) {
            self.order.push(name.to_string());
        }

        let state = self
            .states
            .entry(name.to_string())
            .or_insert_with(|| AgentState::waiting(name));
        state.last_seen_at = Some(event.timestamp.clone());
        state
    }

    fn finish(self, manifest: &[String]) -> AgentRoster {
        let RosterFold {
            order,
            mut states,
            last_touched,
        } = self;

        let mut agents: Vec<AgentState> = order
            .into_iter()
            .filter(|name| name != SYSTEM_AGENT)
            .filter_map(|name| states.remove(&name))
            .collect();

        for expected in manifest {
            let name = display_agent_name(expected.trim());
            if name.is_empty() || name == SYSTEM_AGENT {
                continue;
            }
            if !agents.iter().any(|a| a.agent_name == name) {
                agents.push(AgentState::waiting(name));
            }
        }

        // Stable: equal keys keep first-seen order, manifest seeds keep
        // manifest order at the tail.
        agents.sort_by_key(|a| {
            std::cmp::Reverse(a.last_seen_at.as_deref().and_then(timestamps::parse_lenient))
        });

        let active_agent_name = pick_active(&agents, last_touched.as_deref());
        AgentRoster {
            agents,
            active_agent_name,
        }
    }
}

/// Prefers a running agent so the UI does not stay pinned to one that has
/// already finished.
fn pick_active(agents: &[AgentState], last_touched: Option<&str>) -> Option<String> {
    let last = last_touched.and_then(|name| agents.iter().find(|a| a.agent_name == name));

    match last {
        Some(agent) if agent.status == AgentStatus::Running => Some(agent.agent_name.clone()),
        _ => agents
            .iter()
            .find(|a| a.status == AgentStatus::Running)
            .or(last)
            .map(|a| a.agent_name.clone()),
    }
}

fn error_text(event: &RunEvent) -> &str {
    ["error_message", "error", "message"]
        .iter()
        .find_map(|key| str_field(&event.payload, key).filter(|s| !s.trim().is_empty()))
        .unwrap_or("Error")
}
