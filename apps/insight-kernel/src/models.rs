use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub agent_name: String,
    pub status: AgentStatus,
    pub current_action_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tool_duration_ms: Option<u64>,
    /// Timestamp of the last event that touched this agent; `None` for
    /// manifest agents that have not been heard from yet.
    pub last_seen_at: Option<String>,
}

impl AgentState {
    pub fn waiting(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            status: AgentStatus::Idle,
            current_action_label: "Waiting".to_string(),
            last_tool_name: None,
            last_tool_duration_ms: None,
            last_seen_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentRoster {
    pub agents: Vec<AgentState>,
    pub active_agent_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
        .to_string()
    }
}

/// Job-level summary the backend may report before every agent has spoken.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProgressHint {
    #[serde(default, alias = "agent_count")]
    pub total_agents: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub percentage: u8,
    pub completed_agents: usize,
    pub total_agents: usize,
    pub current_agent: Option<String>,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_lenient_parse() {
        let parsed: Vec<JobStatus> =
            serde_json::from_str(r#"["RUNNING", "canceled", "completed", "queued"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                JobStatus::Running,
                JobStatus::Cancelled,
                JobStatus::Completed,
                JobStatus::Pending
            ]
        );
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_agent_state_serializes_camel_case() {
        let json = serde_json::to_value(AgentState::waiting("Risk Analyst")).unwrap();
        assert_eq!(json["agentName"], "Risk Analyst");
        assert_eq!(json["status"], "idle");
        assert_eq!(json["currentActionLabel"], "Waiting");
        assert!(json.get("lastToolName").is_none());
        assert!(json["lastSeenAt"].is_null());
    }
}
