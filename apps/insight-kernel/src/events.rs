// [[RARO]]/apps/insight-kernel/src/events.rs
// Purpose: Run event definitions and borrowed, per-kind payload views.
// Architecture: Domain Event Layer
// Dependencies: Serde, Chrono, Uuid

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Pseudo-agent used by the backend for orchestration messages.
pub const SYSTEM_AGENT: &str = "System";
/// Sentinel the backend uses when the finalizing participant has no name.
pub const UNKNOWN_AGENT: &str = "Unknown Agent";
/// Display name the sentinel resolves to.
pub const FINALIZER_AGENT: &str = "Final Synthesizer";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Narrative progress from an agent (thinking, planning, phase banners)
    Activity,
    /// An agent invoked a tool
    ToolCall,
    /// A tool returned
    ToolResult,
    /// A model round-trip with token accounting
    LlmCall,
    /// A task produced its final output
    TaskOutput,
    /// A task changed lifecycle state
    TaskState,
    /// Orchestrator-level message
    System,
    /// Anything the backend emits that this engine does not know about
    Unrecognized(String),
}

impl EventKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "activity" => Self::Activity,
            "tool_call" => Self::ToolCall,
            "tool_result" => Self::ToolResult,
            "llm_call" => Self::LlmCall,
            "task_output" => Self::TaskOutput,
            "task_state" => Self::TaskState,
            "system" => Self::System,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Activity => "activity",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
            Self::LlmCall => "llm_call",
            Self::TaskOutput => "task_output",
            Self::TaskState => "task_state",
            Self::System => "system",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        match Self::parse(&raw) {
            Self::Unrecognized(_) => Self::Unrecognized(raw),
            known => known,
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "warning" | "warn" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    #[serde(deserialize_with = "id_as_string")]
    pub event_id: String,
    pub event_type: EventKind,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub payload: Value,
}

/// Backends disagree on whether ids are strings or database integers.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl RunEvent {
    pub fn new(event_type: EventKind, agent_name: Option<String>, payload: Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now().to_rfc3339(),
            agent_name,
            task_id: None,
            severity: Severity::Info,
            payload,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = event_id.into();
        self
    }

    /// Resolved display name of the agent this event belongs to.
    ///
    /// Falls back from the top-level field to the payload, and maps the
    /// backend's "Unknown Agent" sentinel onto [`FINALIZER_AGENT`].
    pub fn agent(&self) -> Option<&str> {
        let raw = non_blank(self.agent_name.as_deref())
            .or_else(|| non_blank(str_field(&self.payload, "agent_name")))
            .or_else(|| non_blank(str_field(&self.payload, "agent")))?;

        Some(display_agent_name(raw))
    }

    /// `activity_type` of an activity event; `None` for every other kind.
    pub fn activity_type(&self) -> Option<&str> {
        match self.event_type {
            EventKind::Activity => str_field(&self.payload, "activity_type"),
            _ => None,
        }
    }

    pub fn is_phase(&self) -> bool {
        self.activity_type() == Some("phase")
    }

    /// Typed view over `payload`, chosen by `event_type`.
    pub fn payload_view(&self) -> EventPayload<'_> {
        let p = &self.payload;
        match &self.event_type {
            EventKind::Activity => EventPayload::Activity(ActivityPayload {
                activity_type: str_field(p, "activity_type"),
                message: str_field(p, "message"),
                details: present(p, "details"),
            }),
            EventKind::ToolCall => EventPayload::ToolCall(ToolPayload::from_value(p)),
            EventKind::ToolResult => EventPayload::ToolResult(ToolPayload::from_value(p)),
            EventKind::LlmCall => EventPayload::LlmCall(LlmCallPayload {
                llm_provider: str_field(p, "llm_provider"),
                model_name: str_field(p, "model_name"),
                status: str_field(p, "status"),
                prompt_tokens: u64_field(p, "prompt_tokens"),
                completion_tokens: u64_field(p, "completion_tokens"),
                total_tokens: u64_field(p, "total_tokens"),
                duration_ms: u64_field(p, "duration_ms"),
                prompt_preview: str_field(p, "prompt_preview"),
                response_preview: str_field(p, "response_preview"),
                error_message: str_field(p, "error_message"),
            }),
            EventKind::TaskOutput => EventPayload::TaskOutput(TaskOutputPayload::from_value(p)),
            EventKind::TaskState => EventPayload::TaskState(TaskStatePayload {
                status: str_field(p, "status"),
                error: str_field(p, "error"),
                total_duration_ms: u64_field(p, "total_duration_ms"),
            }),
            EventKind::System => EventPayload::System(SystemPayload {
                message: str_field(p, "message"),
                details: present(p, "details"),
            }),
            EventKind::Unrecognized(_) => EventPayload::Unrecognized(p),
        }
    }
}

pub fn display_agent_name(raw: &str) -> &str {
    if raw == UNKNOWN_AGENT {
        FINALIZER_AGENT
    } else {
        raw
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload<'a> {
    Activity(ActivityPayload<'a>),
    ToolCall(ToolPayload<'a>),
    ToolResult(ToolPayload<'a>),
    LlmCall(LlmCallPayload<'a>),
    TaskOutput(TaskOutputPayload<'a>),
    TaskState(TaskStatePayload<'a>),
    System(SystemPayload<'a>),
    Unrecognized(&'a Value),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityPayload<'a> {
    pub activity_type: Option<&'a str>,
    pub message: Option<&'a str>,
    pub details: Option<&'a Value>,
}

/// Shared by `tool_call` and `tool_result`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolPayload<'a> {
    pub tool_name: Option<&'a str>,
    pub status: Option<&'a str>,
    pub input_data: Option<&'a Value>,
    pub output_data: Option<&'a Value>,
    pub duration_ms: Option<u64>,
    pub error_message: Option<&'a str>,
}

impl<'a> ToolPayload<'a> {
    fn from_value(p: &'a Value) -> Self {
        Self {
            tool_name: str_field(p, "tool_name"),
            status: str_field(p, "status"),
            input_data: present(p, "input_data"),
            output_data: present(p, "output_data"),
            duration_ms: u64_field(p, "duration_ms"),
            error_message: str_field(p, "error_message"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmCallPayload<'a> {
    pub llm_provider: Option<&'a str>,
    pub model_name: Option<&'a str>,
    pub status: Option<&'a str>,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub duration_ms: Option<u64>,
    pub prompt_preview: Option<&'a str>,
    pub response_preview: Option<&'a str>,
    pub error_message: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutputPayload<'a> {
    pub raw_preview: Option<&'a str>,
    pub validation_passed: Option<bool>,
    pub pydantic_dump: Option<&'a Value>,
    pub output_mode: Option<&'a str>,
    pub schema_key: Option<&'a str>,
    pub citation_count: Option<u64>,
    pub degraded: Option<bool>,
    pub warnings: Vec<&'a str>,
}

impl<'a> TaskOutputPayload<'a> {
    fn from_value(p: &'a Value) -> Self {
        let summary = p.get("summary").unwrap_or(&Value::Null);
        let diagnostics = p.get("diagnostics").unwrap_or(&Value::Null);

        Self {
            raw_preview: str_field(summary, "raw_preview"),
            validation_passed: summary.get("validation_passed").and_then(Value::as_bool),
            pydantic_dump: present(summary, "pydantic_dump"),
            output_mode: str_field(diagnostics, "output_mode"),
            schema_key: str_field(diagnostics, "schema_key"),
            citation_count: u64_field(diagnostics, "citation_count"),
            degraded: diagnostics.get("degraded").and_then(Value::as_bool),
            warnings: diagnostics
                .get("warnings")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStatePayload<'a> {
    pub status: Option<&'a str>,
    pub error: Option<&'a str>,
    pub total_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemPayload<'a> {
    pub message: Option<&'a str>,
    pub details: Option<&'a Value>,
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Accepts integers and non-negative floats (some SDKs report fractional ms).
pub(crate) fn u64_field(value: &Value, key: &str) -> Option<u64> {
    let field = value.get(key)?;
    field.as_u64().or_else(|| {
        field
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

/// A field that exists and is not JSON `null`.
pub(crate) fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}
